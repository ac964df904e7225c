//! Component D: the validator slot registry. Independent of the mempool;
//! guarded by its own reader-preferring lock (§4.4) rather than sharing the
//! pool's mutex.

use crate::config::RegistryConfig;
use crate::crypto::Address;
use crate::error::RegistryError;
use crate::types::{Tx, TxOptions, TxOutput, TxType};
use parking_lot::RwLock;
use tracing::info;

struct RegistryState {
    slots: Vec<Address>,
}

pub struct ValidatorSlotRegistry {
    state: RwLock<RegistryState>,
    bound: u64,
    block_reward: u64,
}

impl ValidatorSlotRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        ValidatorSlotRegistry {
            state: RwLock::new(RegistryState { slots: Vec::new() }),
            bound: config.validator_registry_limit,
            block_reward: config.block_reward,
        }
    }

    /// Bulk-loads the registry from a snapshot of unspent stake deposits,
    /// registering each destination address in order. Stops at the first
    /// `SlotsFull` rather than partially skipping deposits, since a deposit
    /// that cannot be registered at startup indicates `bound` was lowered
    /// below the number of persisted deposits.
    pub fn load_from_deposits(
        &self,
        deposits: impl IntoIterator<Item = Address>,
    ) -> Result<(), RegistryError> {
        for address in deposits {
            self.register_stake(address)?;
        }
        Ok(())
    }

    pub fn register_stake(&self, address: Address) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.slots.len() as u64 == self.bound {
            return Err(RegistryError::SlotsFull);
        }
        info!(address = %address, "stake registered");
        state.slots.push(address);
        Ok(())
    }

    /// Removes the first matching slot, not all of them (§9 "Duplicated
    /// slots" — the same address may legitimately occupy several slots).
    pub fn unregister_stake(&self, address: &Address) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let position = state
            .slots
            .iter()
            .position(|a| a == address)
            .ok_or(RegistryError::UnknownStaker)?;
        state.slots.remove(position);
        info!(address = %address, "stake unregistered");
        Ok(())
    }

    pub fn can_stake(&self) -> bool {
        let state = self.state.read();
        (state.slots.len() as u64) < self.bound
    }

    pub fn slot_count(&self) -> usize {
        self.state.read().slots.len()
    }

    /// Constructs a zero-fee Reward transaction with no inputs and no
    /// signature, splitting `block_reward` evenly (integer division) across
    /// the current slots. Output order matches slot order, which is
    /// deterministic across nodes since slots are only ever appended to or
    /// removed by first-match.
    pub fn build_reward_transaction(&self, block_num: u64, timestamp: i64) -> Result<Tx, RegistryError> {
        let state = self.state.read();
        if state.slots.is_empty() {
            return Err(RegistryError::NoStakers);
        }

        let share = self.block_reward / state.slots.len() as u64;
        let outputs = state
            .slots
            .iter()
            .map(|address| TxOutput {
                address: address.clone(),
                amount: share,
                node_address: None,
            })
            .collect();

        Ok(Tx::new(
            TxOptions {
                tx_type: TxType::Reward,
                num: block_num,
                timestamp,
                fee: 0,
                inputs: vec![],
                outputs,
            },
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    fn config(limit: u64, reward: u64) -> RegistryConfig {
        RegistryConfig {
            validator_registry_limit: limit,
            block_reward: reward,
            stake_unit: 1_000,
            slot_time: std::time::Duration::from_secs(10),
        }
    }

    #[test]
    fn register_respects_bound() {
        let registry = ValidatorSlotRegistry::new(&config(1, 100));
        let addr = PrivateKey::new_key().public_key().address();
        registry.register_stake(addr.clone()).unwrap();
        assert!(!registry.can_stake());
        let err = registry.register_stake(addr).unwrap_err();
        assert!(matches!(err, RegistryError::SlotsFull));
    }

    #[test]
    fn unregister_removes_only_first_match() {
        let registry = ValidatorSlotRegistry::new(&config(3, 100));
        let addr = PrivateKey::new_key().public_key().address();
        registry.register_stake(addr.clone()).unwrap();
        registry.register_stake(addr.clone()).unwrap();
        registry.unregister_stake(&addr).unwrap();
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn reward_split_duplicates_outputs_per_slot() {
        let registry = ValidatorSlotRegistry::new(&config(64, 100));
        let addr_x = PrivateKey::new_key().public_key().address();
        let addr_y = PrivateKey::new_key().public_key().address();
        registry.register_stake(addr_x.clone()).unwrap();
        registry.register_stake(addr_y.clone()).unwrap();
        registry.register_stake(addr_x.clone()).unwrap();

        let tx = registry.build_reward_transaction(42, 1000).unwrap();
        assert_eq!(tx.tx_type, TxType::Reward);
        assert_eq!(tx.num, 42);
        assert_eq!(tx.fee, 0);
        assert!(tx.inputs.is_empty());
        assert!(crate::crypto::Signature::is_zeroed(&tx.signature));
        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(tx.outputs[0].address, addr_x);
        assert_eq!(tx.outputs[1].address, addr_y);
        assert_eq!(tx.outputs[2].address, addr_x);
        for output in &tx.outputs {
            assert_eq!(output.amount, 33);
        }
    }

    #[test]
    fn no_stakers_fails_reward_build() {
        let registry = ValidatorSlotRegistry::new(&config(64, 100));
        let err = registry.build_reward_transaction(1, 0).unwrap_err();
        assert!(matches!(err, RegistryError::NoStakers));
    }
}
