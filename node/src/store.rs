//! In-memory stand-in for the excluded UTXO storage engine. Enough to
//! drive the mempool and validator slot registry over the wire protocol;
//! production deployments back `ledger_core::utxo::UtxoReader` /
//! `StakePool` with the real storage engine instead.

use async_trait::async_trait;
use ledger_core::crypto::Address;
use ledger_core::utxo::{InputKey, StakePool, UTxO, UtxoReader};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MockStore {
    outputs: RwLock<HashMap<InputKey, UTxO>>,
    last_nonce: RwLock<HashMap<Address, u64>>,
    stake_deposits: RwLock<Vec<(Address, u64)>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, key: InputKey, utxo: UTxO) {
        self.outputs.write().insert(key, utxo);
    }

    pub fn record_committed_nonce(&self, address: Address, num: u64) {
        self.last_nonce.write().insert(address, num);
    }

    pub fn add_stake_deposit(&self, address: Address, amount: u64) {
        self.stake_deposits.write().push((address, amount));
    }
}

#[async_trait]
impl UtxoReader for MockStore {
    async fn find_unspent(&self, key: &InputKey) -> Option<UTxO> {
        self.outputs.read().get(key).cloned()
    }

    async fn last_nonce_for(&self, address: &Address) -> u64 {
        self.last_nonce.read().get(address).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StakePool for MockStore {
    async fn stake_deposits(&self) -> Vec<(Address, u64)> {
        self.stake_deposits.read().clone()
    }
}
