//! Collaborator interfaces this crate consumes but does not implement: the
//! UTXO storage engine and the stake deposit view it derives from the same
//! ledger. Both are owned by the storage layer outside this crate; this
//! module only describes the shape components A and D need from them.

use crate::crypto::Address;
use crate::hash::Hash;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifies a single transaction output: the hash of the transaction that
/// created it and its index within that transaction's `outputs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputKey {
    pub tx_hash: Hash,
    pub index: u32,
}

impl InputKey {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        InputKey { tx_hash, index }
    }
}

/// An unspent output as seen by the storage layer: who owns it and how much
/// it is worth. Spent/unspent bookkeeping itself lives outside this crate;
/// a `UTxO` only exists here if the storage layer still considers it
/// unspent at the moment it was fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UTxO {
    pub address: Address,
    pub amount: u64,
}

/// What the transaction validator and mempool need from the UTXO storage
/// engine. Implemented outside this crate; production wiring is expected to
/// back it with whatever storage engine owns the chain's confirmed state.
#[async_trait]
pub trait UtxoReader: Send + Sync {
    /// Looks up a single unspent output by its key. Returns `None` both for
    /// outputs that never existed and for ones that have already been
    /// spent on-chain — the validator cannot and need not distinguish the
    /// two from here.
    async fn find_unspent(&self, key: &InputKey) -> Option<UTxO>;

    /// The `num` of the most recently committed transaction sent by
    /// `address`, or 0 if the address has never sent one. Used by
    /// `validate` to enforce strictly increasing nonces.
    async fn last_nonce_for(&self, address: &Address) -> u64;
}

/// What the validator slot registry needs to learn which addresses have a
/// live stake deposit and for how much. Derived from the same UTXO set
/// `UtxoReader` reads, filtered to outputs tagged with a `node_address`.
#[async_trait]
pub trait StakePool: Send + Sync {
    /// All currently-locked stake deposits, as (staker address, amount).
    /// A staker may appear more than once if they hold several deposits.
    async fn stake_deposits(&self) -> Vec<(Address, u64)>;
}

/// In-memory `UtxoReader` + `StakePool`, used by this crate's own unit
/// tests and by `lib/tests/integration_tests.rs`. Not `#[cfg(test)]`-gated
/// because integration tests compile against the crate's normal (non-test)
/// rlib; production callers simply never reach for it.
pub mod test_support {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    /// An in-memory `UtxoReader` + `StakePool` for tests.
    #[derive(Default)]
    pub struct FakeUtxoSet {
        outputs: RwLock<HashMap<InputKey, UTxO>>,
        nonces: RwLock<HashMap<Address, u64>>,
        stakes: RwLock<Vec<(Address, u64)>>,
    }

    impl FakeUtxoSet {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, key: InputKey, utxo: UTxO) {
            self.outputs.write().insert(key, utxo);
        }

        pub fn remove(&self, key: &InputKey) {
            self.outputs.write().remove(key);
        }

        pub fn set_nonce(&self, address: Address, num: u64) {
            self.nonces.write().insert(address, num);
        }

        pub fn set_stakes(&self, stakes: Vec<(Address, u64)>) {
            *self.stakes.write() = stakes;
        }
    }

    #[async_trait]
    impl UtxoReader for FakeUtxoSet {
        async fn find_unspent(&self, key: &InputKey) -> Option<UTxO> {
            self.outputs.read().get(key).cloned()
        }

        async fn last_nonce_for(&self, address: &Address) -> u64 {
            self.nonces.read().get(address).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl StakePool for FakeUtxoSet {
        async fn stake_deposits(&self) -> Vec<(Address, u64)> {
            self.stakes.read().clone()
        }
    }
}
