//! Component C: the reservation controller. Sits over the same `Pool` the
//! mempool engine writes to (§4.3), moving transactions between `pool` and
//! `reserved` without ever touching `locked_inputs` except on `flush(true)`.

use crate::error::ReservationError;
use crate::hash::Hash;
use crate::mempool::Pool;
use crate::types::{Tx, TxType};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReservationController {
    pool: Arc<Pool>,
}

impl ReservationController {
    pub fn new(pool: Arc<Pool>) -> Self {
        ReservationController { pool }
    }

    /// Moves every non-system transaction in `batch` from `pool` into
    /// `reserved`, leaving input locks in place. The whole batch is
    /// processed under one lock acquisition: if any transaction fails its
    /// precondition, no transaction in the batch is moved.
    pub fn reserve(&self, batch: &[Tx]) -> Result<(), ReservationError> {
        let candidates: Vec<Hash> = batch
            .iter()
            .filter(|tx| !tx.tx_type.is_system())
            .map(|tx| tx.hash)
            .collect();

        let mut state = self.pool.state().lock().unwrap();

        for hash in &candidates {
            if state.reserved.contains_key(hash) {
                return Err(ReservationError::AlreadyReserved(*hash));
            }
            if !state.pool.contains_key(hash) {
                return Err(ReservationError::NotFound(*hash));
            }
        }

        for hash in &candidates {
            let td = state.pool.remove(hash).expect("checked present above");
            state.remove_priced(hash);
            state.reserved.insert(*hash, td);
        }

        info!(count = candidates.len(), "batch reserved");
        Ok(())
    }

    /// Called on successful block inclusion: empties `reserved`. Unlocks
    /// the batch's inputs only if `unlock_inputs` is true (the UTXOs are
    /// now consumed on chain).
    pub fn flush(&self, unlock_inputs: bool) {
        let mut state = self.pool.state().lock().unwrap();
        let reserved = std::mem::take(&mut state.reserved);
        if unlock_inputs {
            for td in reserved.values() {
                state.unlock_inputs(td.tx());
            }
        }
        info!(count = reserved.len(), unlock_inputs, "reservation flushed");
    }

    /// Called on forge failure before the pool-wide forge latch: restores
    /// every reserved transaction not already back in `pool`, then flushes
    /// without unlocking (inputs stay locked, matching the pre-reservation
    /// state).
    pub fn rollback(&self) {
        let mut state = self.pool.state().lock().unwrap();
        let reserved = std::mem::take(&mut state.reserved);
        let mut restored = 0usize;
        for (hash, td) in reserved {
            if !state.pool.contains_key(&hash) {
                state.pool.insert(hash, td);
                state.insert_priced(hash);
                restored += 1;
            }
        }
        warn!(restored, "reservation rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::crypto::PrivateKey;
    use crate::mempool::MempoolEngine;
    use crate::types::{TransactionData, TxInput, TxOptions, TxOutput};
    use crate::utxo::test_support::FakeUtxoSet;
    use crate::utxo::{InputKey, UTxO};

    fn config() -> PoolConfig {
        PoolConfig {
            block_size: 1_000_000,
            minimal_fee: 1,
            ingest_channel_capacity: 10,
            villainous_pool_cap: 10,
        }
    }

    fn funded_tx(utxo: &FakeUtxoSet, seed: u8) -> Tx {
        let key = PrivateKey::new_key();
        let addr = key.public_key().address();
        let prev = crate::hash::Hash::from_bytes([seed; 32]);
        utxo.insert(
            InputKey::new(prev, 0),
            UTxO {
                address: addr.clone(),
                amount: 10,
            },
        );
        Tx::new(
            TxOptions {
                tx_type: TxType::Normal,
                num: 1,
                timestamp: seed as i64,
                fee: 1,
                inputs: vec![TxInput {
                    prev_tx_hash: prev,
                    prev_index: 0,
                    address: addr,
                }],
                outputs: vec![TxOutput {
                    address: PrivateKey::new_key().public_key().address(),
                    amount: 9,
                    node_address: None,
                }],
            },
            Some(&key),
        )
    }

    async fn admit_three(utxo: &Arc<FakeUtxoSet>) -> (Arc<MempoolEngine>, Arc<Pool>, Tx, Tx, Tx) {
        let (engine, pool, _rx) = MempoolEngine::new(config(), utxo.clone(), utxo.clone());
        let a = funded_tx(utxo, 1);
        let b = funded_tx(utxo, 2);
        let c = funded_tx(utxo, 3);
        for tx in [a.clone(), b.clone(), c.clone()] {
            engine.register(TransactionData::new(tx)).await.unwrap();
        }
        (engine, pool, a, b, c)
    }

    #[tokio::test]
    async fn reserve_then_flush_drops_locks_for_reserved_only() {
        let utxo = Arc::new(FakeUtxoSet::new());
        let (_engine, pool, a, b, c) = admit_three(&utxo).await;
        let controller = ReservationController::new(pool.clone());

        controller.reserve(&[a.clone(), c.clone()]).unwrap();
        assert!(pool.contains(&b.hash));
        assert!(pool.contains(&a.hash));

        controller.flush(true);
        assert!(!pool.contains(&a.hash));
        assert!(pool.contains(&b.hash));

        let snapshot = pool.queue_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].hash, b.hash);
    }

    #[tokio::test]
    async fn reserve_then_rollback_restores_pool() {
        let utxo = Arc::new(FakeUtxoSet::new());
        let (_engine, pool, a, b, c) = admit_three(&utxo).await;
        let controller = ReservationController::new(pool.clone());

        controller.reserve(&[a.clone(), c.clone()]).unwrap();
        controller.rollback();

        let mut snapshot: Vec<_> = pool.queue_snapshot().into_iter().map(|tx| tx.hash).collect();
        snapshot.sort();
        let mut expected = vec![a.hash, b.hash, c.hash];
        expected.sort();
        assert_eq!(snapshot, expected);
    }

    #[tokio::test]
    async fn reserve_rejects_already_reserved_without_partial_commit() {
        let utxo = Arc::new(FakeUtxoSet::new());
        let (_engine, pool, a, b, _c) = admit_three(&utxo).await;
        let controller = ReservationController::new(pool.clone());

        controller.reserve(&[a.clone()]).unwrap();
        let err = controller.reserve(&[b.clone(), a.clone()]).unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyReserved(_)));
        // b must not have been moved, since the batch failed on a.
        assert!(pool.contains(&b.hash));
        assert!(!pool.queue_snapshot().iter().any(|tx| tx.hash == a.hash));
    }
}
