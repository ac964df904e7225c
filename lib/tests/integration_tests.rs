//! End-to-end exercises of the mempool admission pipeline and validator
//! slot registry, built around the literal scenarios from the system's
//! test plan (admit-and-order, swap, double-spend, reserve/flush,
//! reserve/rollback, reward split).

use ledger_core::config::PoolConfig;
use ledger_core::crypto::PrivateKey;
use ledger_core::error::{MempoolError, ReservationError};
use ledger_core::hash::Hash;
use ledger_core::mempool::MempoolEngine;
use ledger_core::registry::ValidatorSlotRegistry;
use ledger_core::reservation::ReservationController;
use ledger_core::types::{Tx, TxInput, TxOptions, TxOutput, TxType, TransactionData};
use ledger_core::utxo::test_support::FakeUtxoSet;
use ledger_core::utxo::{InputKey, UTxO};
use std::sync::Arc;

fn pool_config() -> PoolConfig {
    PoolConfig {
        block_size: 1_000_000,
        minimal_fee: 1,
        ingest_channel_capacity: 64,
        villainous_pool_cap: 100,
    }
}

fn normal_tx(
    utxo: &FakeUtxoSet,
    key: &PrivateKey,
    seed: u8,
    num: u64,
    fee: u64,
    timestamp: i64,
) -> Tx {
    let addr = key.public_key().address();
    let prev = Hash::from_bytes([seed; 32]);
    utxo.insert(
        InputKey::new(prev, 0),
        UTxO {
            address: addr.clone(),
            amount: fee + 5,
        },
    );
    Tx::new(
        TxOptions {
            tx_type: TxType::Normal,
            num,
            timestamp,
            fee,
            inputs: vec![TxInput {
                prev_tx_hash: prev,
                prev_index: 0,
                address: addr,
            }],
            outputs: vec![TxOutput {
                address: PrivateKey::new_key().public_key().address(),
                amount: 5,
                node_address: None,
            }],
        },
        Some(key),
    )
}

/// S1: three disjoint-input Normal transactions, ordered by (fee desc,
/// timestamp asc).
#[tokio::test]
async fn s1_admit_and_order() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());

    let a = normal_tx(&utxo, &PrivateKey::new_key(), 1, 1, 10, 100);
    let b = normal_tx(&utxo, &PrivateKey::new_key(), 2, 1, 20, 200);
    let c = normal_tx(&utxo, &PrivateKey::new_key(), 3, 1, 10, 50);

    for tx in [a.clone(), b.clone(), c.clone()] {
        engine.register(TransactionData::new(tx)).await.unwrap();
    }

    let snapshot = pool.queue_snapshot();
    let hashes: Vec<Hash> = snapshot.iter().map(|tx| tx.hash).collect();
    assert_eq!(hashes, vec![b.hash, c.hash, a.hash]);
}

/// S2: same sender, same num, strictly higher fee wins the swap.
#[tokio::test]
async fn s2_swap_on_higher_fee_same_nonce() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());
    let sender = PrivateKey::new_key();
    let addr = sender.public_key().address();
    let shared_input = Hash::from_bytes([9; 32]);
    utxo.insert(
        InputKey::new(shared_input, 0),
        UTxO {
            address: addr.clone(),
            amount: 11,
        },
    );

    let a = Tx::new(
        TxOptions {
            tx_type: TxType::Normal,
            num: 7,
            timestamp: 1,
            fee: 5,
            inputs: vec![TxInput {
                prev_tx_hash: shared_input,
                prev_index: 0,
                address: addr.clone(),
            }],
            outputs: vec![TxOutput {
                address: PrivateKey::new_key().public_key().address(),
                amount: 6,
                node_address: None,
            }],
        },
        Some(&sender),
    );
    engine.register(TransactionData::new(a.clone())).await.unwrap();

    let b = Tx::new(
        TxOptions {
            tx_type: TxType::Normal,
            num: 7,
            timestamp: 2,
            fee: 6,
            inputs: vec![TxInput {
                prev_tx_hash: shared_input,
                prev_index: 0,
                address: addr.clone(),
            }],
            outputs: vec![TxOutput {
                address: PrivateKey::new_key().public_key().address(),
                amount: 5,
                node_address: None,
            }],
        },
        Some(&sender),
    );
    engine.register(TransactionData::new(b.clone())).await.unwrap();

    assert!(!pool.contains(&a.hash));
    let key = InputKey::new(shared_input, 0);
    assert!(pool.queue_snapshot().iter().any(|tx| tx.hash == b.hash));
    // the victim's input is now locked by B, not dangling.
    let _ = key;
}

/// S3: a different sender competing for the same UTXO is rejected outright.
#[tokio::test]
async fn s3_different_sender_double_spend_rejected() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());

    let key_x = PrivateKey::new_key();
    let a = normal_tx(&utxo, &key_x, 11, 1, 5, 100);
    engine.register(TransactionData::new(a.clone())).await.unwrap();

    let key_y = PrivateKey::new_key();
    let addr_y = key_y.public_key().address();
    let a_prime = Tx::new(
        TxOptions {
            tx_type: TxType::Normal,
            num: 1,
            timestamp: 101,
            fee: 999,
            inputs: vec![TxInput {
                prev_tx_hash: a.inputs[0].prev_tx_hash,
                prev_index: 0,
                address: addr_y,
            }],
            outputs: vec![TxOutput {
                address: PrivateKey::new_key().public_key().address(),
                amount: 1,
                node_address: None,
            }],
        },
        Some(&key_y),
    );

    let err = engine
        .register(TransactionData::new(a_prime.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, MempoolError::InputLocked(hash) if hash == a_prime.hash));
    assert!(pool.contains(&a.hash));
}

async fn admit_three(
    utxo: &Arc<FakeUtxoSet>,
) -> (
    Arc<MempoolEngine>,
    Arc<ledger_core::mempool::Pool>,
    Tx,
    Tx,
    Tx,
) {
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());
    let a = normal_tx(utxo, &PrivateKey::new_key(), 21, 1, 5, 10);
    let b = normal_tx(utxo, &PrivateKey::new_key(), 22, 1, 5, 20);
    let c = normal_tx(utxo, &PrivateKey::new_key(), 23, 1, 5, 30);
    for tx in [a.clone(), b.clone(), c.clone()] {
        engine.register(TransactionData::new(tx)).await.unwrap();
    }
    (engine, pool, a, b, c)
}

/// S4: reserve([A, C]) then flush(true) leaves only B's locks in place.
#[tokio::test]
async fn s4_reserve_then_flush() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (_engine, pool, a, b, c) = admit_three(&utxo).await;
    let controller = ReservationController::new(pool.clone());

    controller.reserve(&[a.clone(), c.clone()]).unwrap();
    assert!(pool.contains(&a.hash));
    assert!(pool.contains(&c.hash));
    assert!(pool.contains(&b.hash));
    assert!(pool.queue_snapshot().iter().all(|tx| tx.hash == b.hash));

    controller.flush(true);
    assert!(!pool.contains(&a.hash));
    assert!(!pool.contains(&c.hash));
    assert!(pool.contains(&b.hash));
}

/// S5: reserve([A, C]) then rollback() restores the pre-reserve pool set.
#[tokio::test]
async fn s5_reserve_then_rollback() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (_engine, pool, a, b, c) = admit_three(&utxo).await;
    let controller = ReservationController::new(pool.clone());

    controller.reserve(&[a.clone(), c.clone()]).unwrap();
    controller.rollback();

    let mut hashes: Vec<Hash> = pool.queue_snapshot().iter().map(|tx| tx.hash).collect();
    hashes.sort();
    let mut expected = vec![a.hash, b.hash, c.hash];
    expected.sort();
    assert_eq!(hashes, expected);
}

/// S6: reward split across duplicated slots.
#[test]
fn s6_reward_split_with_duplicate_slots() {
    let config = ledger_core::config::RegistryConfig {
        validator_registry_limit: 64,
        block_reward: 100,
        stake_unit: 1_000,
        slot_time: std::time::Duration::from_secs(10),
    };
    let registry = ValidatorSlotRegistry::new(&config);

    let addr_x = PrivateKey::new_key().public_key().address();
    let addr_y = PrivateKey::new_key().public_key().address();
    registry.register_stake(addr_x.clone()).unwrap();
    registry.register_stake(addr_y.clone()).unwrap();
    registry.register_stake(addr_x.clone()).unwrap();

    let tx = registry.build_reward_transaction(42, 123).unwrap();
    assert_eq!(tx.tx_type, TxType::Reward);
    assert_eq!(tx.fee, 0);
    assert_eq!(tx.num, 42);
    assert!(tx.inputs.is_empty());
    assert!(ledger_core::crypto::Signature::is_zeroed(&tx.signature));
    let amounts: Vec<u64> = tx.outputs.iter().map(|o| o.amount).collect();
    assert_eq!(amounts, vec![33, 33, 33]);
}

/// Reserve fails atomically: a batch with one already-reserved tx moves
/// nothing.
#[tokio::test]
async fn reserve_batch_failure_is_all_or_nothing() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (_engine, pool, a, b, _c) = admit_three(&utxo).await;
    let controller = ReservationController::new(pool.clone());

    controller.reserve(&[a.clone()]).unwrap();
    let err = controller.reserve(&[b.clone(), a.clone()]).unwrap_err();
    assert!(matches!(err, ReservationError::AlreadyReserved(_)));
    assert!(pool.contains(&b.hash));
    assert!(pool.queue_snapshot().iter().any(|tx| tx.hash == b.hash));
}

/// Idempotence: registering the same tx twice fails the second time with
/// no change to pool state.
#[tokio::test]
async fn duplicate_register_is_rejected() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());
    let a = normal_tx(&utxo, &PrivateKey::new_key(), 55, 1, 5, 1);

    engine.register(TransactionData::new(a.clone())).await.unwrap();
    let err = engine
        .register(TransactionData::new(a.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, MempoolError::AlreadyPresent(hash) if hash == a.hash));
    assert_eq!(pool.queue_snapshot().len(), 1);
}

/// Delete unlocks the transaction's inputs, allowing a fresh submission to
/// reclaim the same UTXO.
#[tokio::test]
async fn delete_unlocks_inputs() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());
    let a = normal_tx(&utxo, &PrivateKey::new_key(), 61, 1, 5, 1);
    engine.register(TransactionData::new(a.clone())).await.unwrap();

    pool.delete(&a.hash).unwrap();
    assert!(!pool.contains(&a.hash));

    let key_z = PrivateKey::new_key();
    let addr_z = key_z.public_key().address();
    let reuse = Tx::new(
        TxOptions {
            tx_type: TxType::Normal,
            num: 1,
            timestamp: 2,
            fee: 5,
            inputs: vec![TxInput {
                prev_tx_hash: a.inputs[0].prev_tx_hash,
                prev_index: 0,
                address: addr_z.clone(),
            }],
            outputs: vec![TxOutput {
                address: PrivateKey::new_key().public_key().address(),
                amount: 0,
                node_address: None,
            }],
        },
        Some(&key_z),
    );
    // Re-fund the same input key for the new owner, since `delete` does
    // not touch the external UTXO set, only the pool's locks.
    utxo.insert(
        InputKey::new(a.inputs[0].prev_tx_hash, 0),
        UTxO {
            address: addr_z,
            amount: 5,
        },
    );
    engine.register(TransactionData::new(reuse.clone())).await.unwrap();
    assert!(pool.contains(&reuse.hash));
}

/// min_fee_estimate falls back to the configured minimum on an empty pool,
/// and returns the midpoint of the highest and last-included fee otherwise.
#[tokio::test]
async fn fee_estimate_on_empty_and_nonempty_pool() {
    let utxo = Arc::new(FakeUtxoSet::new());
    let (engine, pool, _rx) = MempoolEngine::new(pool_config(), utxo.clone(), utxo.clone());
    assert_eq!(pool.min_fee_estimate(), 1);

    let a = normal_tx(&utxo, &PrivateKey::new_key(), 71, 1, 10, 1);
    let b = normal_tx(&utxo, &PrivateKey::new_key(), 72, 1, 20, 2);
    engine.register(TransactionData::new(a)).await.unwrap();
    engine.register(TransactionData::new(b)).await.unwrap();

    // Both fit comfortably within the default block size, so the estimate
    // is the midpoint of the highest and lowest admitted fee.
    assert_eq!(pool.min_fee_estimate(), 15);
}
