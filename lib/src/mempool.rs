//! Component B: the mempool engine. Owns the admission pool, the priced
//! ordering, input locks, and the bounded diagnostic double-spend set. The
//! pool itself (`Pool`) is shared with the reservation controller (C) via
//! `Arc`, since both operate under the same lock (§5: only one lock is held
//! at a time in the mempool).

use crate::config::PoolConfig;
use crate::error::MempoolError;
use crate::hash::Hash;
use crate::types::{Tx, TxType, TransactionData};
use crate::utxo::{InputKey, StakePool, UtxoReader};
use crate::validator::TransactionValidator;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Pool state protected by a single coarse lock, matching the reference
/// implementation's choice of a `std::sync::Mutex` critical section per
/// operation (§4.2.1) over fine-grained locking.
pub(crate) struct PoolState {
    pub(crate) pool: HashMap<Hash, TransactionData>,
    pub(crate) reserved: HashMap<Hash, TransactionData>,
    priced: Vec<Hash>,
    priced_dirty: bool,
    pub(crate) locked_inputs: HashMap<InputKey, Hash>,
    villainous: LruCache<Hash, TransactionData>,
}

impl PoolState {
    fn new(villainous_cap: usize) -> Self {
        let cap = NonZeroUsize::new(villainous_cap.max(1)).unwrap();
        PoolState {
            pool: HashMap::new(),
            reserved: HashMap::new(),
            priced: Vec::new(),
            priced_dirty: false,
            locked_inputs: HashMap::new(),
            villainous: LruCache::new(cap),
        }
    }

    pub(crate) fn input_keys(tx: &Tx) -> impl Iterator<Item = InputKey> + '_ {
        tx.inputs
            .iter()
            .map(|i| InputKey::new(i.prev_tx_hash, i.prev_index))
    }

    pub(crate) fn unlock_inputs(&mut self, tx: &Tx) {
        for key in Self::input_keys(tx) {
            self.locked_inputs.remove(&key);
        }
    }

    fn record_villainous(&mut self, td: TransactionData) {
        self.villainous.put(td.hash(), td);
    }

    /// Appends a hash to `priced` and marks it dirty; used both by
    /// `register` and by the reservation controller's `rollback`.
    pub(crate) fn insert_priced(&mut self, hash: Hash) {
        self.priced.push(hash);
        self.priced_dirty = true;
    }

    /// Drops a hash from `priced` without touching locks; used by the
    /// reservation controller when moving a tx from `pool` to `reserved`.
    pub(crate) fn remove_priced(&mut self, hash: &Hash) {
        self.priced.retain(|h| h != hash);
    }

    /// Removes a transaction from `pool` (not `reserved`), unlocking its
    /// inputs and dropping it from `priced`.
    fn remove_from_pool(&mut self, hash: &Hash) -> Option<TransactionData> {
        let td = self.pool.remove(hash)?;
        self.unlock_inputs(td.tx());
        self.priced.retain(|h| h != hash);
        Some(td)
    }

    fn resort_priced(&mut self) {
        if !self.priced_dirty {
            return;
        }
        let pool = &self.pool;
        self.priced.sort_by(|a, b| {
            let ta = &pool[a];
            let tb = &pool[b];
            tb.fee()
                .cmp(&ta.fee())
                .then_with(|| ta.timestamp().cmp(&tb.timestamp()))
        });
        self.priced_dirty = false;
    }
}

/// Shared pool guarded by its lock, consumed by both the mempool engine and
/// the reservation controller (§4.3).
pub struct Pool {
    state: Mutex<PoolState>,
    forge_failed: AtomicBool,
    config: PoolConfig,
}

impl Pool {
    pub fn new(config: PoolConfig) -> Arc<Pool> {
        let villainous_cap = config.villainous_pool_cap;
        Arc::new(Pool {
            state: Mutex::new(PoolState::new(villainous_cap)),
            forge_failed: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Observed without the pool lock, per §5.
    pub fn forge_failed(&self) -> bool {
        self.forge_failed.load(Ordering::SeqCst)
    }

    pub fn set_forge_failed(&self) {
        self.forge_failed.store(true, Ordering::SeqCst);
    }

    pub fn reset_forge_failed(&self) {
        self.forge_failed.store(false, Ordering::SeqCst);
    }

    pub fn queue_snapshot(&self) -> Vec<Tx> {
        let mut state = self.state.lock().unwrap();
        state.resort_priced();
        state
            .priced
            .iter()
            .map(|h| state.pool[h].tx().clone())
            .collect()
    }

    /// All pending transactions, pool and reserved alike; used for
    /// diagnostics rather than block-building order.
    pub fn pending_transactions(&self) -> Vec<Tx> {
        let state = self.state.lock().unwrap();
        state
            .pool
            .values()
            .chain(state.reserved.values())
            .map(|td| td.tx().clone())
            .collect()
    }

    pub fn delete(&self, hash: &Hash) -> Result<(), MempoolError> {
        let mut state = self.state.lock().unwrap();
        if state.remove_from_pool(hash).is_some() {
            Ok(())
        } else {
            Err(MempoolError::NotFound(*hash))
        }
    }

    /// Diagnostic predicate mirroring the original's `checkTxOut`: true if
    /// the hash shows up anywhere the pool tracks it, admitted or not.
    pub fn contains(&self, hash: &Hash) -> bool {
        let state = self.state.lock().unwrap();
        state.pool.contains_key(hash)
            || state.reserved.contains_key(hash)
            || state.locked_inputs.values().any(|h| h == hash)
            || state.villainous.contains(hash)
    }

    pub fn min_fee_estimate(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.resort_priced();
        if state.priced.is_empty() {
            return self.config.minimal_fee;
        }

        let first_fee = state.pool[&state.priced[0]].fee();
        let mut total_size: usize = 0;
        let mut last_index = state.priced.len() - 1;
        for (i, hash) in state.priced.iter().enumerate() {
            let tx_size = state.pool[hash].size();
            total_size += tx_size;
            if total_size > self.config.block_size {
                // Fixed oddity: subtract this tx's own size, not the pool length.
                total_size -= tx_size;
                last_index = i;
                break;
            }
        }
        let last_fee = state.pool[&state.priced[last_index]].fee();
        (first_fee + last_fee) / 2
    }

    pub fn clear_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.pool.clear();
        state.reserved.clear();
        state.priced.clear();
        state.priced_dirty = false;
        state.locked_inputs.clear();
    }

    pub(crate) fn state(&self) -> &Mutex<PoolState> {
        &self.state
    }
}

/// Component B. Wraps a `Pool` with the validator and the UTXO/stake
/// collaborators needed to run the admission algorithm, plus the bounded
/// ingest channel the network-facing worker feeds.
pub struct MempoolEngine {
    pool: Arc<Pool>,
    validator: TransactionValidator,
    utxo: Arc<dyn UtxoReader>,
    stakes: Arc<dyn StakePool>,
    ingest_tx: mpsc::Sender<TransactionData>,
}

impl MempoolEngine {
    pub fn new(
        config: PoolConfig,
        utxo: Arc<dyn UtxoReader>,
        stakes: Arc<dyn StakePool>,
    ) -> (Arc<MempoolEngine>, Arc<Pool>, mpsc::Receiver<TransactionData>) {
        let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest_channel_capacity);
        let validator = TransactionValidator::new(&config);
        let pool = Pool::new(config);
        let engine = Arc::new(MempoolEngine {
            pool: pool.clone(),
            validator,
            utxo,
            stakes,
            ingest_tx,
        });
        (engine, pool, ingest_rx)
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn stakes(&self) -> &dyn StakePool {
        self.stakes.as_ref()
    }

    /// Asynchronous entry point (§4.2): enqueues the transaction for the
    /// ingest worker to pick up and `register`. Applies channel
    /// backpressure rather than dropping when the ingest channel is full.
    pub async fn submit(&self, tx: Tx) -> Result<(), MempoolError> {
        let td = TransactionData::new(tx);
        self.ingest_tx
            .send(td)
            .await
            .map_err(|e| MempoolError::NotFound(e.0.hash()))
    }

    /// The atomic admission algorithm (§4.2.1). The pool lock is held for
    /// steps 2, 4 and 6; it is released around the UTXO-contextual
    /// `validate` call in step 5, which is the only `.await` point, per the
    /// coarse-locking choice §4.2.1 permits. Re-checks step 2 on re-entry
    /// after the lock is reacquired to close the resulting race window.
    pub async fn register(&self, td: TransactionData) -> Result<(), MempoolError> {
        let hash = td.hash();

        self.reject_if_present(&hash)?;
        self.validator.validate_struct(td.tx())?;

        let swap_victim = self.check_double_spend(&td)?;
        if let Some(victim) = swap_victim {
            let mut state = self.pool.state().lock().unwrap();
            state.remove_from_pool(&victim);
        }

        self.validator
            .validate(td.tx(), self.utxo.as_ref(), self.stakes.as_ref())
            .await?;

        self.reject_if_present(&hash)?;

        let mut state = self.pool.state().lock().unwrap();
        for key in PoolState::input_keys(td.tx()) {
            state.locked_inputs.insert(key, hash);
        }
        state.insert_priced(hash);
        debug!(hash = %hash, fee = td.fee(), "tx admitted");
        state.pool.insert(hash, td);
        Ok(())
    }

    fn reject_if_present(&self, hash: &Hash) -> Result<(), MempoolError> {
        let state = self.pool.state().lock().unwrap();
        if state.pool.contains_key(hash) || state.reserved.contains_key(hash) {
            return Err(MempoolError::AlreadyPresent(*hash));
        }
        Ok(())
    }

    /// Step 4 of the admission algorithm: walks the candidate's inputs
    /// looking for conflicting locks. Returns the hash of a same-sender,
    /// same-num transaction to swap out, if a swap wins; otherwise either
    /// returns `Ok(None)` (no conflict) or an `Err(InputLocked)`, recording
    /// the candidate in `villainous` along the way.
    fn check_double_spend(&self, td: &TransactionData) -> Result<Option<Hash>, MempoolError> {
        let mut state = self.pool.state().lock().unwrap();
        let mut swap: Option<Hash> = None;

        for key in PoolState::input_keys(td.tx()) {
            let Some(&locked_hash) = state.locked_inputs.get(&key) else {
                continue;
            };
            let Some(existing) = state.pool.get(&locked_hash) else {
                // Locked by a reserved transaction: never swappable.
                warn!(hash = %td.hash(), "input locked by a reserved transaction");
                state.record_villainous(td.clone());
                return Err(MempoolError::InputLocked(td.hash()));
            };

            if existing.tx().sender() != td.tx().sender() {
                warn!(hash = %td.hash(), "input already claimed by a different sender");
                state.record_villainous(td.clone());
                return Err(MempoolError::InputLocked(td.hash()));
            }

            if existing.num() == td.num() && td.fee() > existing.fee() {
                swap = Some(locked_hash);
            } else {
                warn!(hash = %td.hash(), "input locked, no fee-wins swap available");
                state.record_villainous(td.clone());
                return Err(MempoolError::InputLocked(td.hash()));
            }
        }

        Ok(swap)
    }
}

/// Cancellation handle for the ingest worker, backed by `tokio::sync::Notify`
/// (§5), not a `CancellationToken` from `tokio-util` — the crate has no
/// other use for that dependency so a thin hand-rolled handle avoids adding
/// one.
#[derive(Clone, Default)]
pub struct CancellationHandle(Arc<tokio::sync::Notify>);

impl CancellationHandle {
    pub fn new() -> Self {
        CancellationHandle(Arc::new(tokio::sync::Notify::new()))
    }

    pub fn cancel(&self) {
        self.0.notify_waiters();
    }

    pub async fn cancelled(&self) {
        self.0.notified().await;
    }
}

/// Runs the single ingest worker loop described in §4.2.5 and §5: consumes
/// admitted-via-network transactions in receive order, observing the
/// forge-failed latch between iterations and racing the channel receive
/// against cancellation via `tokio::select!`.
pub async fn run_ingest_worker(
    engine: Arc<MempoolEngine>,
    mut ingest_rx: mpsc::Receiver<TransactionData>,
    cancel: CancellationHandle,
) {
    loop {
        if engine.pool().forge_failed() {
            error!("forge failed latch observed, clearing pool and exiting ingest worker");
            engine.pool().clear_all();
            return;
        }

        let td = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("ingest worker cancelled");
                return;
            }
            maybe_td = ingest_rx.recv() => match maybe_td {
                Some(td) => td,
                None => return,
            },
        };

        let hash = td.hash();
        match engine.register(td).await {
            Ok(()) => debug!(hash = %hash, "register succeeded"),
            Err(err) => warn!(hash = %hash, error = %err, "register rejected"),
        }
    }
}
