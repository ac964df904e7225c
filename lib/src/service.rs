//! Wires the four components into the single facade the process entrypoint
//! (the `node` crate) drives, plus the background tasks that bridge the
//! external `TxFeed` into the mempool's ingest channel.

use crate::config::CoreConfig;
use crate::crypto::Address;
use crate::error::{MempoolError, RegistryError, ReservationError};
use crate::feed::{TxFeed, UtcClock};
use crate::mempool::{run_ingest_worker, CancellationHandle, MempoolEngine, Pool};
use crate::registry::ValidatorSlotRegistry;
use crate::reservation::ReservationController;
use crate::types::{Tx, TransactionData};
use crate::utxo::{StakePool, UtxoReader};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct NodeService {
    mempool: Arc<MempoolEngine>,
    pool: Arc<Pool>,
    reservation: ReservationController,
    registry: Arc<ValidatorSlotRegistry>,
    feed: Arc<dyn TxFeed>,
    clock: Arc<dyn UtcClock>,
}

impl NodeService {
    pub fn new(
        config: CoreConfig,
        utxo: Arc<dyn UtxoReader>,
        stakes: Arc<dyn StakePool>,
        feed: Arc<dyn TxFeed>,
        clock: Arc<dyn UtcClock>,
    ) -> (Arc<NodeService>, tokio::sync::mpsc::Receiver<TransactionData>) {
        let (mempool, pool, ingest_rx) = MempoolEngine::new(config.pool, utxo, stakes);
        let reservation = ReservationController::new(pool.clone());
        let registry = Arc::new(ValidatorSlotRegistry::new(&config.registry));

        let service = Arc::new(NodeService {
            mempool,
            pool,
            reservation,
            registry,
            feed,
            clock,
        });
        (service, ingest_rx)
    }

    /// Loads the validator slot registry from the stake pool's current
    /// deposits; run once at process startup.
    pub async fn bootstrap_registry(&self) -> Result<(), RegistryError> {
        let deposits = self.mempool_stakes().stake_deposits().await;
        self.registry
            .load_from_deposits(deposits.into_iter().map(|(address, _amount)| address))
    }

    fn mempool_stakes(&self) -> &dyn StakePool {
        self.mempool.stakes()
    }

    pub fn spawn_ingest_worker(
        self: &Arc<Self>,
        ingest_rx: tokio::sync::mpsc::Receiver<TransactionData>,
        cancel: CancellationHandle,
    ) -> JoinHandle<()> {
        tokio::spawn(run_ingest_worker(self.mempool.clone(), ingest_rx, cancel))
    }

    /// Bridges the external `TxFeed` into the mempool's `submit` entry
    /// point, so published transactions reach the ingest worker.
    pub fn spawn_feed_bridge(self: &Arc<Self>, cancel: CancellationHandle) -> JoinHandle<()> {
        let mempool = self.mempool.clone();
        let feed = self.feed.clone();
        tokio::spawn(async move {
            let mut rx = feed.subscribe();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    received = rx.recv() => {
                        match received {
                            Ok(tx) => {
                                if let Err(err) = mempool.submit(tx).await {
                                    warn!(error = %err, "submit failed for fed transaction");
                                }
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(skipped, "tx feed bridge lagged, dropping skipped transactions");
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                        }
                    }
                }
            }
        })
    }

    /// `SendRawTx` (§6): publishes onto the feed. SSZ byte-shape
    /// verification is the excluded collaborator's job; this is only the
    /// publish step.
    pub fn send_raw_tx(&self, tx: Tx) {
        self.feed.publish(tx);
    }

    pub fn queue_snapshot(&self) -> Vec<Tx> {
        self.pool.queue_snapshot()
    }

    pub fn pending_transactions(&self) -> Vec<Tx> {
        self.pool.pending_transactions()
    }

    pub fn fee(&self) -> u64 {
        self.pool.min_fee_estimate()
    }

    pub fn delete(&self, hash: &crate::hash::Hash) -> Result<(), MempoolError> {
        self.pool.delete(hash)
    }

    pub fn contains(&self, hash: &crate::hash::Hash) -> bool {
        self.pool.contains(hash)
    }

    pub fn reserve(&self, batch: &[Tx]) -> Result<(), ReservationError> {
        self.reservation.reserve(batch)
    }

    pub fn flush(&self, unlock_inputs: bool) {
        self.reservation.flush(unlock_inputs);
    }

    pub fn rollback(&self) {
        self.reservation.rollback();
    }

    /// Signals the forge-failed latch (§4.2.5); observed by the ingest
    /// worker, which clears the pool and exits.
    pub fn signal_forge_failed(&self) {
        self.pool.set_forge_failed();
    }

    pub fn register_stake(&self, address: Address) -> Result<(), RegistryError> {
        self.registry.register_stake(address)
    }

    pub fn unregister_stake(&self, address: &Address) -> Result<(), RegistryError> {
        self.registry.unregister_stake(address)
    }

    pub fn can_stake(&self) -> bool {
        self.registry.can_stake()
    }

    pub fn create_reward_tx(&self, block_num: u64) -> Result<Tx, RegistryError> {
        self.registry
            .build_reward_transaction(block_num, self.clock.now_nanos())
    }
}
