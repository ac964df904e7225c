use anyhow::Result;
use argh::FromArgs;
use ledger_core::config::CoreConfig;
use ledger_core::feed::{BroadcastTxFeed, SystemClock};
use ledger_core::mempool::CancellationHandle;
use ledger_core::service::NodeService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod handler;
mod protocol;
mod store;
mod util;

#[derive(FromArgs)]
/// A node serving the mempool / validator slot registry core over a thin
/// newline-delimited JSON protocol.
struct Args {
    #[argh(option, default = "9000")]
    /// port to listen on (defaults to 9000)
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    util::init_tracing();

    let args: Args = argh::from_env();
    let config = CoreConfig::global().clone();

    let store = Arc::new(store::MockStore::new());
    let feed = Arc::new(BroadcastTxFeed::new(config.pool.ingest_channel_capacity));
    let clock = Arc::new(SystemClock);

    let (service, ingest_rx) =
        NodeService::new(config, store.clone(), store.clone(), feed, clock);

    service.bootstrap_registry().await?;

    let cancel = CancellationHandle::new();
    service.spawn_ingest_worker(ingest_rx, cancel.clone());
    service.spawn_feed_bridge(cancel);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        info!(%peer, "accepted connection");
        let service = service.clone();
        tokio::spawn(handler::handle_connection(socket, service));
    }
}
