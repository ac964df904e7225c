//! Accept-loop connection handler: reads one `Request` per line from the
//! socket, dispatches it to the `NodeService`, and writes back one
//! `Response` line. Mirrors the shape of the teacher's own
//! `handle_connection` (one task per socket, loop until the peer closes or
//! sends something unparseable) without re-implementing its SSZ framing.

use crate::protocol::{address_from_str, Request, Response, WireTx};
use ledger_core::service::NodeService;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::warn;

pub async fn handle_connection(socket: TcpStream, service: Arc<NodeService>) {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("error reading from peer: {e}, closing connection");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("malformed request from peer: {e}");
                let response = Response::Error {
                    message: format!("bad request: {e}"),
                };
                if send(&mut write_half, &response).await.is_err() {
                    return;
                }
                continue;
            }
        };

        let response = dispatch(&service, request).await;
        if send(&mut write_half, &response).await.is_err() {
            return;
        }
    }
}

async fn dispatch(service: &Arc<NodeService>, request: Request) -> Response {
    match request {
        Request::SendRawTx { tx } => match (&tx).try_into() {
            Ok(tx) => {
                service.send_raw_tx(tx);
                Response::Ok
            }
            Err(e) => Response::Error {
                message: format!("malformed tx: {e}"),
            },
        },
        Request::QueueSnapshot => {
            let txs = service.queue_snapshot().iter().map(WireTx::from).collect();
            Response::Txs { txs }
        }
        Request::PendingTransactions => {
            let txs = service
                .pending_transactions()
                .iter()
                .map(WireTx::from)
                .collect();
            Response::Txs { txs }
        }
        Request::Fee => Response::Fee { fee: service.fee() },
        Request::Reserve { batch } => {
            let txs: Result<Vec<_>, _> = batch.iter().map(|w| w.try_into()).collect();
            match txs {
                Ok(txs) => match service.reserve(&txs) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                },
                Err(e) => Response::Error {
                    message: format!("malformed tx in batch: {e}"),
                },
            }
        }
        Request::Flush { unlock } => {
            service.flush(unlock);
            Response::Ok
        }
        Request::Rollback => {
            service.rollback();
            Response::Ok
        }
        Request::RegisterStake { address } => match service.register_stake(address_from_str(&address)) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
        Request::UnregisterStake { address } => {
            match service.unregister_stake(&address_from_str(&address)) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }
        Request::CanStake => Response::Bool {
            value: service.can_stake(),
        },
        Request::CreateRewardTx { block_num } => match service.create_reward_tx(block_num) {
            Ok(tx) => Response::Tx { tx: (&tx).into() },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },
    }
}

async fn send(
    socket: &mut tokio::net::tcp::OwnedWriteHalf,
    response: &Response,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response).expect("Response always serializes");
    line.push('\n');
    socket.write_all(line.as_bytes()).await
}
