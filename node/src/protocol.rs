//! A small newline-delimited JSON protocol standing in for the excluded
//! gRPC boundary (§6). Each line on the wire is one `Request`; each
//! response is one `Response` line. Deliberately thin: no framing beyond
//! `\n`, no streaming.

use ledger_core::crypto::Address;
use ledger_core::types::{Tx, TxInput, TxOutput, TxType};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    SendRawTx { tx: WireTx },
    QueueSnapshot,
    PendingTransactions,
    Fee,
    Reserve { batch: Vec<WireTx> },
    Flush { unlock: bool },
    Rollback,
    RegisterStake { address: String },
    UnregisterStake { address: String },
    CanStake,
    CreateRewardTx { block_num: u64 },
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Tx { tx: WireTx },
    Txs { txs: Vec<WireTx> },
    Fee { fee: u64 },
    Bool { value: bool },
    Error { message: String },
}

/// JSON-friendly mirror of `ledger_core::types::Tx`. Kept separate from the
/// core type so the wire shape can evolve independently of the in-process
/// one, matching how the teacher's `network::Message` wraps rather than
/// directly serializes its domain types.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireTx {
    pub hash: String,
    pub tx_type: TxType,
    pub num: u64,
    pub timestamp: i64,
    pub fee: u64,
    pub inputs: Vec<WireInput>,
    pub outputs: Vec<WireOutput>,
    pub signature: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireInput {
    pub prev_tx_hash: String,
    pub prev_index: u32,
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireOutput {
    pub address: String,
    pub amount: u64,
    pub node_address: Option<String>,
}

impl From<&Tx> for WireTx {
    fn from(tx: &Tx) -> Self {
        WireTx {
            hash: tx.hash.to_hex(),
            tx_type: tx.tx_type,
            num: tx.num,
            timestamp: tx.timestamp,
            fee: tx.fee,
            inputs: tx
                .inputs
                .iter()
                .map(|i| WireInput {
                    prev_tx_hash: i.prev_tx_hash.to_hex(),
                    prev_index: i.prev_index,
                    address: i.address.as_str().to_string(),
                })
                .collect(),
            outputs: tx
                .outputs
                .iter()
                .map(|o| WireOutput {
                    address: o.address.as_str().to_string(),
                    amount: o.amount,
                    node_address: o.node_address.as_ref().map(|a| a.as_str().to_string()),
                })
                .collect(),
            signature: hex::encode(&tx.signature),
        }
    }
}

impl TryFrom<&WireTx> for Tx {
    type Error = anyhow::Error;

    fn try_from(wire: &WireTx) -> anyhow::Result<Self> {
        let hash = ledger_core::hash::Hash::from_hex(&wire.hash)?;
        let inputs = wire
            .inputs
            .iter()
            .map(|i| {
                Ok(TxInput {
                    prev_tx_hash: ledger_core::hash::Hash::from_hex(&i.prev_tx_hash)?,
                    prev_index: i.prev_index,
                    address: address_from_str(&i.address),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let outputs = wire
            .outputs
            .iter()
            .map(|o| TxOutput {
                address: address_from_str(&o.address),
                amount: o.amount,
                node_address: o.node_address.as_deref().map(address_from_str),
            })
            .collect();
        let signature = hex::decode(&wire.signature)?;

        Ok(Tx {
            hash,
            tx_type: wire.tx_type,
            num: wire.num,
            timestamp: wire.timestamp,
            fee: wire.fee,
            inputs,
            outputs,
            signature,
        })
    }
}

/// Addresses have no public constructor from raw text — ordinary callers
/// only ever derive one from a public key — so the wire layer goes through
/// `Address`'s derived `Deserialize` (a newtype around the hex string)
/// instead.
pub(crate) fn address_from_str(s: &str) -> Address {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .expect("address wire strings are always valid")
}
