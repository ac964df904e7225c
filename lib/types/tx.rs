//! The transaction model (§3 of the data model): an immutable `Tx` plus the
//! `TransactionData` pool envelope that wraps it with derived metadata.

use crate::crypto::{Address, PrivateKey, Signature};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// Transaction kind. System types (`Genesis`, `Fee`, `Reward`) are
/// generated by the node itself, carry a zeroed signature, and are never
/// submitted through the mempool.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxType {
    Normal,
    Genesis,
    Fee,
    Reward,
    Stake,
    Unstake,
}

impl TxType {
    /// Generated by the node rather than submitted by a sender; carries a
    /// zeroed signature and is skipped by `reserve`.
    pub fn is_system(self) -> bool {
        matches!(self, TxType::Genesis | TxType::Fee | TxType::Reward)
    }

    /// Types whose signature must actually verify (i.e. not system-generated).
    pub fn is_signed(self) -> bool {
        !self.is_system()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxInput {
    pub prev_tx_hash: Hash,
    pub prev_index: u32,
    pub address: Address,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub amount: u64,
    /// Set on the Stake output of a Stake transaction to mark which output
    /// is the deposit (as opposed to e.g. change); `None` otherwise.
    pub node_address: Option<Address>,
}

/// Fields hashed to produce `Tx::hash`. Deliberately excludes `signature` —
/// signing happens over the hash, so the signature cannot be part of it.
#[derive(Serialize)]
struct HashedFields<'a> {
    tx_type: TxType,
    num: u64,
    timestamp: i64,
    fee: u64,
    inputs: &'a [TxInput],
    outputs: &'a [TxOutput],
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Tx {
    pub hash: Hash,
    pub tx_type: TxType,
    pub num: u64,
    /// Nanoseconds since epoch.
    pub timestamp: i64,
    pub fee: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub signature: Vec<u8>,
}

pub struct TxOptions {
    pub tx_type: TxType,
    pub num: u64,
    pub timestamp: i64,
    pub fee: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Tx {
    /// Builds a transaction, computing its hash and — if a signing key is
    /// given — its signature over the domain digest of that hash. System
    /// types are expected to be built with `signer: None`, which leaves a
    /// zeroed signature of the conventional length.
    pub fn new(opts: TxOptions, signer: Option<&PrivateKey>) -> Tx {
        let hash = Self::compute_hash(
            opts.tx_type,
            opts.num,
            opts.timestamp,
            opts.fee,
            &opts.inputs,
            &opts.outputs,
        );

        let signature = match signer {
            Some(key) => key.sign(&domain_digest(&hash)).to_bytes(),
            None => Signature::zeroed(),
        };

        Tx {
            hash,
            tx_type: opts.tx_type,
            num: opts.num,
            timestamp: opts.timestamp,
            fee: opts.fee,
            inputs: opts.inputs,
            outputs: opts.outputs,
            signature,
        }
    }

    pub fn compute_hash(
        tx_type: TxType,
        num: u64,
        timestamp: i64,
        fee: u64,
        inputs: &[TxInput],
        outputs: &[TxOutput],
    ) -> Hash {
        Hash::hash(&HashedFields {
            tx_type,
            num,
            timestamp,
            fee,
            inputs,
            outputs,
        })
    }

    /// Recomputes the hash over the transaction's current fields and
    /// compares it against the stored `hash` — the `BadHash` check in
    /// `validate_struct`.
    pub fn recomputed_hash(&self) -> Hash {
        Self::compute_hash(
            self.tx_type,
            self.num,
            self.timestamp,
            self.fee,
            &self.inputs,
            &self.outputs,
        )
    }

    /// The single-sender address all inputs must share (§9 DESIGN NOTES).
    /// Panics if called on a transaction with no inputs; callers must run
    /// `validate_struct`'s non-empty-inputs check first.
    pub fn sender(&self) -> &Address {
        &self.inputs[0].address
    }

    pub fn encoded_size(&self) -> usize {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf).expect("BUG: tx failed to encode");
        buf.len()
    }
}

/// The digest actually signed: a domain-separated hash of the tx hash, so a
/// signature over a tx hash cannot be replayed as a signature over some
/// unrelated message that happens to equal that hash.
pub fn domain_digest(hash: &Hash) -> Hash {
    Hash::hash(&("tx-signature-domain-v1", hash))
}

/// Pool envelope wrapping a `Tx` with metadata derived once at admission
/// time (§3 `TransactionData`).
#[derive(Clone, Debug)]
pub struct TransactionData {
    tx: Tx,
    size: usize,
    fee: u64,
    num: u64,
    timestamp: i64,
    alias: Vec<Hash>,
    status: AdmissionStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionStatus {
    Pending,
    Admitted,
    Reserved,
    Rejected,
}

impl TransactionData {
    pub fn new(tx: Tx) -> Self {
        let size = tx.encoded_size();
        let fee = tx.fee;
        let num = tx.num;
        let timestamp = tx.timestamp;
        TransactionData {
            tx,
            size,
            fee,
            num,
            timestamp,
            alias: Vec::new(),
            status: AdmissionStatus::Pending,
        }
    }

    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn into_tx(self) -> Tx {
        self.tx
    }

    pub fn hash(&self) -> Hash {
        self.tx.hash
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn add_alias(&mut self, hash: Hash) {
        self.alias.push(hash);
    }

    pub fn aliases(&self) -> &[Hash] {
        &self.alias
    }

    pub fn status(&self) -> AdmissionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: AdmissionStatus) {
        self.status = status;
    }
}
