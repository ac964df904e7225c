//! # ledger-core
//!
//! Core of a UTXO-based node with staking-style validator selection: the
//! transaction validator, the mempool admission engine, the reservation
//! controller that hands batches to a block builder, and the validator slot
//! registry that drives per-block reward construction.
//!
//! Wire-level gossip, SSZ serialization, the UTXO storage engine's on-disk
//! layout, gRPC framing, and chain reorganisation live outside this crate;
//! only the collaborator interfaces they must satisfy are described here
//! (see `utxo` and `feed`).

pub mod config;
pub mod crypto;
pub mod error;
pub mod feed;
pub mod hash;
pub mod mempool;
pub mod registry;
pub mod reservation;
pub mod service;
pub mod utxo;
pub mod validator;

#[path = "../types/mod.rs"]
pub mod types;
