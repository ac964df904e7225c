//! Error taxonomy for the ledger core.
//!
//! Each component gets its own `thiserror` enum, matching the teacher's
//! habit of scoping one error type per subsystem rather than one grab-bag
//! enum for the whole crate. `CoreError` composes them at the service
//! boundary.

use crate::hash::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("malformed key encoding")]
    BadKey,
    #[error("malformed signature encoding")]
    BadSignatureEncoding,
}

/// Failure classification for `validate_struct` / `validate` (component A).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction is malformed: {reason}")]
    BadFormat { reason: String },
    #[error("signature does not verify for tx {hash}")]
    BadSignature { hash: Hash },
    #[error("tx hash does not match its contents: claimed {claimed}, computed {computed}")]
    BadHash { claimed: Hash, computed: Hash },
    #[error("input {index} of tx {hash} references an unknown output")]
    UnknownInput { hash: Hash, index: usize },
    #[error("input {index} of tx {hash} references an already-spent output")]
    SpentInput { hash: Hash, index: usize },
    #[error("input {index} of tx {hash} is not owned by the stated address")]
    OwnershipMismatch { hash: Hash, index: usize },
    #[error("tx {hash} inputs do not balance against outputs and fee")]
    BalanceMismatch { hash: Hash },
    #[error("tx {hash} num {num} is not strictly greater than the sender's last committed num")]
    NonceOutOfOrder { hash: Hash, num: u64 },
    #[error("tx {hash} fee {fee} is below the minimal fee {minimal}")]
    FeeTooLow { hash: Hash, fee: u64, minimal: u64 },
    #[error("tx {hash} has a type unsupported for this operation")]
    UnsupportedType { hash: Hash },
}

/// Failures surfaced by the mempool engine (component B).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("tx {0} is already present in the pool or reserved set")]
    AlreadyPresent(Hash),
    #[error("an input of tx {0} is locked by another transaction")]
    InputLocked(Hash),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("tx {0} was not found in the pool")]
    NotFound(Hash),
}

/// Failures surfaced by the reservation controller (component C).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("tx {0} was not found in the pool")]
    NotFound(Hash),
    #[error("tx {0} is already reserved")]
    AlreadyReserved(Hash),
}

/// Failures surfaced by the validator slot registry (component D).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("validator slots are full")]
    SlotsFull,
    #[error("address is not a registered staker")]
    UnknownStaker,
    #[error("no stakers are registered, cannot build a reward transaction")]
    NoStakers,
}

/// Top-level error composing all component errors at the service boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Mempool(#[from] MempoolError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
