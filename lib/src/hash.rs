//! Content-addressed 32-byte digests used for transaction hashes and UTXO
//! references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte SHA-256 digest.
///
/// `Hash::hash` encodes the value with `ciborium` before digesting it, so
/// any `Serialize` type can be hashed without hand-rolling a byte layout.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    pub fn hash<T: serde::Serialize>(data: &T) -> Hash {
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(data, &mut encoded).expect("BUG: failed to encode for hashing");
        let digest = sha256::digest(encoded.as_slice());
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digest, &mut bytes).expect("BUG: sha256 digest is not 64 hex chars");
        Hash(bytes)
    }

    pub fn zero() -> Hash {
        Hash([0; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Hash {
        Hash(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Hash, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Hash(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}
