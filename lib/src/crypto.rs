//! Signing is treated as an oracle by the rest of this crate: callers ask
//! "does this signature cover this hash for this address" and get a yes/no
//! answer. This module supplies a concrete ECDSA (secp256k1) answer to that
//! question so the validator has something real to call, but no component
//! outside this file should know or care which curve is behind it.

use crate::error::CryptoError;
use ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use spki::{DecodePublicKey, EncodePublicKey};
use std::fmt;

/// An address is the hex-encoded SEC1 byte string of a public key. It is
/// the identifier compared for "same sender" / "stated owner" checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn new_key() -> Self {
        PrivateKey(SigningKey::random(&mut OsRng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }

    pub fn sign(&self, hash: &crate::hash::Hash) -> Signature {
        let sig: EcdsaSignature = self.0.sign(hash.as_bytes());
        Signature(sig)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn address(&self) -> Address {
        Address(hex::encode(self.0.to_encoded_point(true).as_bytes()))
    }

    pub fn from_public_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_public_key_pem(pem).map_err(|_| CryptoError::BadKey)?;
        Ok(PublicKey(key))
    }

    /// Recovers the public key from the hex SEC1 encoding an `Address`
    /// wraps. Addresses are derived this way in the first place
    /// (`PublicKey::address`), so this is always the inverse of that call
    /// for any address that actually came from a key.
    pub fn from_sec1_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::BadKey)?;
        let key = VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::BadKey)?;
        Ok(PublicKey(key))
    }

    pub fn to_public_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(Default::default())
            .map_err(|_| CryptoError::BadKey)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.address())
    }
}

/// A signature over a `Hash` domain digest. Fixed-length once encoded
/// (`SIGNATURE_LENGTH` bytes); system-generated transaction types carry an
/// all-zero signature of the same length instead of a real one.
#[derive(Clone)]
pub struct Signature(EcdsaSignature);

pub const SIGNATURE_LENGTH: usize = 64;

impl Signature {
    pub fn sign_hash(hash: &crate::hash::Hash, key: &PrivateKey) -> Signature {
        key.sign(hash)
    }

    pub fn verify(&self, hash: &crate::hash::Hash, key: &PublicKey) -> bool {
        key.0.verify(hash.as_bytes(), &self.0).is_ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Signature, CryptoError> {
        EcdsaSignature::from_slice(bytes)
            .map(Signature)
            .map_err(|_| CryptoError::BadSignatureEncoding)
    }

    pub fn zeroed() -> Vec<u8> {
        vec![0u8; SIGNATURE_LENGTH]
    }

    pub fn is_zeroed(bytes: &[u8]) -> bool {
        bytes.len() == SIGNATURE_LENGTH && bytes.iter().all(|b| *b == 0)
    }
}
