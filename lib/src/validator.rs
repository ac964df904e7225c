//! Component A: the transaction validator. Stateless structural checks plus
//! UTXO-contextual checks against a snapshot reader. Pure with respect to
//! the UTXO snapshot: this module never mutates storage.

use crate::config::PoolConfig;
use crate::crypto::{PublicKey, Signature};
use crate::error::ValidationError;
use crate::types::{domain_digest, Tx, TxType};
use crate::utxo::{InputKey, StakePool, UtxoReader};
use std::time::Instant;
use tracing::debug;

pub struct TransactionValidator {
    minimal_fee: u64,
}

impl TransactionValidator {
    pub fn new(config: &PoolConfig) -> Self {
        TransactionValidator {
            minimal_fee: config.minimal_fee,
        }
    }

    /// Stateless checks: hash integrity, signature well-formedness, input/
    /// output shape, single-sender constraint, minimal fee for Normal. O(1)
    /// with respect to chain state.
    pub fn validate_struct(&self, tx: &Tx) -> Result<(), ValidationError> {
        let start = Instant::now();

        let computed = tx.recomputed_hash();
        if computed != tx.hash {
            return Err(ValidationError::BadHash {
                claimed: tx.hash,
                computed,
            });
        }

        if tx.tx_type.is_signed() {
            if tx.inputs.is_empty() {
                return Err(ValidationError::BadFormat {
                    reason: "non-system transaction has no inputs".into(),
                });
            }
            let sender = tx.sender();
            if !tx.inputs.iter().all(|i| &i.address == sender) {
                return Err(ValidationError::BadFormat {
                    reason: "inputs do not share a single sender address".into(),
                });
            }

            let sig = Signature::from_bytes(&tx.signature).map_err(|_| ValidationError::BadSignature {
                hash: tx.hash,
            })?;
            let key = address_public_key(sender)?;
            if !sig.verify(&domain_digest(&tx.hash), &key) {
                return Err(ValidationError::BadSignature { hash: tx.hash });
            }
        } else if !Signature::is_zeroed(&tx.signature) {
            return Err(ValidationError::BadFormat {
                reason: "system transaction carries a non-zero signature".into(),
            });
        }

        if tx.outputs.is_empty() {
            return Err(ValidationError::BadFormat {
                reason: "transaction has no outputs".into(),
            });
        }

        if tx.tx_type == TxType::Normal && tx.fee < self.minimal_fee {
            return Err(ValidationError::FeeTooLow {
                hash: tx.hash,
                fee: tx.fee,
                minimal: self.minimal_fee,
            });
        }

        debug!(hash = %tx.hash, elapsed_us = start.elapsed().as_micros(), "validate_struct complete");
        Ok(())
    }

    /// UTXO-contextual checks: input existence/ownership, balance, nonce
    /// monotonicity, and (for Unstake) current staker registration.
    pub async fn validate(
        &self,
        tx: &Tx,
        utxo: &dyn UtxoReader,
        stakes: &dyn StakePool,
    ) -> Result<(), ValidationError> {
        let start = Instant::now();

        let mut input_total: u64 = 0;
        for (index, input) in tx.inputs.iter().enumerate() {
            let key = InputKey::new(input.prev_tx_hash, input.prev_index as u32);
            let found = utxo.find_unspent(&key).await.ok_or(ValidationError::UnknownInput {
                hash: tx.hash,
                index,
            })?;
            if found.address != input.address {
                return Err(ValidationError::OwnershipMismatch {
                    hash: tx.hash,
                    index,
                });
            }
            input_total = input_total
                .checked_add(found.amount)
                .ok_or(ValidationError::BalanceMismatch { hash: tx.hash })?;
        }

        let output_total: u64 = tx.outputs.iter().map(|o| o.amount).sum();

        let balances = match tx.tx_type {
            TxType::Normal => input_total == output_total + tx.fee,
            TxType::Stake | TxType::Unstake => input_total == output_total,
            _ => {
                return Err(ValidationError::UnsupportedType { hash: tx.hash });
            }
        };
        if !balances {
            return Err(ValidationError::BalanceMismatch { hash: tx.hash });
        }

        if tx.tx_type.is_signed() {
            let sender = tx.sender();
            let last_num = utxo.last_nonce_for(sender).await;
            if tx.num <= last_num {
                return Err(ValidationError::NonceOutOfOrder {
                    hash: tx.hash,
                    num: tx.num,
                });
            }
        }

        if tx.tx_type == TxType::Unstake {
            let sender = tx.sender();
            let is_staker = stakes
                .stake_deposits()
                .await
                .iter()
                .any(|(addr, _)| addr == sender);
            if !is_staker {
                return Err(ValidationError::BadFormat {
                    reason: "unstake sender is not a registered staker".into(),
                });
            }
        }

        debug!(hash = %tx.hash, elapsed_us = start.elapsed().as_micros(), "validate complete");
        Ok(())
    }
}

/// Addresses are the hex SEC1 encoding of a public key, so the key can be
/// recovered directly without a separate lookup collaborator.
fn address_public_key(address: &crate::crypto::Address) -> Result<PublicKey, ValidationError> {
    PublicKey::from_sec1_hex(address.as_str()).map_err(|_| ValidationError::BadFormat {
        reason: "address is not a valid SEC1-encoded public key".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::types::{TxInput, TxOptions, TxOutput};
    use crate::utxo::test_support::FakeUtxoSet;

    fn config() -> PoolConfig {
        PoolConfig {
            block_size: 1_000_000,
            minimal_fee: 1,
            ingest_channel_capacity: 10,
            villainous_pool_cap: 10,
        }
    }

    #[test]
    fn struct_check_rejects_tampered_hash() {
        let validator = TransactionValidator::new(&config());
        let key = PrivateKey::new_key();
        let addr = key.public_key().address();
        let mut tx = Tx::new(
            TxOptions {
                tx_type: TxType::Normal,
                num: 1,
                timestamp: 1,
                fee: 1,
                inputs: vec![TxInput {
                    prev_tx_hash: crate::hash::Hash::zero(),
                    prev_index: 0,
                    address: addr,
                }],
                outputs: vec![TxOutput {
                    address: PrivateKey::new_key().public_key().address(),
                    amount: 1,
                    node_address: None,
                }],
            },
            Some(&key),
        );
        tx.fee = 99;
        let err = validator.validate_struct(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::BadHash { .. }));
    }

    #[tokio::test]
    async fn contextual_check_rejects_unknown_input() {
        let validator = TransactionValidator::new(&config());
        let key = PrivateKey::new_key();
        let addr = key.public_key().address();
        let tx = Tx::new(
            TxOptions {
                tx_type: TxType::Normal,
                num: 1,
                timestamp: 1,
                fee: 1,
                inputs: vec![TxInput {
                    prev_tx_hash: crate::hash::Hash::zero(),
                    prev_index: 0,
                    address: addr,
                }],
                outputs: vec![TxOutput {
                    address: PrivateKey::new_key().public_key().address(),
                    amount: 1,
                    node_address: None,
                }],
            },
            Some(&key),
        );
        let utxo = FakeUtxoSet::new();
        let err = validator
            .validate(&tx, &utxo, &utxo)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownInput { .. }));
    }
}
