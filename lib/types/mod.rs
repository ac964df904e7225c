mod tx;

pub use tx::{domain_digest, AdmissionStatus, TransactionData, Tx, TxInput, TxOptions, TxOutput, TxType};
