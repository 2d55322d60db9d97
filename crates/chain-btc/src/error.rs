use thiserror::Error;

/// Transaction engine errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid public key hash length: expected 20 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    #[error("insufficient funds: have {available} sat, need {required} sat")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("awaiting confirmation: {confirmed} sat confirmed, need {required} sat")]
    AwaitingConfirmation { confirmed: u64, required: u64 },

    #[error("private key does not match utxo address: expected {expected}, found {found}")]
    AddressMismatch { expected: String, found: String },

    #[error("negative change: inputs {inputs} sat < amount {amount} sat + fee {fee} sat")]
    NegativeChange { inputs: u64, amount: u64, fee: u64 },

    #[error("invalid txid: {0}")]
    InvalidTxid(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
