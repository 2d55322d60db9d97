use chain_btc::BtcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Btc(#[from] BtcError),

    #[error("Amount {0} sat is at or below the dust limit")]
    DustAmount(u64),

    #[error("No UTXOs available for {0}")]
    UtxosEmpty(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("UTXO source error: {0}")]
    Source(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
