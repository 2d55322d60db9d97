//! # custody-wallet
//!
//! Single-address custodial wallet built on the `chain-btc` engine: key and
//! address persistence, the send pipeline with its user-facing error codes,
//! balance queries, and detection of newly received outputs.
//!
//! The engine talks to the chain only through [`source::UtxoSource`],
//! [`source::Broadcaster`] and [`source::TxLookup`]. [`esplora::EsploraClient`]
//! implements all three over HTTP.

pub mod config;
pub mod error;
pub mod esplora;
pub mod keys;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod types;
pub mod wallet;
pub mod watcher;

pub use config::WalletConfig;
pub use error::WalletError;
pub use esplora::EsploraClient;
pub use keys::KeyManager;
pub use pipeline::{PreparedSend, SendPipeline};
pub use source::{Broadcaster, TxLookup, UtxoSource};
pub use store::{FileStore, MemoryStore, SecretStore, Slot};
pub use types::{ErrorCode, SendOutcome};
pub use wallet::Wallet;
pub use watcher::{Fulfilment, SeenUtxos, UtxoWatcher};
