//! Bitcoin transaction engine for the custody wallet.
//!
//! Provides P2PKH key and address handling (hash160 + base58check), the
//! two-tier greedy coin selector, legacy fee estimation, and construction
//! and signing of raw transactions in the canonical wire format.

pub mod address;
pub mod amount;
pub mod balance;
pub mod error;
pub mod fee;
pub mod key;
pub mod network;
pub mod transaction;
pub mod utxo;

pub use error::BtcError;
pub use network::BtcNetwork;
