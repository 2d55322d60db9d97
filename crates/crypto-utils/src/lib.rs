//! # crypto-utils
//!
//! Secure random generation and zeroize-on-drop containers for the key
//! material held by the custody wallet.

pub mod random;
pub mod zeroizing;

pub use zeroizing::{SecretBytes, ZeroizingString};
