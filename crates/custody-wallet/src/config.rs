//! Wallet configuration loaded from environment variables.

use std::path::PathBuf;

use chain_btc::fee::DEFAULT_FEE_RATE;
use chain_btc::BtcNetwork;

use crate::error::WalletError;

#[derive(Clone, Debug, PartialEq)]
pub struct WalletConfig {
    /// Network the wallet key and addresses belong to.
    pub network: BtcNetwork,
    /// Directory holding `private-key.txt` and `address.txt`.
    pub data_dir: PathBuf,
    /// Fee rate used by coin selection, in sat/byte.
    pub fee_rate_sat_per_byte: f64,
    /// Esplora-compatible REST endpoint for UTXO queries and broadcast.
    pub esplora_url: String,
    /// Delay between watcher polls, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let network = BtcNetwork::default();
        Self {
            network,
            data_dir: PathBuf::from("./db"),
            fee_rate_sat_per_byte: DEFAULT_FEE_RATE,
            esplora_url: network.default_esplora_url().to_string(),
            poll_interval_secs: 10,
        }
    }
}

impl WalletConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Unset variables
    /// take their defaults; the Esplora URL defaults per network.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WalletError> {
        let network = match lookup("WALLET_NETWORK") {
            Some(raw) => raw
                .parse::<BtcNetwork>()
                .map_err(|e| WalletError::Config(format!("WALLET_NETWORK: {e}")))?,
            None => BtcNetwork::default(),
        };

        let data_dir = lookup("WALLET_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./db"));

        let fee_rate_sat_per_byte = match lookup("WALLET_FEE_RATE") {
            Some(raw) => {
                let rate: f64 = raw.trim().parse().map_err(|_| {
                    WalletError::Config(format!("WALLET_FEE_RATE must be a number, got {raw:?}"))
                })?;
                if !rate.is_finite() || rate < 0.0 {
                    return Err(WalletError::Config(format!(
                        "WALLET_FEE_RATE must be non-negative, got {raw:?}"
                    )));
                }
                rate
            }
            None => DEFAULT_FEE_RATE,
        };

        let esplora_url = lookup("WALLET_ESPLORA_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| network.default_esplora_url().to_string());

        let poll_interval_secs = match lookup("WALLET_POLL_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                WalletError::Config(format!(
                    "WALLET_POLL_INTERVAL_SECS must be a positive integer, got {raw:?}"
                ))
            })?,
            None => 10,
        };

        Ok(WalletConfig {
            network,
            data_dir,
            fee_rate_sat_per_byte,
            esplora_url,
            poll_interval_secs,
        })
    }
}
