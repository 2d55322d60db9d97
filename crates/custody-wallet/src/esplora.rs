//! Blocking HTTP client for an Esplora-compatible REST API.

use std::time::Duration;

use chain_btc::utxo::Utxo;
use reqwest::blocking::{Client, Response};
use tracing::debug;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::source::{parse_output_address, parse_utxo_response, Broadcaster, TxLookup, UtxoSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to `GET /address/:address/utxo`, `POST /tx` and `GET /tx/:txid`.
#[derive(Debug, Clone)]
pub struct EsploraClient {
    base_url: String,
    http: Client,
}

impl EsploraClient {
    pub fn new(base_url: &str) -> Result<Self, WalletError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        Self::new(&config.esplora_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_text(&self, path: &str) -> Result<String, WalletError> {
        let url = self.endpoint(path);
        debug!(url = %url, "esplora GET");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| WalletError::Source(format!("GET {url}: {e}")))?;
        success_body(response).map_err(|e| WalletError::Source(format!("GET {url}: {e}")))
    }
}

/// Body of a 2xx response, or `"<status> <body>"` otherwise.
fn success_body(response: Response) -> Result<String, String> {
    let status = response.status();
    let body = response.text().map_err(|e| e.to_string())?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(format!("{status} {}", body.trim()))
    }
}

impl UtxoSource for EsploraClient {
    fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError> {
        let body = self.get_text(&format!("address/{address}/utxo"))?;
        parse_utxo_response(&body)
    }
}

impl Broadcaster for EsploraClient {
    fn broadcast(&self, raw_tx_hex: &str) -> Result<String, WalletError> {
        let url = self.endpoint("tx");
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(raw_tx_hex.to_string())
            .send()
            .map_err(|e| WalletError::Broadcast(e.to_string()))?;
        let txid = success_body(response).map_err(WalletError::Broadcast)?;
        Ok(txid.trim().to_string())
    }
}

impl TxLookup for EsploraClient {
    fn output_address(&self, txid: &str, vout: u32) -> Result<Option<String>, WalletError> {
        let body = self.get_text(&format!("tx/{txid}"))?;
        parse_output_address(&body, vout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port locally, so connects are refused.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/api";

    #[test]
    fn endpoints_join_cleanly() {
        let client = EsploraClient::new("https://mempool.space/signet/api/").unwrap();
        assert_eq!(client.base_url(), "https://mempool.space/signet/api");
        assert_eq!(
            client.endpoint("address/mabc/utxo"),
            "https://mempool.space/signet/api/address/mabc/utxo"
        );
        assert_eq!(client.endpoint("/tx"), "https://mempool.space/signet/api/tx");
    }

    #[test]
    fn uses_configured_url() {
        let config = WalletConfig {
            esplora_url: "http://localhost:3002".into(),
            ..WalletConfig::default()
        };
        let client = EsploraClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3002");
    }

    #[test]
    fn transport_failures_map_to_collaborator_errors() {
        let client = EsploraClient::new(DEAD_ENDPOINT).unwrap();
        assert!(matches!(client.fetch_utxos("mabc"), Err(WalletError::Source(_))));
        assert!(matches!(client.output_address("aa", 0), Err(WalletError::Source(_))));
        assert!(matches!(client.broadcast("0100"), Err(WalletError::Broadcast(_))));
    }
}
