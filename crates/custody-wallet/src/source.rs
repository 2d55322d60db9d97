//! Collaborator seams for chain data, plus the Esplora wire shapes.
//!
//! Implementations report transport failures as `WalletError::Source` or
//! `WalletError::Broadcast`; nothing retries. The HTTP implementation is
//! [`crate::esplora::EsploraClient`].

use chain_btc::utxo::Utxo;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Supplies the current UTXO set of an address.
pub trait UtxoSource {
    fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError>;
}

/// Submits a raw transaction to the network.
pub trait Broadcaster {
    /// Broadcast hex-encoded `raw_tx_hex`, returning the txid the network reports.
    fn broadcast(&self, raw_tx_hex: &str) -> Result<String, WalletError>;
}

/// Resolves the address an output pays to.
pub trait TxLookup {
    /// `None` when the output has no standard address.
    fn output_address(&self, txid: &str, vout: u32) -> Result<Option<String>, WalletError>;
}

impl<T: UtxoSource + ?Sized> UtxoSource for &T {
    fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError> {
        (**self).fetch_utxos(address)
    }
}

impl<T: Broadcaster + ?Sized> Broadcaster for &T {
    fn broadcast(&self, raw_tx_hex: &str) -> Result<String, WalletError> {
        (**self).broadcast(raw_tx_hex)
    }
}

impl<T: TxLookup + ?Sized> TxLookup for &T {
    fn output_address(&self, txid: &str, vout: u32) -> Result<Option<String>, WalletError> {
        (**self).output_address(txid, vout)
    }
}

/// Confirmation status block of an Esplora UTXO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsploraStatus {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// One entry of `GET /address/:address/utxo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsploraUtxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub status: EsploraStatus,
}

impl EsploraUtxo {
    pub fn into_utxo(self) -> Utxo {
        Utxo::new(self.txid, self.vout, self.value, self.status.confirmed)
    }
}

/// Parse a full `/address/:address/utxo` response body.
pub fn parse_utxo_response(body: &str) -> Result<Vec<Utxo>, WalletError> {
    let entries: Vec<EsploraUtxo> = serde_json::from_str(body)?;
    Ok(entries.into_iter().map(EsploraUtxo::into_utxo).collect())
}

/// One output of `GET /tx/:txid`, as far as ownership checks need it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EsploraTxOut {
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct EsploraTx {
    vout: Vec<EsploraTxOut>,
}

/// Extract the address of output `vout` from a `/tx/:txid` response body.
pub fn parse_output_address(body: &str, vout: u32) -> Result<Option<String>, WalletError> {
    let tx: EsploraTx = serde_json::from_str(body)?;
    Ok(tx
        .vout
        .into_iter()
        .nth(vout as usize)
        .and_then(|out| out.scriptpubkey_address))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTXO_BODY: &str = r#"[
        {"txid":"aa11","vout":0,"value":60000,
         "status":{"confirmed":true,"block_height":200000,
                   "block_hash":"00ff","block_time":1700000000}},
        {"txid":"bb22","vout":3,"value":1200,"status":{"confirmed":false}}
    ]"#;

    #[test]
    fn parses_esplora_utxos() {
        let utxos = parse_utxo_response(UTXO_BODY).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0], Utxo::new("aa11", 0, 60_000, true));
        assert_eq!(utxos[1], Utxo::new("bb22", 3, 1_200, false));
        assert!(utxos.iter().all(|u| u.address.is_none()));
    }

    #[test]
    fn empty_response_is_empty_set() {
        assert!(parse_utxo_response("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_json_error() {
        assert!(matches!(
            parse_utxo_response("{\"error\":1}"),
            Err(WalletError::Json(_))
        ));
    }

    #[test]
    fn output_address_by_index() {
        let body = r#"{"txid":"cc","vout":[
            {"scriptpubkey_address":"mA","value":10},
            {"scriptpubkey":"6a00","value":0},
            {"scriptpubkey_address":"mC","value":30}
        ]}"#;
        assert_eq!(parse_output_address(body, 0).unwrap().as_deref(), Some("mA"));
        assert_eq!(parse_output_address(body, 1).unwrap(), None);
        assert_eq!(parse_output_address(body, 2).unwrap().as_deref(), Some("mC"));
        assert_eq!(parse_output_address(body, 9).unwrap(), None);
    }
}
