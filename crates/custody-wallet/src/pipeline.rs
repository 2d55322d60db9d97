//! Validate, select, sign and broadcast a payment.

use chain_btc::address::validate_address;
use chain_btc::amount::parse_btc;
use chain_btc::fee::{DEFAULT_FEE_RATE, DUST_LIMIT_SATS};
use chain_btc::transaction::{build_transaction, sign_transaction};
use chain_btc::utxo::CoinSelector;
use chain_btc::BtcError;
use tracing::{debug, error, info, warn};

use crate::error::WalletError;
use crate::keys::KeyManager;
use crate::source::{Broadcaster, UtxoSource};
use crate::store::SecretStore;
use crate::types::{ErrorCode, SendOutcome};

/// A signed payment that has not been broadcast yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSend {
    pub raw_tx_hex: String,
    pub txid: String,
    pub amount_sat: u64,
    pub fee_sat: u64,
    pub change_sat: u64,
    pub inputs: usize,
}

/// One send attempt's wiring: the key manager plus the chain collaborators.
pub struct SendPipeline<'a, S> {
    keys: &'a KeyManager<S>,
    source: &'a dyn UtxoSource,
    broadcaster: &'a dyn Broadcaster,
    fee_rate_sat_per_byte: f64,
}

impl<'a, S: SecretStore> SendPipeline<'a, S> {
    pub fn new(
        keys: &'a KeyManager<S>,
        source: &'a dyn UtxoSource,
        broadcaster: &'a dyn Broadcaster,
    ) -> Self {
        Self {
            keys,
            source,
            broadcaster,
            fee_rate_sat_per_byte: DEFAULT_FEE_RATE,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate_sat_per_byte: f64) -> Self {
        self.fee_rate_sat_per_byte = fee_rate_sat_per_byte;
        self
    }

    /// Send `amount_sat` to `recipient`, mapping any failure to its user-facing code.
    pub fn send(&self, recipient: &str, amount_sat: u64) -> SendOutcome {
        match self.run(recipient, amount_sat) {
            Ok(txid) => SendOutcome::Sent { txid },
            Err(err) => Self::failure(err),
        }
    }

    /// [`send`](Self::send) with a decimal BTC amount such as `"0.0005"`.
    pub fn send_btc(&self, recipient: &str, amount_btc: &str) -> SendOutcome {
        match parse_btc(amount_btc) {
            Ok(amount_sat) => self.send(recipient, amount_sat),
            Err(err) => Self::failure(err.into()),
        }
    }

    /// Prepare and broadcast, returning the txid reported by the broadcaster.
    pub fn run(&self, recipient: &str, amount_sat: u64) -> Result<String, WalletError> {
        let prepared = self.prepare(recipient, amount_sat)?;
        let txid = self.broadcaster.broadcast(&prepared.raw_tx_hex)?;
        if txid != prepared.txid {
            warn!(
                local_txid = %prepared.txid,
                reported_txid = %txid,
                "broadcaster reported a different txid"
            );
        }
        info!(
            txid = %txid,
            amount_sat = prepared.amount_sat,
            fee_sat = prepared.fee_sat,
            inputs = prepared.inputs,
            "transaction broadcast"
        );
        Ok(txid)
    }

    /// Everything up to, but not including, the broadcast.
    pub fn prepare(&self, recipient: &str, amount_sat: u64) -> Result<PreparedSend, WalletError> {
        let network = self.keys.network();
        if !validate_address(recipient, network) {
            return Err(BtcError::InvalidRecipientAddress(recipient.to_string()).into());
        }
        if amount_sat <= DUST_LIMIT_SATS {
            return Err(WalletError::DustAmount(amount_sat));
        }

        let wallet_address = self.keys.verify_address()?;
        let utxos = self.source.fetch_utxos(&wallet_address)?;
        if utxos.is_empty() {
            return Err(WalletError::UtxosEmpty(wallet_address));
        }
        debug!(utxos = utxos.len(), amount_sat, "fetched wallet utxos");

        let mut selector = CoinSelector::new(amount_sat, utxos, wallet_address.as_str())
            .with_fee_rate(self.fee_rate_sat_per_byte);
        let selection = selector.select()?;

        let private_key = self.keys.get_private_key()?;
        let unsigned = build_transaction(
            recipient,
            amount_sat,
            selection.fee_sat,
            &selection.selected,
            &wallet_address,
            network,
        )?;
        let signed = sign_transaction(&unsigned, &private_key)?;

        Ok(PreparedSend {
            raw_tx_hex: signed.to_hex(),
            txid: signed.txid(),
            amount_sat,
            fee_sat: selection.fee_sat,
            change_sat: selection.change_sat(amount_sat).unwrap_or(0),
            inputs: selection.selected.len(),
        })
    }

    fn failure(err: WalletError) -> SendOutcome {
        let code = ErrorCode::from_error(&err);
        match &err {
            WalletError::Btc(BtcError::NegativeChange { .. }) => {
                error!(error = %err, "selection and builder disagree on funds");
            }
            _ if code == ErrorCode::UnknownError => {
                error!(error = %err, "send failed unexpectedly");
            }
            _ => warn!(code = %code, error = %err, "send rejected"),
        }
        SendOutcome::Failed { error_code: code }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chain_btc::utxo::Utxo;

    use super::*;
    use crate::store::MemoryStore;

    const KEY_HEX: &str = "4f3edf983ac63e6c9eab9d9250b37c99d2d29a2586e93c1bc980f843865a4d13";
    const RECIPIENT: &str = "mhkhVMBr2tz2U8AzVCauq9D61jt4pzKmw2";

    struct Fixed {
        utxos: Vec<Utxo>,
        calls: Cell<usize>,
    }

    impl Fixed {
        fn new(utxos: Vec<Utxo>) -> Self {
            Self {
                utxos,
                calls: Cell::new(0),
            }
        }
    }

    impl UtxoSource for Fixed {
        fn fetch_utxos(&self, _address: &str) -> Result<Vec<Utxo>, WalletError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.utxos.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<String>>,
    }

    impl Broadcaster for Recorder {
        fn broadcast(&self, raw_tx_hex: &str) -> Result<String, WalletError> {
            self.sent.borrow_mut().push(raw_tx_hex.to_string());
            Ok("remote-txid".into())
        }
    }

    struct Down;

    impl Broadcaster for Down {
        fn broadcast(&self, _raw_tx_hex: &str) -> Result<String, WalletError> {
            Err(WalletError::Broadcast("503 Service Unavailable".into()))
        }
    }

    fn keys() -> KeyManager<MemoryStore> {
        KeyManager::new(MemoryStore::with_private_key(KEY_HEX), chain_btc::BtcNetwork::Signet)
    }

    #[test]
    fn sends_with_change() {
        let keys = keys();
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        let prepared = pipeline.prepare(RECIPIENT, 50_000).unwrap();
        assert_eq!(prepared.fee_sat, 546);
        assert_eq!(prepared.change_sat, 9_454);
        assert_eq!(prepared.inputs, 1);

        let outcome = pipeline.send(RECIPIENT, 50_000);
        assert_eq!(outcome.txid(), Some("remote-txid"));
        assert_eq!(broadcaster.sent.borrow().len(), 1);
    }

    #[test]
    fn dust_rejected_before_fetch() {
        let keys = keys();
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        assert_eq!(
            pipeline.send(RECIPIENT, 546).error_code(),
            Some(ErrorCode::Dust)
        );
        assert_eq!(source.calls.get(), 0);
        assert_eq!(
            pipeline.send(RECIPIENT, 547).error_code(),
            None,
        );
    }

    #[test]
    fn invalid_recipient_checked_first() {
        let keys = keys();
        let source = Fixed::new(vec![]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        assert_eq!(
            pipeline.send("not-an-address", 10).error_code(),
            Some(ErrorCode::InvalidRecipientAddress)
        );
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn empty_utxo_set() {
        let keys = keys();
        let source = Fixed::new(vec![]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        assert_eq!(
            pipeline.send(RECIPIENT, 10_000).error_code(),
            Some(ErrorCode::UtxosEmpty)
        );
    }

    #[test]
    fn broadcast_failure_is_unknown_error() {
        let keys = keys();
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let pipeline = SendPipeline::new(&keys, &source, &Down);

        assert_eq!(
            pipeline.send(RECIPIENT, 10_000).error_code(),
            Some(ErrorCode::UnknownError)
        );
    }

    #[test]
    fn btc_amount_string() {
        let keys = keys();
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        assert!(pipeline.send_btc(RECIPIENT, "0.0005").is_success());
        assert_eq!(
            pipeline.send_btc(RECIPIENT, "abc").error_code(),
            Some(ErrorCode::Dust)
        );
    }

    #[test]
    fn foreign_stored_address_blocks_signing() {
        let store = MemoryStore::with_private_key(KEY_HEX);
        store.write_once(crate::store::Slot::Address, RECIPIENT).unwrap();
        let keys = KeyManager::new(store, chain_btc::BtcNetwork::Signet);
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster);

        assert!(matches!(
            pipeline.prepare(RECIPIENT, 50_000),
            Err(WalletError::Btc(BtcError::AddressMismatch { .. }))
        ));
        assert!(broadcaster.sent.borrow().is_empty());
    }

    #[test]
    fn higher_fee_rate_raises_fee() {
        let keys = keys();
        let source = Fixed::new(vec![Utxo::new("aa".repeat(32), 0, 60_000, true)]);
        let broadcaster = Recorder::default();
        let pipeline = SendPipeline::new(&keys, &source, &broadcaster).with_fee_rate(5.0);

        // 226 bytes * 5 sat/byte
        assert_eq!(pipeline.prepare(RECIPIENT, 50_000).unwrap().fee_sat, 1_130);
    }
}
