use std::ops::ControlFlow;
use std::time::Duration;

use chain_btc::balance::{summarize, BalanceSummary};
use tracing::info;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::KeyManager;
use crate::pipeline::SendPipeline;
use crate::source::{Broadcaster, TxLookup, UtxoSource};
use crate::store::{FileStore, SecretStore};
use crate::types::SendOutcome;
use crate::watcher::{Fulfilment, SeenUtxos, UtxoWatcher};

/// The custodial wallet: one key, one address, configured for one network.
#[derive(Debug)]
pub struct Wallet<S> {
    keys: KeyManager<S>,
    address: String,
    config: WalletConfig,
}

impl Wallet<FileStore> {
    /// Open (or create) the wallet stored under `config.data_dir`.
    pub fn open_from_config(config: WalletConfig) -> Result<Self, WalletError> {
        let store = FileStore::new(config.data_dir.clone());
        Self::open(store, config)
    }
}

impl<S: SecretStore> Wallet<S> {
    /// Load or generate the key and check the stored address belongs to it.
    pub fn open(store: S, config: WalletConfig) -> Result<Self, WalletError> {
        let keys = KeyManager::new(store, config.network);
        let address = keys.verify_address()?;
        info!(address = %address, network = %config.network, "wallet opened");
        Ok(Self {
            keys,
            address,
            config,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyManager<S> {
        &self.keys
    }

    /// Confirmed, unconfirmed and total balance from a fresh UTXO fetch.
    pub fn balance(&self, source: &dyn UtxoSource) -> Result<BalanceSummary, WalletError> {
        let utxos = source.fetch_utxos(&self.address)?;
        Ok(summarize(&utxos))
    }

    pub fn pipeline<'a>(
        &'a self,
        source: &'a dyn UtxoSource,
        broadcaster: &'a dyn Broadcaster,
    ) -> SendPipeline<'a, S> {
        SendPipeline::new(&self.keys, source, broadcaster)
            .with_fee_rate(self.config.fee_rate_sat_per_byte)
    }

    pub fn send(
        &self,
        source: &dyn UtxoSource,
        broadcaster: &dyn Broadcaster,
        recipient: &str,
        amount_sat: u64,
    ) -> SendOutcome {
        self.pipeline(source, broadcaster).send(recipient, amount_sat)
    }

    pub fn send_btc(
        &self,
        source: &dyn UtxoSource,
        broadcaster: &dyn Broadcaster,
        recipient: &str,
        amount_btc: &str,
    ) -> SendOutcome {
        self.pipeline(source, broadcaster).send_btc(recipient, amount_btc)
    }

    pub fn watcher(&self) -> UtxoWatcher {
        UtxoWatcher::new(self.address.clone())
    }

    /// Run the deposit watcher at the configured poll interval.
    pub fn watch<F>(
        &self,
        seen: &mut SeenUtxos,
        source: &dyn UtxoSource,
        lookup: Option<&dyn TxLookup>,
        on_poll: F,
    ) where
        F: FnMut(&[Fulfilment], &SeenUtxos) -> ControlFlow<()>,
    {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        self.watcher().watch(seen, source, lookup, interval, on_poll);
    }
}
