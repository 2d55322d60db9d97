//! Detection of newly received outputs.
//!
//! The caller owns the [`SeenUtxos`] set and decides where it lives. A
//! watcher is primed once with everything already owned, then polled; each
//! poll returns the unconfirmed outputs that appeared since.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::ops::ControlFlow;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chain_btc::utxo::Utxo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::WalletError;
use crate::source::{TxLookup, UtxoSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SeenEntry {
    txid: String,
    vout: u32,
    value: u64,
}

/// Outputs already reported, keyed by `(txid, vout)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenUtxos {
    entries: BTreeMap<(String, u32), u64>,
}

impl SeenUtxos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an output. Returns `false` if it was already present.
    pub fn insert(&mut self, txid: &str, vout: u32, value_sats: u64) -> bool {
        let key = (txid.to_string(), vout);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value_sats);
        true
    }

    pub fn contains(&self, txid: &str, vout: u32) -> bool {
        self.entries.contains_key(&(txid.to_string(), vout))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load from a JSON file. A missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let list: Vec<SeenEntry> = serde_json::from_str(&body)?;
        let mut seen = Self::new();
        for entry in list {
            seen.insert(&entry.txid, entry.vout, entry.value);
        }
        Ok(seen)
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let list: Vec<SeenEntry> = self
            .entries
            .iter()
            .map(|((txid, vout), value)| SeenEntry {
                txid: txid.clone(),
                vout: *vout,
                value: *value,
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&list)?)?;
        Ok(())
    }
}

/// A newly detected incoming output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fulfilment {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
}

/// Watches a single address for incoming outputs.
#[derive(Debug, Clone)]
pub struct UtxoWatcher {
    address: String,
}

impl UtxoWatcher {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Mark every output currently owned as seen, so that only later
    /// arrivals are reported. Returns the number of outputs added.
    pub fn prime(
        &self,
        seen: &mut SeenUtxos,
        source: &dyn UtxoSource,
        lookup: Option<&dyn TxLookup>,
    ) -> Result<usize, WalletError> {
        let utxos = source.fetch_utxos(&self.address)?;
        let mut added = 0;
        for utxo in utxos.iter().filter(|u| self.owns(u, lookup)) {
            if seen.insert(&utxo.txid, utxo.vout, utxo.amount_sat) {
                added += 1;
            }
        }
        info!(address = %self.address, added, total = seen.len(), "watcher primed");
        Ok(added)
    }

    /// Report unconfirmed outputs not yet in `seen`, recording them.
    pub fn poll(
        &self,
        seen: &mut SeenUtxos,
        source: &dyn UtxoSource,
        lookup: Option<&dyn TxLookup>,
    ) -> Result<Vec<Fulfilment>, WalletError> {
        let utxos = source.fetch_utxos(&self.address)?;
        let mut found = Vec::new();

        for utxo in utxos.into_iter().filter(|u| !u.confirmed) {
            if seen.contains(&utxo.txid, utxo.vout) || !self.owns(&utxo, lookup) {
                continue;
            }
            seen.insert(&utxo.txid, utxo.vout, utxo.amount_sat);
            info!(
                txid = %utxo.txid,
                vout = utxo.vout,
                value_sats = utxo.amount_sat,
                "incoming output detected"
            );
            found.push(Fulfilment {
                txid: utxo.txid,
                vout: utxo.vout,
                value_sats: utxo.amount_sat,
            });
        }

        debug!(new = found.len(), "watcher poll complete");
        Ok(found)
    }

    /// Poll every `interval` until `on_poll` breaks. `on_poll` sees each
    /// round's detections along with the updated seen set, so it can persist
    /// it. A failed poll is logged and reported as an empty round.
    pub fn watch<F>(
        &self,
        seen: &mut SeenUtxos,
        source: &dyn UtxoSource,
        lookup: Option<&dyn TxLookup>,
        interval: Duration,
        mut on_poll: F,
    ) where
        F: FnMut(&[Fulfilment], &SeenUtxos) -> ControlFlow<()>,
    {
        loop {
            let found = self.poll(seen, source, lookup).unwrap_or_else(|err| {
                warn!(address = %self.address, error = %err, "watcher poll failed");
                Vec::new()
            });
            if on_poll(&found, seen).is_break() {
                return;
            }
            thread::sleep(interval);
        }
    }

    // Without a lookup the source is trusted. A failed lookup counts as not ours.
    fn owns(&self, utxo: &Utxo, lookup: Option<&dyn TxLookup>) -> bool {
        let Some(lookup) = lookup else {
            return true;
        };
        match lookup.output_address(&utxo.txid, utxo.vout) {
            Ok(Some(addr)) => addr == self.address,
            Ok(None) => false,
            Err(err) => {
                warn!(txid = %utxo.txid, vout = utxo.vout, error = %err, "output lookup failed");
                false
            }
        }
    }
}
