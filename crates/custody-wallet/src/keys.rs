//! Lazily generated, persisted wallet key and address.

use chain_btc::address::pubkey_to_p2pkh_address;
use chain_btc::key::{self, PrivateKey, PublicKey};
use chain_btc::{BtcError, BtcNetwork};
use crypto_utils::random::random_secret;
use tracing::{debug, info};

use crate::error::WalletError;
use crate::store::{SecretStore, Slot};

/// Owns the wallet's single private key and its derived address.
///
/// The key is generated on first access and written to the store; every
/// later access reads it back. Writes are write-once, so two managers racing
/// on the same store converge on whichever key landed first.
#[derive(Debug)]
pub struct KeyManager<S> {
    store: S,
    network: BtcNetwork,
}

impl<S: SecretStore> KeyManager<S> {
    pub fn new(store: S, network: BtcNetwork) -> Self {
        Self { store, network }
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the private key, generating and persisting one if none exists.
    pub fn get_private_key(&self) -> Result<PrivateKey, WalletError> {
        if let Some(hex_key) = self.store.read(Slot::PrivateKey)? {
            return Ok(PrivateKey::from_hex(&hex_key)?);
        }

        let fresh = PrivateKey::from_secret(random_secret::<32>())?;
        if self.store.write_once(Slot::PrivateKey, &fresh.to_hex())? {
            info!(network = %self.network, "generated new wallet key");
            return Ok(fresh);
        }

        // Lost the race with another writer; adopt its key.
        debug!("private key slot filled concurrently, re-reading");
        let hex_key = self
            .store
            .read(Slot::PrivateKey)?
            .ok_or_else(|| WalletError::Store("private key slot empty after write".into()))?;
        Ok(PrivateKey::from_hex(&hex_key)?)
    }

    pub fn derive_public_key(&self) -> Result<PublicKey, WalletError> {
        let private_key = self.get_private_key()?;
        Ok(key::derive_public_key(&private_key)?)
    }

    /// The wallet address. Read from the store when present, otherwise
    /// derived from the key and persisted.
    pub fn address(&self) -> Result<String, WalletError> {
        if let Some(stored) = self.store.read(Slot::Address)? {
            return Ok(stored.to_string());
        }

        let derived = self.derived_address()?;
        if !self.store.write_once(Slot::Address, &derived)? {
            if let Some(stored) = self.store.read(Slot::Address)? {
                return Ok(stored.to_string());
            }
        }
        info!(address = %derived, "persisted wallet address");
        Ok(derived)
    }

    /// Check that the stored address (if any) is the one the key derives.
    pub fn verify_address(&self) -> Result<String, WalletError> {
        let derived = self.derived_address()?;
        match self.store.read(Slot::Address)? {
            Some(stored) if *stored != *derived => Err(BtcError::AddressMismatch {
                expected: derived,
                found: stored.to_string(),
            }
            .into()),
            Some(_) => Ok(derived),
            None => self.address(),
        }
    }

    fn derived_address(&self) -> Result<String, WalletError> {
        let public_key = self.derive_public_key()?;
        Ok(pubkey_to_p2pkh_address(&public_key, self.network)?)
    }
}
