//! Write-once persistence for the wallet key and address.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crypto_utils::ZeroizingString;
use tracing::warn;

use crate::error::WalletError;

/// The two independent values a wallet persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Hex-encoded 32-byte private scalar.
    PrivateKey,
    /// Base58check address derived from the key.
    Address,
}

impl Slot {
    pub fn file_name(self) -> &'static str {
        match self {
            Slot::PrivateKey => "private-key.txt",
            Slot::Address => "address.txt",
        }
    }
}

/// Read-if-exists / write-once storage. The first value written to a slot
/// is permanent.
pub trait SecretStore {
    fn read(&self, slot: Slot) -> Result<Option<ZeroizingString>, WalletError>;

    /// Store `value` if the slot is empty. Returns `false`, leaving the
    /// existing value untouched, if the slot was already set.
    fn write_once(&self, slot: Slot, value: &str) -> Result<bool, WalletError>;
}

/// One text file per slot under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }
}

impl SecretStore for FileStore {
    fn read(&self, slot: Slot) -> Result<Option<ZeroizingString>, WalletError> {
        match fs::read_to_string(self.path(slot)) {
            Ok(contents) => {
                let contents = ZeroizingString::new(contents);
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(ZeroizingString::from(trimmed)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_once(&self, slot: Slot, value: &str) -> Result<bool, WalletError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path(slot);

        // A blank file holds no value (see `read`), so it must not block the write.
        if self.read(slot)?.is_none() {
            match fs::remove_file(&target) {
                Ok(()) => warn!(file = %target.display(), "discarding blank slot file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let staging = self.dir.join(format!(".{}.tmp-{}", slot.file_name(), std::process::id()));
        let published = write_staged(&staging, value).and_then(|()| {
            match fs::hard_link(&staging, &target) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e),
            }
        });
        let _ = fs::remove_file(&staging);
        Ok(published?)
    }
}

/// Write `value` to a fresh staging file and flush it to disk.
fn write_staged(path: &Path, value: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

/// In-process store, for tests and ephemeral wallets.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<Slot, ZeroizingString>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the private key slot already filled.
    pub fn with_private_key(hex_key: &str) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(Slot::PrivateKey, ZeroizingString::from(hex_key));
        }
        store
    }
}

impl SecretStore for MemoryStore {
    fn read(&self, slot: Slot) -> Result<Option<ZeroizingString>, WalletError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| WalletError::Store("memory store lock poisoned".into()))?;
        Ok(slots.get(&slot).cloned())
    }

    fn write_once(&self, slot: Slot, value: &str) -> Result<bool, WalletError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| WalletError::Store("memory store lock poisoned".into()))?;
        if slots.contains_key(&slot) {
            return Ok(false);
        }
        slots.insert(slot, ZeroizingString::from(value));
        Ok(true)
    }
}

impl<T: SecretStore + ?Sized> SecretStore for &T {
    fn read(&self, slot: Slot) -> Result<Option<ZeroizingString>, WalletError> {
        (**self).read(slot)
    }

    fn write_once(&self, slot: Slot, value: &str) -> Result<bool, WalletError> {
        (**self).write_once(slot, value)
    }
}
