use std::fmt;
use std::ops::Deref;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A fixed-size secret byte array that is zeroed when dropped.
///
/// Holds raw key material (e.g. a 32-byte secp256k1 scalar). `Debug` never
/// prints the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes<const N: usize>([u8; N]);

impl<const N: usize> SecretBytes<N> {
    /// Wraps an existing array. The caller's copy is not zeroed.
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Decodes exactly `N` bytes from a hex string.
    ///
    /// Surrounding whitespace is ignored so values read back from a text
    /// file with a trailing newline still decode.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let mut decoded = hex::decode(hex_str.trim()).ok()?;
        if decoded.len() != N {
            decoded.zeroize();
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&decoded);
        decoded.zeroize();
        Some(Self(out))
    }

    /// Lower-case hex encoding, itself wrapped so it is wiped on drop.
    pub fn to_hex(&self) -> ZeroizingString {
        ZeroizingString::new(hex::encode(self.0))
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Deref for SecretBytes<N> {
    type Target = [u8; N];

    fn deref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Zeroize for SecretBytes<N> {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<const N: usize> ZeroizeOnDrop for SecretBytes<N> {}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(..)")
    }
}

/// A `String` wrapper that is zeroed when dropped.
///
/// Used for the hex-encoded private key while it travels between the store
/// and the key manager.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingString(String);

impl ZeroizingString {
    pub fn new(data: String) -> Self {
        Self(data)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for ZeroizingString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ZeroizingString {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<&str> for ZeroizingString {
    fn from(data: &str) -> Self {
        Self::new(data.to_owned())
    }
}

impl fmt::Debug for ZeroizingString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ZeroizingString(..)")
    }
}
