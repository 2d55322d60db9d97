//! secp256k1 key material for the wallet's single P2PKH address.

use crypto_utils::{SecretBytes, ZeroizingString};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::BtcError;

/// Length of a compressed SEC1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// A validated secp256k1 private scalar (0 < k < n).
///
/// The bytes are wiped on drop and never appear in `Debug` output.
#[derive(Clone, Debug)]
pub struct PrivateKey(SecretBytes<32>);

impl PrivateKey {
    /// Wrap raw scalar bytes, rejecting zero and values at or above the curve order.
    pub fn from_secret(bytes: SecretBytes<32>) -> Result<Self, BtcError> {
        k256::SecretKey::from_slice(bytes.as_bytes())
            .map_err(|_| BtcError::InvalidKey("scalar must be in [1, n-1]".into()))?;
        Ok(Self(bytes))
    }

    /// Parse a 64-character hex scalar, the at-rest encoding of the key.
    pub fn from_hex(hex_str: &str) -> Result<Self, BtcError> {
        let bytes = SecretBytes::<32>::from_hex(hex_str)
            .ok_or_else(|| BtcError::InvalidKey("expected 32 hex-encoded bytes".into()))?;
        Self::from_secret(bytes)
    }

    pub fn to_hex(&self) -> ZeroizingString {
        self.0.to_hex()
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Shorthand for [`derive_public_key`].
    pub fn public_key(&self) -> Result<PublicKey, BtcError> {
        derive_public_key(self)
    }
}

/// A compressed secp256k1 public key: parity prefix followed by the
/// big-endian x-coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; COMPRESSED_PUBKEY_LEN]);

impl PublicKey {
    /// Parse and validate a compressed SEC1 encoding.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BtcError> {
        let arr: [u8; COMPRESSED_PUBKEY_LEN] = bytes.try_into().map_err(|_| {
            BtcError::InvalidKey(format!("expected 33-byte key, got {}", bytes.len()))
        })?;
        if arr[0] != 0x02 && arr[0] != 0x03 {
            return Err(BtcError::InvalidKey("compressed key must start with 0x02 or 0x03".into()));
        }
        k256::PublicKey::from_sec1_bytes(&arr)
            .map_err(|_| BtcError::InvalidKey("point is not on the curve".into()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBKEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert to the `bitcoin` crate's key type for script construction.
    pub fn to_bitcoin(&self) -> Result<bitcoin::PublicKey, BtcError> {
        bitcoin::PublicKey::from_slice(&self.0)
            .map_err(|e| BtcError::InvalidKey(format!("failed to parse public key: {e}")))
    }
}

/// Multiply the curve generator by the private scalar and compress the point.
///
/// The prefix is `0x02` when y is even and `0x03` when y is odd.
pub fn derive_public_key(private_key: &PrivateKey) -> Result<PublicKey, BtcError> {
    let secret = k256::SecretKey::from_slice(private_key.secret_bytes())
        .map_err(|_| BtcError::InvalidKey("scalar must be in [1, n-1]".into()))?;

    let point = secret.public_key().to_encoded_point(false);
    let (x, y) = match (point.x(), point.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(BtcError::InvalidKey("derived point at infinity".into())),
    };

    let mut compressed = [0u8; COMPRESSED_PUBKEY_LEN];
    compressed[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
    compressed[1..].copy_from_slice(x);
    Ok(PublicKey(compressed))
}
