use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::PubkeyHash;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::BtcError;
use crate::key::PublicKey;
use crate::network::BtcNetwork;

/// Length of a hash160 digest.
pub const PUBKEY_HASH_LEN: usize = 20;

/// Decoded base58check address length: version (1) + hash (20) + checksum (4).
const DECODED_ADDRESS_LEN: usize = 25;

/// Script templates accepted as payment destinations.
///
/// This is a closed set: an address that decodes to anything else is not a
/// valid recipient, even if it is well-formed base58check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPattern {
    /// Pay-to-public-key-hash.
    P2pkh,
}

/// A decoded address: which template it encodes and the 20-byte hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub pattern: AddressPattern,
    pub version: u8,
    pub hash: [u8; PUBKEY_HASH_LEN],
}

impl DecodedAddress {
    /// The locking script (scriptPubKey) paying to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self.pattern {
            AddressPattern::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(self.hash)),
        }
    }
}

/// Hash160 of a compressed public key: RIPEMD-160(SHA-256(pubkey)).
pub fn hash_public_key(pubkey: &PublicKey) -> Result<[u8; PUBKEY_HASH_LEN], BtcError> {
    let sha256_hash = Sha256::digest(pubkey.as_bytes());
    let digest = Ripemd160::digest(sha256_hash);
    digest
        .as_slice()
        .try_into()
        .map_err(|_| BtcError::InvalidHashLength(digest.len()))
}

/// Base58check-encode a pubkey hash as a P2PKH address for `network`.
///
/// Steps:
/// 1. Prepend the 1-byte network version
/// 2. Append the first 4 bytes of SHA-256d over the versioned payload
/// 3. Base58-encode the 25-byte result
pub fn encode_address(pubkey_hash: &[u8; PUBKEY_HASH_LEN], network: BtcNetwork) -> String {
    let mut payload = Vec::with_capacity(DECODED_ADDRESS_LEN);
    payload.push(network.p2pkh_version());
    payload.extend_from_slice(pubkey_hash);

    let checksum = double_sha256_checksum(&payload);
    payload.extend_from_slice(&checksum);

    bs58::encode(&payload).into_string()
}

/// Derive the P2PKH address bound to a compressed public key.
pub fn pubkey_to_p2pkh_address(
    pubkey: &PublicKey,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let hash = hash_public_key(pubkey)?;
    Ok(encode_address(&hash, network))
}

/// Decode a base58check address and classify it for `network`.
///
/// Fails with `InvalidRecipientAddress` on bad base58, wrong length, bad
/// checksum, or a version byte outside the accepted patterns.
pub fn decode_address(address: &str, network: BtcNetwork) -> Result<DecodedAddress, BtcError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| BtcError::InvalidRecipientAddress(format!("invalid base58: {e}")))?;

    if decoded.len() != DECODED_ADDRESS_LEN {
        return Err(BtcError::InvalidRecipientAddress(format!(
            "expected {DECODED_ADDRESS_LEN} bytes, got {}",
            decoded.len()
        )));
    }

    let payload = &decoded[..21];
    let checksum = &decoded[21..];
    if checksum != double_sha256_checksum(payload) {
        return Err(BtcError::InvalidRecipientAddress("invalid checksum".into()));
    }

    let version = decoded[0];
    let pattern = if version == network.p2pkh_version() {
        AddressPattern::P2pkh
    } else {
        return Err(BtcError::InvalidRecipientAddress(format!(
            "version 0x{version:02x} is not a standard pattern on {network}"
        )));
    };

    let mut hash = [0u8; PUBKEY_HASH_LEN];
    hash.copy_from_slice(&decoded[1..21]);
    Ok(DecodedAddress {
        pattern,
        version,
        hash,
    })
}

/// Whether `address` is acceptable as a payment destination on `network`.
pub fn validate_address(address: &str, network: BtcNetwork) -> bool {
    decode_address(address, network).is_ok()
}

/// Locking script for a destination address.
pub fn script_for_address(address: &str, network: BtcNetwork) -> Result<ScriptBuf, BtcError> {
    Ok(decode_address(address, network)?.script_pubkey())
}

/// Double SHA-256 checksum (first 4 bytes).
fn double_sha256_checksum(data: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&second[..4]);
    checksum
}
