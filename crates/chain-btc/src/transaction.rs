use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::{PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use tracing::debug;

use crate::address::{pubkey_to_p2pkh_address, script_for_address};
use crate::error::BtcError;
use crate::key::{derive_public_key, PrivateKey};
use crate::network::BtcNetwork;
use crate::utxo::Utxo;

/// An unsigned legacy transaction ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedBtcTx {
    /// The transaction with empty unlocking scripts.
    pub tx: Transaction,
    /// Locking script of each spent output, in input order. Used as the
    /// script code when computing each input's sighash.
    pub prev_scripts: Vec<ScriptBuf>,
}

/// A fully signed transaction.
#[derive(Debug, Clone)]
pub struct SignedBtcTx {
    pub tx: Transaction,
}

impl SignedBtcTx {
    /// Canonical wire serialization.
    pub fn serialize(&self) -> Vec<u8> {
        bitcoin::consensus::serialize(&self.tx)
    }

    /// Hex of the wire serialization, as accepted by broadcast endpoints.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Transaction id in display (reversed) byte order.
    pub fn txid(&self) -> String {
        self.tx.compute_txid().to_string()
    }
}

/// Build an unsigned P2PKH transaction spending `selected`.
///
/// Every selected UTXO must carry `wallet_address` as its source address.
/// Change (inputs - amount - fee) goes back to `wallet_address` and is
/// omitted entirely when zero.
pub fn build_transaction(
    recipient: &str,
    amount_sat: u64,
    fee_sat: u64,
    selected: &[Utxo],
    wallet_address: &str,
    network: BtcNetwork,
) -> Result<UnsignedBtcTx, BtcError> {
    for utxo in selected {
        match utxo.address.as_deref() {
            Some(addr) if addr == wallet_address => {}
            other => {
                return Err(BtcError::AddressMismatch {
                    expected: wallet_address.to_string(),
                    found: other.unwrap_or("<unset>").to_string(),
                })
            }
        }
    }

    let wallet_script = script_for_address(wallet_address, network)?;

    let mut inputs = Vec::with_capacity(selected.len());
    let mut prev_scripts = Vec::with_capacity(selected.len());
    let mut inputs_total: u64 = 0;

    for utxo in selected {
        // Display-order hex; `Txid` stores the reversed wire bytes.
        let txid = Txid::from_str(&utxo.txid)
            .map_err(|e| BtcError::InvalidTxid(format!("{}: {e}", utxo.txid)))?;

        inputs.push(TxIn {
            previous_output: OutPoint::new(txid, utxo.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
        prev_scripts.push(wallet_script.clone());
        inputs_total = inputs_total.saturating_add(utxo.amount_sat);
    }

    let change_sat = inputs_total
        .checked_sub(amount_sat)
        .and_then(|rest| rest.checked_sub(fee_sat))
        .ok_or(BtcError::NegativeChange {
            inputs: inputs_total,
            amount: amount_sat,
            fee: fee_sat,
        })?;

    let recipient_script = script_for_address(recipient, network)?;
    let mut outputs = vec![TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: recipient_script,
    }];

    if change_sat > 0 {
        outputs.push(TxOut {
            value: Amount::from_sat(change_sat),
            script_pubkey: wallet_script,
        });
    }

    debug!(
        inputs = inputs.len(),
        outputs = outputs.len(),
        amount_sat,
        fee_sat,
        change_sat,
        "built unsigned transaction"
    );

    let tx = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    Ok(UnsignedBtcTx { tx, prev_scripts })
}

/// Sign every input of a legacy P2PKH transaction with `private_key`.
///
/// Each input is signed over its own SIGHASH_ALL digest and receives the
/// unlocking script `<DER signature || 0x01> <compressed pubkey>`.
pub fn sign_transaction(
    unsigned_tx: &UnsignedBtcTx,
    private_key: &PrivateKey,
) -> Result<SignedBtcTx, BtcError> {
    if unsigned_tx.prev_scripts.len() != unsigned_tx.tx.input.len() {
        return Err(BtcError::SigningError(format!(
            "{} prevout scripts for {} inputs",
            unsigned_tx.prev_scripts.len(),
            unsigned_tx.tx.input.len()
        )));
    }

    let secp = Secp256k1::signing_only();
    let secret_key = SecretKey::from_slice(private_key.secret_bytes())
        .map_err(|e| BtcError::InvalidKey(format!("invalid secret key: {e}")))?;
    let public_key = derive_public_key(private_key)?.to_bitcoin()?;
    let own_script = ScriptBuf::new_p2pkh(&public_key.pubkey_hash());

    let sighash_type = EcdsaSighashType::All;
    let cache = SighashCache::new(&unsigned_tx.tx);
    let mut script_sigs = Vec::with_capacity(unsigned_tx.prev_scripts.len());

    for (input_index, prev_script) in unsigned_tx.prev_scripts.iter().enumerate() {
        if *prev_script != own_script {
            return Err(BtcError::SigningError(format!(
                "input {input_index} is not locked to the signing key"
            )));
        }

        let sighash = cache
            .legacy_signature_hash(input_index, prev_script, sighash_type.to_u32())
            .map_err(|e| BtcError::SigningError(format!("sighash computation failed: {e}")))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_ecdsa(&msg, &secret_key);

        // DER signature followed by the sighash type byte.
        let mut sig_bytes = signature.serialize_der().to_vec();
        sig_bytes.push(sighash_type as u8);
        let sig_push = PushBytesBuf::try_from(sig_bytes)
            .map_err(|e| BtcError::SigningError(format!("signature push failed: {e}")))?;

        let script_sig = ScriptBuf::builder()
            .push_slice(sig_push)
            .push_key(&public_key)
            .into_script();
        script_sigs.push(script_sig);
    }

    let mut signed_tx = unsigned_tx.tx.clone();
    for (input, script_sig) in signed_tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(SignedBtcTx { tx: signed_tx })
}

/// Build, sign, and serialize a payment from the key's own address.
///
/// Fails with `AddressMismatch` if any selected UTXO is recorded against an
/// address other than the one derived from `private_key`, and with
/// `NegativeChange` if the inputs cannot cover amount plus fee.
pub fn build_and_sign(
    recipient: &str,
    amount_sat: u64,
    fee_sat: u64,
    selected: &[Utxo],
    private_key: &PrivateKey,
    network: BtcNetwork,
) -> Result<Vec<u8>, BtcError> {
    let wallet_address = pubkey_to_p2pkh_address(&derive_public_key(private_key)?, network)?;
    let unsigned =
        build_transaction(recipient, amount_sat, fee_sat, selected, &wallet_address, network)?;
    let signed = sign_transaction(&unsigned, private_key)?;
    Ok(signed.serialize())
}
