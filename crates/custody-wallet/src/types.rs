use std::fmt;

use chain_btc::fee::DUST_LIMIT_SATS;
use chain_btc::BtcError;
use serde::Serialize;

use crate::error::WalletError;

/// User-facing failure code of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRecipientAddress,
    Dust,
    InsufficientFunds,
    UtxosEmpty,
    WaitingConfirmations,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRecipientAddress => "invalid_recipient_address",
            ErrorCode::Dust => "dust",
            ErrorCode::InsufficientFunds => "insufficient_funds",
            ErrorCode::UtxosEmpty => "utxos_empty",
            ErrorCode::WaitingConfirmations => "waiting_confirmations",
            ErrorCode::UnknownError => "unknown_error",
        }
    }

    /// Message shown to the user for this code.
    pub fn message(&self) -> String {
        match self {
            ErrorCode::InvalidRecipientAddress => {
                "The recipient address is in incorrect format".into()
            }
            ErrorCode::Dust => format!(
                "The amount has to be greater than {} BTC",
                chain_btc::amount::format_btc(DUST_LIMIT_SATS)
            ),
            ErrorCode::InsufficientFunds | ErrorCode::UtxosEmpty => {
                "Insufficient funds on the wallet balance".into()
            }
            ErrorCode::WaitingConfirmations => {
                "Please wait for previous transactions to be confirmed".into()
            }
            ErrorCode::UnknownError => "An unexpected error occurred".into(),
        }
    }

    /// Classify a pipeline error. Anything not anticipated is `UnknownError`.
    pub fn from_error(err: &WalletError) -> Self {
        match err {
            WalletError::Btc(btc) => match btc {
                BtcError::InvalidRecipientAddress(_) => ErrorCode::InvalidRecipientAddress,
                BtcError::InvalidAmount(_) => ErrorCode::Dust,
                BtcError::InsufficientFunds { .. } | BtcError::NegativeChange { .. } => {
                    ErrorCode::InsufficientFunds
                }
                BtcError::AwaitingConfirmation { .. } => ErrorCode::WaitingConfirmations,
                BtcError::InvalidKey(_)
                | BtcError::InvalidHashLength(_)
                | BtcError::AddressMismatch { .. }
                | BtcError::InvalidTxid(_)
                | BtcError::SigningError(_) => ErrorCode::UnknownError,
            },
            WalletError::DustAmount(_) => ErrorCode::Dust,
            WalletError::UtxosEmpty(_) => ErrorCode::UtxosEmpty,
            WalletError::Store(_)
            | WalletError::Source(_)
            | WalletError::Broadcast(_)
            | WalletError::Config(_)
            | WalletError::Watcher(_)
            | WalletError::Io(_)
            | WalletError::Json(_) => ErrorCode::UnknownError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged result of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent { txid: String },
    Failed { error_code: ErrorCode },
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }

    pub fn txid(&self) -> Option<&str> {
        match self {
            SendOutcome::Sent { txid } => Some(txid),
            SendOutcome::Failed { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            SendOutcome::Sent { .. } => None,
            SendOutcome::Failed { error_code } => Some(*error_code),
        }
    }
}
