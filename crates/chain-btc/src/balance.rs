use serde::Serialize;

use crate::amount::sats_to_btc;
use crate::utxo::Utxo;

/// An amount in both integer satoshis and fractional BTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Balance {
    pub sats: u64,
    pub btc: f64,
}

impl Balance {
    pub fn from_sats(sats: u64) -> Self {
        Self {
            sats,
            btc: sats_to_btc(sats),
        }
    }
}

/// Confirmed, unconfirmed and total balance of a UTXO set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub confirmed: Balance,
    pub unconfirmed: Balance,
    pub total: Balance,
}

/// Aggregate a UTXO set by confirmation status. An empty set is all zeros.
pub fn summarize(utxos: &[Utxo]) -> BalanceSummary {
    let (confirmed, unconfirmed) = utxos.iter().fold((0u64, 0u64), |(c, u), utxo| {
        if utxo.confirmed {
            (c.saturating_add(utxo.amount_sat), u)
        } else {
            (c, u.saturating_add(utxo.amount_sat))
        }
    });

    BalanceSummary {
        confirmed: Balance::from_sats(confirmed),
        unconfirmed: Balance::from_sats(unconfirmed),
        total: Balance::from_sats(confirmed.saturating_add(unconfirmed)),
    }
}
