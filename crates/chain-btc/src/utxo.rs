use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BtcError;
use crate::fee::{estimate_fee, DEFAULT_FEE_RATE};

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction ID as a hex string (big-endian / display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// Whether the creating transaction is in a block.
    pub confirmed: bool,
    /// Address the output pays to. Set by the selector on the coins it
    /// picks; the builder signs against this address's script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Utxo {
    pub fn new(txid: impl Into<String>, vout: u32, amount_sat: u64, confirmed: bool) -> Self {
        Self {
            txid: txid.into(),
            vout,
            amount_sat,
            confirmed,
            address: None,
        }
    }

    /// The `(txid, vout)` pair identifying this output.
    pub fn outpoint(&self) -> (&str, u32) {
        (&self.txid, self.vout)
    }
}

/// Result of UTXO selection: the chosen UTXOs and the fee implied by them.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinSelection {
    /// The selected UTXOs, largest first, each stamped with the wallet address.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs in satoshis.
    pub total_sat: u64,
    /// Fee for spending `selected` into two outputs.
    pub fee_sat: u64,
}

impl CoinSelection {
    /// Value left over after paying `amount_sat` and the fee.
    pub fn change_sat(&self, amount_sat: u64) -> Option<u64> {
        self.total_sat.checked_sub(amount_sat)?.checked_sub(self.fee_sat)
    }
}

/// Greedy largest-first selector with a confirmed-only first tier.
///
/// Tier A accumulates confirmed coins only and is the sole path that yields
/// a spendable selection. Tier B runs over all coins purely to classify a
/// Tier A failure: if it would succeed the funds exist but are unconfirmed
/// (`AwaitingConfirmation`), otherwise `InsufficientFunds`.
///
/// A successful selection is cached; later calls return it unchanged.
#[derive(Debug, Clone)]
pub struct CoinSelector {
    target_sat: u64,
    utxos: Vec<Utxo>,
    wallet_address: String,
    fee_rate_sat_per_byte: f64,
    selection: Option<CoinSelection>,
}

impl CoinSelector {
    /// Create a selector for `target_sat` over a snapshot of `utxos`.
    ///
    /// `wallet_address` is the address the UTXOs were fetched for; it is
    /// stamped onto every selected coin.
    pub fn new(target_sat: u64, mut utxos: Vec<Utxo>, wallet_address: impl Into<String>) -> Self {
        // Stable sort: equal values keep their source order.
        utxos.sort_by(|a, b| b.amount_sat.cmp(&a.amount_sat));
        Self {
            target_sat,
            utxos,
            wallet_address: wallet_address.into(),
            fee_rate_sat_per_byte: DEFAULT_FEE_RATE,
            selection: None,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate_sat_per_byte: f64) -> Self {
        self.fee_rate_sat_per_byte = fee_rate_sat_per_byte;
        self.selection = None;
        self
    }

    pub fn target_sat(&self) -> u64 {
        self.target_sat
    }

    /// Run (or return the cached result of) the two-tier selection.
    pub fn select(&mut self) -> Result<&CoinSelection, BtcError> {
        let selection = match self.selection.take() {
            Some(cached) => cached,
            None => self.compute()?,
        };
        Ok(self.selection.insert(selection))
    }

    fn compute(&self) -> Result<CoinSelection, BtcError> {
        let confirmed: Vec<&Utxo> = self.utxos.iter().filter(|u| u.confirmed).collect();

        let tier_a = accumulate(&confirmed, self.target_sat, self.fee_rate_sat_per_byte);
        if let Some(mut selection) = tier_a {
            for utxo in &mut selection.selected {
                utxo.address = Some(self.wallet_address.clone());
            }
            info!(
                target_sat = self.target_sat,
                inputs = selection.selected.len(),
                total_sat = selection.total_sat,
                fee_sat = selection.fee_sat,
                "selected confirmed coins"
            );
            return Ok(selection);
        }

        let confirmed_total = sum_values(confirmed.iter().copied());
        let all: Vec<&Utxo> = self.utxos.iter().collect();

        match accumulate(&all, self.target_sat, self.fee_rate_sat_per_byte) {
            Some(probe) => {
                debug!(
                    target_sat = self.target_sat,
                    confirmed_total,
                    probe_fee_sat = probe.fee_sat,
                    "enough funds only with unconfirmed coins"
                );
                Err(BtcError::AwaitingConfirmation {
                    confirmed: confirmed_total,
                    required: self.target_sat.saturating_add(probe.fee_sat),
                })
            }
            None => {
                let available = sum_values(all.iter().copied());
                let required = self
                    .target_sat
                    .saturating_add(estimate_fee(all.len().max(1), self.fee_rate_sat_per_byte));
                debug!(target_sat = self.target_sat, available, "insufficient funds");
                Err(BtcError::InsufficientFunds {
                    available,
                    required,
                })
            }
        }
    }
}

/// Select UTXOs to cover `target_sat` plus the fee, stamping `wallet_address`
/// on the result. One-shot form of [`CoinSelector`].
pub fn select_utxos(
    utxos: &[Utxo],
    target_sat: u64,
    wallet_address: &str,
    fee_rate_sat_per_byte: f64,
) -> Result<CoinSelection, BtcError> {
    let mut selector = CoinSelector::new(target_sat, utxos.to_vec(), wallet_address)
        .with_fee_rate(fee_rate_sat_per_byte);
    selector.select().cloned()
}

/// Add coins from `pool` (already sorted largest first) until the running
/// total covers `target_sat` plus the fee for the current input count.
fn accumulate(pool: &[&Utxo], target_sat: u64, fee_rate: f64) -> Option<CoinSelection> {
    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_sat: u64 = 0;

    for utxo in pool {
        selected.push((*utxo).clone());
        total_sat = total_sat.saturating_add(utxo.amount_sat);

        let fee_sat = estimate_fee(selected.len(), fee_rate);
        if total_sat >= target_sat.saturating_add(fee_sat) {
            return Some(CoinSelection {
                selected,
                total_sat,
                fee_sat,
            });
        }
    }

    None
}

fn sum_values<'a>(utxos: impl Iterator<Item = &'a Utxo>) -> u64 {
    utxos.fold(0u64, |acc, u| acc.saturating_add(u.amount_sat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::MIN_RELAY_FEE;

    const WALLET: &str = "mhkhVMBr2tz2U8AzVCauq9D61jt4pzKmw2";

    fn make_utxo(txid: &str, vout: u32, amount_sat: u64, confirmed: bool) -> Utxo {
        Utxo::new(txid, vout, amount_sat, confirmed)
    }

    #[test]
    fn selects_single_large_utxo_with_floor_fee() {
        let utxos = vec![
            make_utxo("abc1", 0, 100_000, true),
            make_utxo("abc2", 1, 20_000, true),
        ];
        let selection = select_utxos(&utxos, 50_000, WALLET, 1.0).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.total_sat, 100_000);
        assert_eq!(selection.fee_sat, MIN_RELAY_FEE);
    }

    #[test]
    fn computed_fee_above_floor_with_many_inputs() {
        let utxos = vec![
            make_utxo("abc1", 0, 100_000, true),
            make_utxo("abc2", 1, 20_000, true),
            make_utxo("abc3", 2, 40_000, true),
            make_utxo("abc4", 3, 10_000, true),
        ];
        let selection = select_utxos(&utxos, 168_000, WALLET, 1.0).unwrap();
        assert_eq!(selection.selected.len(), 4);
        // 4 * 148 + 2 * 34 + 10
        assert_eq!(selection.fee_sat, 670);
    }

    #[test]
    fn selected_coins_are_stamped_with_wallet_address() {
        let utxos = vec![
            make_utxo("a", 0, 30_000, true),
            make_utxo("b", 0, 30_000, true),
        ];
        let selection = select_utxos(&utxos, 50_000, WALLET, 1.0).unwrap();
        assert!(selection
            .selected
            .iter()
            .all(|u| u.address.as_deref() == Some(WALLET)));
    }

    #[test]
    fn largest_first_ordering() {
        let utxos = vec![
            make_utxo("small", 0, 1_000, true),
            make_utxo("large", 0, 100_000, true),
            make_utxo("medium", 0, 50_000, true),
        ];
        let selection = select_utxos(&utxos, 10_000, WALLET, 1.0).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].txid, "large");
    }

    #[test]
    fn unconfirmed_only_shortfall_awaits_confirmation() {
        let utxos = vec![
            make_utxo("abc3", 0, 20_000, true),
            make_utxo("abc4", 1, 40_000, false),
        ];
        let result = select_utxos(&utxos, 50_000, WALLET, 1.0);
        assert!(matches!(
            result,
            Err(BtcError::AwaitingConfirmation { confirmed: 20_000, .. })
        ));
    }

    #[test]
    fn large_unconfirmed_coin_is_never_spent() {
        let utxos = vec![
            make_utxo("big", 0, 1_000_000, false),
            make_utxo("small", 0, 10_000, true),
        ];
        let result = select_utxos(&utxos, 50_000, WALLET, 1.0);
        assert!(matches!(result, Err(BtcError::AwaitingConfirmation { .. })));
    }

    #[test]
    fn confirmed_subset_used_even_when_larger_unconfirmed_exists() {
        let utxos = vec![
            make_utxo("big-unconfirmed", 0, 1_000_000, false),
            make_utxo("confirmed", 0, 80_000, true),
        ];
        let selection = select_utxos(&utxos, 50_000, WALLET, 1.0).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].txid, "confirmed");
    }

    #[test]
    fn not_enough_even_with_unconfirmed() {
        let utxos = vec![make_utxo("abc5", 0, 10_000, false)];
        let result = select_utxos(&utxos, 50_000, WALLET, 1.0);
        match result {
            Err(BtcError::InsufficientFunds { available, required }) => {
                assert_eq!(available, 10_000);
                assert!(required > 50_000);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn empty_utxos_is_insufficient() {
        let result = select_utxos(&[], 1_000, WALLET, 1.0);
        assert!(matches!(result, Err(BtcError::InsufficientFunds { available: 0, .. })));
    }

    #[test]
    fn exact_cover_succeeds() {
        let utxos = vec![make_utxo("x", 0, 50_000 + MIN_RELAY_FEE, true)];
        let selection = select_utxos(&utxos, 50_000, WALLET, 1.0).unwrap();
        assert_eq!(selection.change_sat(50_000), Some(0));
    }

    #[test]
    fn one_sat_short_fails() {
        let utxos = vec![make_utxo("x", 0, 50_000 + MIN_RELAY_FEE - 1, true)];
        assert!(select_utxos(&utxos, 50_000, WALLET, 1.0).is_err());
    }

    #[test]
    fn selection_is_locally_tight() {
        let values = [7_000u64, 3_000, 12_000, 900, 45_000, 8_800, 21_000, 600];
        let utxos: Vec<Utxo> = values
            .iter()
            .enumerate()
            .map(|(i, v)| make_utxo(&format!("tx{i}"), i as u32, *v, true))
            .collect();

        for target in (1_000..95_000).step_by(3_517) {
            let Ok(selection) = select_utxos(&utxos, target, WALLET, 1.0) else {
                continue;
            };
            assert!(selection.total_sat >= target + selection.fee_sat);

            let last = selection.selected.last().unwrap().amount_sat;
            assert!(
                selection.total_sat - last < target + selection.fee_sat,
                "dropping the last coin still covers target {target}"
            );
        }
    }

    #[test]
    fn selector_memoizes_result() {
        let mut selector = CoinSelector::new(
            50_000,
            vec![make_utxo("abc6", 0, 100_000, true)],
            WALLET,
        );
        let first = selector.select().unwrap().clone();
        let second = selector.select().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn fee_rate_affects_selection() {
        let utxos = vec![
            make_utxo("aaaa", 0, 50_000, true),
            make_utxo("bbbb", 0, 50_000, true),
        ];
        let low = select_utxos(&utxos, 40_000, WALLET, 1.0).unwrap();
        let high = select_utxos(&utxos, 40_000, WALLET, 50.0).unwrap();
        assert_eq!(low.selected.len(), 1);
        assert_eq!(high.selected.len(), 2);
        assert!(high.fee_sat > low.fee_sat);
    }

    #[test]
    fn utxo_deserializes_without_address() {
        let json = r#"{"txid":"ab","vout":1,"amount_sat":5,"confirmed":false}"#;
        let utxo: Utxo = serde_json::from_str(json).unwrap();
        assert_eq!(utxo, Utxo::new("ab", 1, 5, false));
        assert_eq!(utxo.outpoint(), ("ab", 1));
    }
}
