//! Conversion between integer satoshis and fractional BTC at the
//! presentation boundary. Everything inside the engine is satoshis.

use crate::error::BtcError;

/// Satoshis per BTC.
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Upper bound on any amount (21 million BTC).
pub const MAX_MONEY_SATS: u64 = 21_000_000 * SATS_PER_BTC;

/// Parse a decimal BTC string into satoshis.
///
/// Digits beyond the eighth decimal place are truncated, never rounded up.
/// Rejects signs, exponents, empty input and values above [`MAX_MONEY_SATS`].
pub fn parse_btc(input: &str) -> Result<u64, BtcError> {
    let s = input.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(BtcError::InvalidAmount(format!("not a number: {input:?}")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BtcError::InvalidAmount(format!("not a number: {input:?}")));
    }

    let whole_sats = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(SATS_PER_BTC))
            .ok_or_else(|| BtcError::InvalidAmount(format!("amount too large: {input}")))?
    };

    let frac_digits: String = frac.chars().take(8).collect();
    let frac_sats = if frac_digits.is_empty() {
        0
    } else {
        let padded = format!("{frac_digits:0<8}");
        padded
            .parse::<u64>()
            .map_err(|e| BtcError::InvalidAmount(format!("bad fraction: {e}")))?
    };

    let total = whole_sats
        .checked_add(frac_sats)
        .filter(|t| *t <= MAX_MONEY_SATS)
        .ok_or_else(|| BtcError::InvalidAmount(format!("amount too large: {input}")))?;
    Ok(total)
}

/// Exact division of satoshis into BTC for display.
pub fn sats_to_btc(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}

/// Render satoshis as a fixed eight-decimal BTC string, e.g. `0.00050000`.
pub fn format_btc(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fraction() {
        assert_eq!(parse_btc("1").unwrap(), 100_000_000);
        assert_eq!(parse_btc("0.0005").unwrap(), 50_000);
        assert_eq!(parse_btc("1.5").unwrap(), 150_000_000);
        assert_eq!(parse_btc(".00000546").unwrap(), 546);
        assert_eq!(parse_btc("2.").unwrap(), 200_000_000);
    }

    #[test]
    fn parse_truncates_extra_precision() {
        assert_eq!(parse_btc("0.000005469").unwrap(), 546);
        assert_eq!(parse_btc("0.123456789999").unwrap(), 12_345_678);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_btc("  0.001\n").unwrap(), 100_000);
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "abc", "-1", "+1", "1e-3", "0.1.2", "1,5"] {
            assert!(parse_btc(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_above_max_money() {
        assert!(parse_btc("21000000").is_ok());
        assert!(parse_btc("21000000.00000001").is_err());
        assert!(parse_btc("99999999999999999999").is_err());
    }

    #[test]
    fn sats_to_btc_divides_exactly() {
        assert_eq!(sats_to_btc(0), 0.0);
        assert_eq!(sats_to_btc(100_000_000), 1.0);
        assert_eq!(sats_to_btc(50_000), 0.0005);
    }

    #[test]
    fn format_has_eight_decimals() {
        assert_eq!(format_btc(0), "0.00000000");
        assert_eq!(format_btc(546), "0.00000546");
        assert_eq!(format_btc(123_456_789), "1.23456789");
    }
}
