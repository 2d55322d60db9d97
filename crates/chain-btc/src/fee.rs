//! Size-based fee estimation for legacy P2PKH transactions.

/// Outputs assumed when sizing a transaction: recipient + possible change.
pub const OUTPUTS_COUNT: usize = 2;

/// Estimated size of a signed P2PKH input in bytes.
/// outpoint (36) + scriptSig (~107) + sequence (4) + length prefix.
pub const INPUT_SIZE: u64 = 148;

/// Size of a P2PKH output in bytes: value (8) + script length (1) + script (25).
pub const OUTPUT_SIZE: u64 = 34;

/// Fixed transaction overhead in bytes: version + locktime + counts.
pub const BASE_SIZE: u64 = 10;

/// Network minimum relay fee in satoshis.
pub const MIN_RELAY_FEE: u64 = 546;

/// Payment amounts at or below this many satoshis are rejected as dust.
pub const DUST_LIMIT_SATS: u64 = 546;

/// Default fee rate in satoshis per byte.
pub const DEFAULT_FEE_RATE: f64 = 1.0;

/// Estimated serialized size of a transaction with `num_inputs` inputs and
/// `num_outputs` outputs.
pub fn transaction_size(num_inputs: usize, num_outputs: usize) -> u64 {
    num_inputs as u64 * INPUT_SIZE + num_outputs as u64 * OUTPUT_SIZE + BASE_SIZE
}

/// Estimate the fee for spending `num_inputs` inputs into two outputs.
///
/// `fee = ceil(size * fee_rate)`, never below [`MIN_RELAY_FEE`]. A negative
/// or NaN rate is treated as zero, so the floor applies.
pub fn estimate_fee(num_inputs: usize, fee_rate_sat_per_byte: f64) -> u64 {
    let size = transaction_size(num_inputs, OUTPUTS_COUNT);
    let rate = if fee_rate_sat_per_byte.is_finite() {
        fee_rate_sat_per_byte.max(0.0)
    } else {
        0.0
    };
    let fee = (size as f64 * rate).ceil() as u64;
    fee.max(MIN_RELAY_FEE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_one_input_two_outputs() {
        // 148 + 68 + 10
        assert_eq!(transaction_size(1, 2), 226);
    }

    #[test]
    fn one_input_hits_floor() {
        assert_eq!(estimate_fee(1, 1.0), MIN_RELAY_FEE);
    }

    #[test]
    fn four_inputs_above_floor() {
        // 4 * 148 + 2 * 34 + 10 = 670
        assert_eq!(estimate_fee(4, 1.0), 670);
    }

    #[test]
    fn three_inputs_at_one_sat_per_byte() {
        // 3 * 148 + 78 = 522, below the floor.
        assert_eq!(estimate_fee(3, 1.0), MIN_RELAY_FEE);
    }

    #[test]
    fn fractional_rate_rounds_up() {
        // 226 * 2.5 = 565
        assert_eq!(estimate_fee(1, 2.5), 565);
        // 226 * 2.501 = 565.226 -> 566
        assert_eq!(estimate_fee(1, 2.501), 566);
    }

    #[test]
    fn monotonic_in_input_count_and_floored() {
        for rate in [0.0, 0.5, 1.0, 3.3, 20.0] {
            let mut previous = 0;
            for inputs in 0..50 {
                let fee = estimate_fee(inputs, rate);
                assert!(fee >= previous, "fee dropped at {inputs} inputs, rate {rate}");
                assert!(fee >= MIN_RELAY_FEE);
                previous = fee;
            }
        }
    }

    #[test]
    fn zero_and_invalid_rates_use_floor() {
        assert_eq!(estimate_fee(10, 0.0), MIN_RELAY_FEE);
        assert_eq!(estimate_fee(10, -5.0), MIN_RELAY_FEE);
        assert_eq!(estimate_fee(10, f64::NAN), MIN_RELAY_FEE);
    }

    #[test]
    fn high_rate_scales_with_inputs() {
        let fee_1 = estimate_fee(1, 10.0);
        let fee_2 = estimate_fee(2, 10.0);
        assert_eq!(fee_2 - fee_1, INPUT_SIZE * 10);
    }
}
