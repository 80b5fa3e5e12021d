//! Decimal string <-> base unit conversion and gas margin math

use ethereum_types::U256;

use crate::typed_errors::UnitsError;

/// Decimals used by every LP token handled by the migrator
pub const DEFAULT_DECIMALS: u32 = 18;

/// Basis point denominator for the gas margin
const BPS_DENOMINATOR: u64 = 10_000;

/// Largest power of ten representable in a `U256`
const MAX_DECIMALS: u32 = 77;

/// Parses a human readable amount (`"12.5"`) into base units at `decimals`.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<U256, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::InvalidFormat(trimmed.to_string()));
    }

    if frac_part.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            amount: trimmed.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(trimmed.to_string());

    let whole = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part).map_err(|_| overflow())?
    };

    let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
    let fraction = if padded.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&padded).map_err(|_| overflow())?
    };

    whole
        .checked_mul(U256::exp10(decimals as usize))
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Formats base units back into a canonical decimal string.
///
/// Trailing fractional zeros are dropped, so `12500000000000000000` at 18
/// decimals renders as `"12.5"`.
pub fn from_base_units(value: U256, decimals: u32) -> Result<String, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }

    let unit = U256::exp10(decimals as usize);
    let whole = value / unit;
    let fraction = value % unit;

    if fraction.is_zero() {
        return Ok(whole.to_string());
    }

    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    Ok(format!("{}.{}", whole, digits.trim_end_matches('0')))
}

/// Adds `margin_bps` basis points on top of a gas estimate.
///
/// Saturates at `U256::MAX` instead of overflowing.
pub fn calculate_gas_margin(estimate: U256, margin_bps: u64) -> U256 {
    let multiplier = U256::from(BPS_DENOMINATOR).saturating_add(U256::from(margin_bps));
    estimate.saturating_mul(multiplier) / U256::from(BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base_units() {
        assert_eq!(
            to_base_units("12.5", 18).unwrap(),
            U256::from_dec_str("12500000000000000000").unwrap()
        );
        assert_eq!(
            to_base_units("10", 18).unwrap(),
            U256::from(10u64) * U256::exp10(18)
        );
        assert_eq!(to_base_units("0.000000000000000001", 18).unwrap(), U256::one());
        assert_eq!(to_base_units(".5", 1).unwrap(), U256::from(5u64));
        assert_eq!(to_base_units("3.", 2).unwrap(), U256::from(300u64));
    }

    #[test]
    fn test_to_base_units_rejects_bad_input() {
        assert_eq!(to_base_units("", 18), Err(UnitsError::Empty));
        assert!(matches!(to_base_units("-1", 18), Err(UnitsError::InvalidFormat(_))));
        assert!(matches!(to_base_units("1.2.3", 18), Err(UnitsError::InvalidFormat(_))));
        assert!(matches!(to_base_units("1e18", 18), Err(UnitsError::InvalidFormat(_))));
        assert!(matches!(to_base_units(".", 18), Err(UnitsError::InvalidFormat(_))));
        assert!(matches!(
            to_base_units("0.0000000000000000001", 18),
            Err(UnitsError::TooPrecise { .. })
        ));
        assert!(matches!(to_base_units("1", 78), Err(UnitsError::UnsupportedDecimals(78))));
    }

    #[test]
    fn test_to_base_units_overflow() {
        let huge = "9".repeat(70);
        assert!(matches!(to_base_units(&huge, 18), Err(UnitsError::Overflow(_))));
    }

    #[test]
    fn test_round_trip() {
        for amount in ["12.5", "10", "0.000000000000000001", "123456789.987654321", "0"] {
            let base = to_base_units(amount, 18).unwrap();
            assert_eq!(from_base_units(base, 18).unwrap(), amount);
        }
    }

    #[test]
    fn test_from_base_units_normalizes() {
        let base = to_base_units("007.2500", 18).unwrap();
        assert_eq!(from_base_units(base, 18).unwrap(), "7.25");
    }

    #[test]
    fn test_gas_margin() {
        assert_eq!(calculate_gas_margin(U256::from(200_000u64), 1000), U256::from(220_000u64));
        assert_eq!(calculate_gas_margin(U256::from(21_000u64), 0), U256::from(21_000u64));
        assert_eq!(calculate_gas_margin(U256::from(3u64), 1000), U256::from(3u64));
        assert_eq!(calculate_gas_margin(U256::MAX, 1000), U256::MAX / U256::from(BPS_DENOMINATOR));
    }

    #[test]
    fn test_gas_margin_with_huge_margin_saturates() {
        let expected = U256::from(u64::MAX) + U256::from(BPS_DENOMINATOR);
        assert_eq!(
            calculate_gas_margin(U256::from(BPS_DENOMINATOR), u64::MAX),
            expected
        );
        assert_eq!(
            calculate_gas_margin(U256::MAX, u64::MAX),
            U256::MAX / U256::from(BPS_DENOMINATOR)
        );
    }
}
