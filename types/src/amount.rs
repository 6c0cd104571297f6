//! Display-amount to base-unit conversion.
//!
//! A token with `decimals = d` stores balances as integers of `10^-d` tokens.
//! Users type decimal amounts, so the conversion is done on the decimal
//! string with integer arithmetic: `units = floor(display * 10^d)`. Digits
//! past the `d`-th fractional place are truncated, never rounded.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AmountError;

/// An amount of an SPL token, in base units, together with its decimals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    units: u64,
    decimals: u8,
}

impl TokenAmount {
    pub fn from_units(units: u64, decimals: u8) -> Self {
        Self { units, decimals }
    }

    /// Parse a user-entered decimal string (`"100.5"`, `".25"`, `"3."`).
    ///
    /// Zero-unit results are rejected: a burn of nothing would still cost a
    /// transaction fee.
    pub fn parse_display(input: &str, decimals: u8) -> Result<Self, AmountError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::Invalid(input.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::Invalid(input.to_string()));
        }

        let scale = 10u128
            .checked_pow(u32::from(decimals))
            .ok_or(AmountError::Overflow)?;

        let mut whole: u128 = 0;
        for b in int_part.bytes() {
            whole = whole
                .checked_mul(10)
                .and_then(|w| w.checked_add(u128::from(b - b'0')))
                .ok_or(AmountError::Overflow)?;
        }

        // Keep only the first `decimals` fractional digits, right-padded.
        let mut fraction: u128 = 0;
        let kept = frac_part.bytes().take(usize::from(decimals));
        let mut kept_len = 0u32;
        for b in kept {
            fraction = fraction * 10 + u128::from(b - b'0');
            kept_len += 1;
        }
        fraction *= 10u128.pow(u32::from(decimals) - kept_len);

        let units = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction))
            .ok_or(AmountError::Overflow)?;
        let units = u64::try_from(units).map_err(|_| AmountError::Overflow)?;
        if units == 0 {
            return Err(AmountError::Zero);
        }
        Ok(Self { units, decimals })
    }

    /// Convert a floating-point UI amount.
    ///
    /// The float is first rendered with its shortest round-trip decimal form,
    /// so `1.005` converts as the string `"1.005"` rather than the binary
    /// value `1.00499999…`.
    pub fn from_ui_amount(value: f64, decimals: u8) -> Result<Self, AmountError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AmountError::Invalid(value.to_string()));
        }
        Self::parse_display(&value.to_string(), decimals)
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Render the amount back as a decimal string without trailing zeros.
    pub fn to_display(&self) -> String {
        format_units(self.units, self.decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// Format base units as a decimal string (`10050, 2` → `"100.5"`).
pub fn format_units(units: u64, decimals: u8) -> String {
    let digits = units.to_string();
    let d = usize::from(decimals);
    if d == 0 {
        return digits;
    }
    let padded = if digits.len() <= d {
        format!("{}{}", "0".repeat(d - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - d);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_documented_examples() {
        assert_eq!(TokenAmount::parse_display("1.5", 6).unwrap().units(), 1_500_000);
        assert_eq!(TokenAmount::parse_display("0.000001", 6).unwrap().units(), 1);
        assert_eq!(TokenAmount::parse_display("100.5", 2).unwrap().units(), 10_050);
    }

    #[test]
    fn sub_unit_amount_is_rejected() {
        assert_eq!(
            TokenAmount::parse_display("0.0000001", 6),
            Err(AmountError::Zero)
        );
        assert_eq!(TokenAmount::parse_display("0", 9), Err(AmountError::Zero));
    }

    #[test]
    fn extra_fraction_digits_are_truncated() {
        assert_eq!(TokenAmount::parse_display("1.239", 2).unwrap().units(), 123);
        assert_eq!(TokenAmount::parse_display("7.99999", 0).unwrap().units(), 7);
    }

    #[test]
    fn partial_forms_parse() {
        assert_eq!(TokenAmount::parse_display(".25", 2).unwrap().units(), 25);
        assert_eq!(TokenAmount::parse_display("3.", 1).unwrap().units(), 30);
        assert_eq!(TokenAmount::parse_display("  42 ", 0).unwrap().units(), 42);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(TokenAmount::parse_display("", 2), Err(AmountError::Empty));
        assert!(matches!(
            TokenAmount::parse_display(".", 2),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            TokenAmount::parse_display("-1", 2),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            TokenAmount::parse_display("1.2.3", 2),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            TokenAmount::parse_display("1e5", 2),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn large_supply_does_not_lose_precision() {
        // 2^53 + 1 is not representable as f64.
        let amount = TokenAmount::parse_display("9007199254740993", 0).unwrap();
        assert_eq!(amount.units(), 9_007_199_254_740_993);
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            TokenAmount::parse_display("18446744073709551616", 0),
            Err(AmountError::Overflow)
        );
        assert_eq!(
            TokenAmount::parse_display("1", 40),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn ui_amount_uses_shortest_decimal_form() {
        assert_eq!(TokenAmount::from_ui_amount(1.005, 3).unwrap().units(), 1005);
        assert_eq!(TokenAmount::from_ui_amount(100.5, 2).unwrap().units(), 10_050);
        assert!(TokenAmount::from_ui_amount(f64::NAN, 2).is_err());
        assert!(TokenAmount::from_ui_amount(-1.0, 2).is_err());
    }

    #[test]
    fn format_units_trims_trailing_zeros() {
        assert_eq!(format_units(10_050, 2), "100.5");
        assert_eq!(format_units(1, 6), "0.000001");
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(42, 0), "42");
        assert_eq!(format_units(0, 3), "0");
    }
}
