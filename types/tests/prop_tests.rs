use proptest::prelude::*;

use devflation_types::amount::format_units;
use devflation_types::{AmountError, BurnHistoryRecord, BurnStatus, Metadata, TokenAmount, Timestamp};

proptest! {
    /// Formatting base units and parsing the result gives back the same units.
    #[test]
    fn formatted_units_parse_back(units in 1u64..u64::MAX, decimals in 0u8..=12) {
        let text = format_units(units, decimals);
        let amount = TokenAmount::parse_display(&text, decimals).unwrap();
        prop_assert_eq!(amount.units(), units);
    }

    /// Whole numbers scale by exactly 10^decimals.
    #[test]
    fn whole_amounts_scale_exactly(whole in 1u64..1_000_000_000, decimals in 0u8..=9) {
        let amount = TokenAmount::parse_display(&whole.to_string(), decimals).unwrap();
        prop_assert_eq!(amount.units(), whole * 10u64.pow(u32::from(decimals)));
    }

    /// Digits beyond the token's precision never change the result.
    #[test]
    fn extra_digits_truncate(units in 1u64..1_000_000_000, decimals in 1u8..=9, tail in "[0-9]{1,6}") {
        let text = format!("{}{}", pad_fraction(units, decimals), tail);
        let amount = TokenAmount::parse_display(&text, decimals).unwrap();
        prop_assert_eq!(amount.units(), units);
    }

    /// Amounts smaller than one base unit are rejected, never rounded up.
    #[test]
    fn below_one_unit_is_zero(decimals in 0u8..=9, extra in 1usize..6) {
        let text = format!("0.{}1", "0".repeat(usize::from(decimals) + extra - 1));
        prop_assert_eq!(TokenAmount::parse_display(&text, decimals), Err(AmountError::Zero));
    }

    /// Timestamps survive the ISO string form at millisecond precision.
    #[test]
    fn timestamp_iso_roundtrip(ms in 0i64..4_102_444_800_000) {
        let ts = Timestamp::from_millis(ms);
        let parsed = Timestamp::parse_iso(&ts.to_iso()).unwrap();
        prop_assert_eq!(parsed.as_millis(), ms);
    }

    /// A failed record never carries a txid and always carries the error detail.
    #[test]
    fn failed_records_have_no_txid(detail in "[a-z ]{1,40}") {
        let record = BurnHistoryRecord::failed("owner", "mint", detail.clone(), Metadata::new(), Timestamp::now());
        prop_assert!(record.txid.is_none());
        prop_assert_eq!(record.status, BurnStatus::Failed);
        prop_assert_eq!(record.error.as_deref(), Some(detail.as_str()));
    }
}

// ---- Helpers ----

/// Render `units` with every fractional digit present (no trailing-zero trim).
fn pad_fraction(units: u64, decimals: u8) -> String {
    let d = usize::from(decimals);
    let digits = format!("{:0>width$}", units, width = d + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - d);
    format!("{int_part}.{frac_part}")
}
