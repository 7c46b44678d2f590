//! Property tests for row normalization

use catalog_import::models::limits;
use catalog_import::normalizer::{normalize, parse_decimal, truncate_chars, MAX_DECIMAL_MAGNITUDE};
use catalog_import::NormalizeError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn truncation_keeps_a_char_prefix(value in "\\PC{0,80}", max in 0usize..60) {
        let truncated = truncate_chars(&value, max);

        prop_assert!(value.starts_with(truncated));
        prop_assert_eq!(truncated.chars().count(), value.chars().count().min(max));
    }

    #[test]
    fn comma_and_dot_decimals_agree(whole in 0i64..999_999_999_998, frac in 0u32..100) {
        let with_comma = format!("{},{:02}", whole, frac);
        let with_dot = format!("{}.{:02}", whole, frac);

        let expected: f64 = with_dot.parse().unwrap();
        prop_assert_eq!(parse_decimal(&with_comma), Some(expected));
        prop_assert_eq!(parse_decimal(&with_dot), Some(expected));
    }

    #[test]
    fn out_of_range_decimals_are_dropped(magnitude in 1_000_000_000_000i64..i64::MAX / 2) {
        prop_assert!(magnitude as f64 > MAX_DECIMAL_MAGNITUDE);
        prop_assert_eq!(parse_decimal(&magnitude.to_string()), None);
        prop_assert_eq!(parse_decimal(&format!("-{}", magnitude)), None);
    }

    #[test]
    fn normalize_is_total_and_deterministic(
        code in "\\PC{0,70}",
        name in "\\PC{0,600}",
        energy in "\\PC{0,12}",
    ) {
        let headers = ["code", "product_name", "energy-kcal_100g"];
        let values = [code.as_str(), name.as_str(), energy.as_str()];

        let first = normalize(&headers, &values);
        prop_assert_eq!(&first, &normalize(&headers, &values));

        match first {
            Ok(record) => {
                prop_assert!(record.code.chars().count() <= limits::CODE);
                prop_assert!(!record.code.is_empty());
                if let Some(product_name) = record.product_name {
                    prop_assert!(product_name.chars().count() <= limits::PRODUCT_NAME);
                }
                if let Some(energy) = record.energy_kcal_100g {
                    prop_assert!(energy.is_finite());
                }
            }
            Err(e) => {
                prop_assert_eq!(e, NormalizeError::MissingCode);
            }
        }
    }
}
