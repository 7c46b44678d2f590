//! Row normalization
//!
//! Turns a raw TSV row into a [`CatalogRecord`]. Columns are matched by header
//! name, so column order in the export does not matter and unknown columns are
//! ignored. Normalization is pure: the same header and row always produce the
//! same record.
//!
//! # Coercion rules
//! - Text: trimmed, empty becomes `None`, longer than the column limit is cut
//!   to exactly the limit in characters (never inside a UTF-8 sequence).
//! - Decimals: `,` is accepted as the decimal separator; empty, non-numeric,
//!   non-finite, or magnitudes above 999,999,999,999 become `None`.
//! - Timestamps: Unix seconds; empty, `0`, or non-integer becomes `None`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::NormalizeError;
use crate::models::{columns, limits, CatalogRecord};

/// Largest accepted magnitude for decimal columns
pub const MAX_DECIMAL_MAGNITUDE: f64 = 999_999_999_999.0;

/// Header positions resolved once per input file
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    width: usize,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_ref().to_string(), idx))
            .collect();

        Self {
            width: headers.len(),
            positions,
        }
    }

    /// Normalize one row against this header
    pub fn normalize<S: AsRef<str>>(&self, values: &[S]) -> Result<CatalogRecord, NormalizeError> {
        if values.len() != self.width {
            return Err(NormalizeError::SchemaMismatch {
                expected: self.width,
                actual: values.len(),
            });
        }

        let row = Row { index: self, values };

        let code = row.text(columns::CODE, limits::CODE).ok_or(NormalizeError::MissingCode)?;

        Ok(CatalogRecord {
            code,
            product_name: row.text(columns::PRODUCT_NAME, limits::PRODUCT_NAME),
            generic_name: row.text(columns::GENERIC_NAME, limits::GENERIC_NAME),
            brands: row.text(columns::BRANDS, limits::BRANDS),
            categories: row.text(columns::CATEGORIES, limits::CATEGORIES),
            quantity: row.text(columns::QUANTITY, limits::QUANTITY),
            packaging: row.text(columns::PACKAGING, limits::PACKAGING),
            labels: row.text(columns::LABELS, limits::LABELS),
            origins: row.text(columns::ORIGINS, limits::ORIGINS),
            manufacturing_places: row
                .text(columns::MANUFACTURING_PLACES, limits::MANUFACTURING_PLACES),
            countries: row.text(columns::COUNTRIES, limits::COUNTRIES),
            ingredients_text: row.text(columns::INGREDIENTS_TEXT, limits::INGREDIENTS_TEXT),
            allergens: row.text(columns::ALLERGENS, limits::ALLERGENS),
            traces: row.text(columns::TRACES, limits::TRACES),
            nutriscore_grade: row.text(columns::NUTRISCORE_GRADE, limits::NUTRISCORE_GRADE),
            image_url: row.text(columns::IMAGE_URL, limits::IMAGE_URL),
            energy_kcal_100g: row.decimal(columns::ENERGY_KCAL),
            proteins_100g: row.decimal(columns::PROTEINS),
            carbohydrates_100g: row.decimal(columns::CARBOHYDRATES),
            fat_100g: row.decimal(columns::FAT),
            fiber_100g: row.decimal(columns::FIBER),
            salt_100g: row.decimal(columns::SALT),
            sugars_100g: row.decimal(columns::SUGARS),
            saturated_fat_100g: row.decimal(columns::SATURATED_FAT),
            completeness: row.decimal(columns::COMPLETENESS),
            created_at: row.timestamp(columns::CREATED_T),
            last_modified_at: row.timestamp(columns::LAST_MODIFIED_T),
        })
    }
}

struct Row<'a, S> {
    index: &'a HeaderIndex,
    values: &'a [S],
}

impl<S: AsRef<str>> Row<'_, S> {
    fn raw(&self, column: &str) -> Option<&str> {
        self.index
            .positions
            .get(column)
            .and_then(|&idx| self.values.get(idx))
            .map(|value| value.as_ref())
    }

    fn text(&self, column: &str, max_chars: usize) -> Option<String> {
        self.raw(column).and_then(|raw| parse_text(raw, max_chars))
    }

    fn decimal(&self, column: &str) -> Option<f64> {
        self.raw(column).and_then(parse_decimal)
    }

    fn timestamp(&self, column: &str) -> Option<DateTime<Utc>> {
        self.raw(column).and_then(parse_timestamp)
    }
}

/// Normalize a single row without keeping a [`HeaderIndex`] around
pub fn normalize<H: AsRef<str>, V: AsRef<str>>(
    headers: &[H],
    values: &[V],
) -> Result<CatalogRecord, NormalizeError> {
    HeaderIndex::new(headers).normalize(values)
}

/// First `max_chars` characters of `value`
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}

pub fn parse_text(raw: &str, max_chars: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, max_chars).to_string())
}

/// Parse a decimal that may use `,` as the separator
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = trimmed.replace(',', ".");
    // Plain decimal/exponent syntax only; keeps "inf" and "NaN" out.
    let plain = candidate
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !plain {
        return None;
    }

    let value: f64 = candidate.parse().ok()?;
    if !value.is_finite() || value.abs() > MAX_DECIMAL_MAGNITUDE {
        return None;
    }

    Some(value)
}

/// Parse Unix seconds; `0` and empty mean "unknown"
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = raw.trim().parse().ok()?;
    if seconds == 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1,5"), Some(1.5));
        assert_eq!(parse_decimal("10.25"), Some(10.25));
        assert_eq!(parse_decimal(" 7 "), Some(7.0));
        assert_eq!(parse_decimal("-3,0"), Some(-3.0));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("1,234,5"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }

    #[test]
    fn test_parse_decimal_bounds() {
        assert_eq!(parse_decimal("999999999999"), Some(999_999_999_999.0));
        assert_eq!(parse_decimal("-999999999999"), Some(-999_999_999_999.0));
        assert_eq!(parse_decimal("1000000000000"), None);
        assert_eq!(parse_decimal("-1000000000000"), None);
        assert_eq!(parse_decimal("1e300"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("1700000000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-11-14T22:13:20+00:00");
        assert_eq!(parse_timestamp("0"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_truncate_chars_is_character_aware() {
        assert_eq!(truncate_chars("Молоко", 3), "Мол");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("çé", 1), "ç");
    }

    #[test]
    fn test_normalize_by_header_name() {
        let headers = ["product_name", "energy-kcal_100g", "code", "unknown_column"];
        let values = ["Tea", "10,5", "A", "ignored"];

        let record = normalize(&headers, &values).unwrap();
        assert_eq!(record.code, "A");
        assert_eq!(record.product_name.as_deref(), Some("Tea"));
        assert_eq!(record.energy_kcal_100g, Some(10.5));
        assert_eq!(record.brands, None);
    }

    #[test]
    fn test_normalize_schema_mismatch() {
        let headers = ["code", "product_name"];
        let err = normalize(&headers, &["A"]).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::SchemaMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_normalize_requires_code() {
        let headers = ["code", "product_name"];
        assert_eq!(normalize(&headers, &["  ", "Tea"]).unwrap_err(), NormalizeError::MissingCode);
        assert_eq!(normalize(&["product_name"], &["Tea"]).unwrap_err(), NormalizeError::MissingCode);
    }

    #[test]
    fn test_normalize_truncates_long_fields() {
        let long_name = "я".repeat(limits::PRODUCT_NAME + 20);
        let long_code = "9".repeat(60);
        let record = normalize(&["code", "product_name"], &[long_code.as_str(), long_name.as_str()])
            .unwrap();

        assert_eq!(record.code.chars().count(), limits::CODE);
        assert_eq!(record.product_name.unwrap().chars().count(), limits::PRODUCT_NAME);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let headers = ["code", "countries", "created_t", "salt_100g"];
        let values = ["42", "Russia", "1600000000", "0,3"];
        assert_eq!(normalize(&headers, &values), normalize(&headers, &values));
    }
}
