//! Geographic row filters
//!
//! Both predicates are pure and compare case-insensitively by substring. The
//! word lists live in [`FilterTable`] so they can be inspected and replaced
//! without touching the predicates.

use serde::{Deserialize, Serialize};

use crate::models::CatalogRecord;

/// Word lists used by the regional-market filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTable {
    /// Countries forming the regional market (lowercase)
    pub regional_countries: Vec<String>,
    /// Product-name markers of a different regional origin (lowercase)
    pub excluded_name_terms: Vec<String>,
}

impl Default for FilterTable {
    fn default() -> Self {
        let regional_countries = ["russia", "ukraine", "belarus", "kazakhstan", "moldova"];
        let excluded_name_terms = [
            "türk", "turk", "türkiye", "turkey", "helal", "lezzet", "köy", "polski", "polska",
            "deutsch", "chinese", "korean", "japanese", "arabic", "halal", "thai", "vietnam",
        ];

        Self {
            regional_countries: regional_countries.iter().map(|s| s.to_string()).collect(),
            excluded_name_terms: excluded_name_terms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Case-insensitive substring test
fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn geography_mentions(record: &CatalogRecord, needle_lower: &str) -> bool {
    record
        .geography()
        .iter()
        .flatten()
        .any(|field| contains_ci(field, needle_lower))
}

/// Sold in or made in the regional market, and not labelled for another one
pub fn is_regional_market(record: &CatalogRecord, table: &FilterTable) -> bool {
    let in_region = table
        .regional_countries
        .iter()
        .any(|country| geography_mentions(record, &country.to_lowercase()));
    if !in_region {
        return false;
    }

    let name = record.product_name.as_deref().unwrap_or_default().to_lowercase();
    !table
        .excluded_name_terms
        .iter()
        .any(|term| name.contains(&term.to_lowercase()))
}

/// `target` appears in countries, manufacturing places, or origins
pub fn is_single_country(record: &CatalogRecord, target: &str) -> bool {
    geography_mentions(record, &target.trim().to_lowercase())
}

/// The set of filters enabled for one run
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    regional: Option<FilterTable>,
    country: Option<String>,
}

impl RowFilter {
    /// Accepts every record
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_regional_market(mut self, table: FilterTable) -> Self {
        self.regional = Some(table);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.regional.is_some() || self.country.is_some()
    }

    /// Whether `record` passes every enabled predicate
    pub fn accepts(&self, record: &CatalogRecord) -> bool {
        if let Some(table) = &self.regional {
            if !is_regional_market(record, table) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !is_single_country(record, country) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, countries: Option<&str>, places: Option<&str>, origins: Option<&str>) -> CatalogRecord {
        let mut record = CatalogRecord::new("1");
        record.product_name = Some(name.to_string());
        record.countries = countries.map(str::to_string);
        record.manufacturing_places = places.map(str::to_string);
        record.origins = origins.map(str::to_string);
        record
    }

    #[test]
    fn test_regional_market_by_any_geography_field() {
        let table = FilterTable::default();
        assert!(is_regional_market(&record("Kefir", Some("Russia"), None, None), &table));
        assert!(is_regional_market(&record("Kefir", None, Some("Kyiv, UKRAINE"), None), &table));
        assert!(is_regional_market(&record("Kefir", None, None, Some("en:belarus")), &table));
        assert!(!is_regional_market(&record("Kefir", Some("France"), None, None), &table));
        assert!(!is_regional_market(&record("Kefir", None, None, None), &table));
    }

    #[test]
    fn test_regional_market_rejects_excluded_names() {
        let table = FilterTable::default();
        let turkish = record("Türk Kahvesi", Some("Russia"), None, None);
        assert!(!is_regional_market(&turkish, &table));

        let halal = record("HALAL sausages", Some("Kazakhstan"), None, None);
        assert!(!is_regional_market(&halal, &table));
    }

    #[test]
    fn test_regional_market_without_name() {
        let mut unnamed = record("", Some("Moldova"), None, None);
        unnamed.product_name = None;
        assert!(is_regional_market(&unnamed, &FilterTable::default()));
    }

    #[test]
    fn test_single_country() {
        let r = record("Tea", Some("Germany,France"), None, Some("India"));
        assert!(is_single_country(&r, "france"));
        assert!(is_single_country(&r, "INDIA"));
        assert!(!is_single_country(&r, "Spain"));
    }

    #[test]
    fn test_row_filter_combines_predicates() {
        let r = record("Kefir", Some("Russia, Belarus"), None, None);

        assert!(RowFilter::none().accepts(&r));
        assert!(!RowFilter::none().is_enabled());

        let regional = RowFilter::none().with_regional_market(FilterTable::default());
        assert!(regional.accepts(&r));

        let both = regional.clone().with_country("belarus");
        assert!(both.accepts(&r));

        let mismatch = regional.with_country("ukraine");
        assert!(!mismatch.accepts(&r));
    }
}
