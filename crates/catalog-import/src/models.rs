//! Catalog data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum character counts for text columns
///
/// Values longer than the limit are cut to exactly this many characters.
pub mod limits {
    pub const CODE: usize = 50;
    pub const PRODUCT_NAME: usize = 500;
    pub const GENERIC_NAME: usize = 500;
    pub const BRANDS: usize = 255;
    pub const CATEGORIES: usize = 1000;
    pub const QUANTITY: usize = 255;
    pub const PACKAGING: usize = 500;
    pub const LABELS: usize = 1000;
    pub const ORIGINS: usize = 500;
    pub const MANUFACTURING_PLACES: usize = 500;
    pub const COUNTRIES: usize = 500;
    pub const INGREDIENTS_TEXT: usize = 10_000;
    pub const ALLERGENS: usize = 1000;
    pub const TRACES: usize = 1000;
    pub const NUTRISCORE_GRADE: usize = 10;
    pub const IMAGE_URL: usize = 1000;
}

/// Upstream header names
pub mod columns {
    pub const CODE: &str = "code";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const GENERIC_NAME: &str = "generic_name";
    pub const BRANDS: &str = "brands";
    pub const CATEGORIES: &str = "categories";
    pub const QUANTITY: &str = "quantity";
    pub const PACKAGING: &str = "packaging";
    pub const LABELS: &str = "labels";
    pub const ORIGINS: &str = "origins";
    pub const MANUFACTURING_PLACES: &str = "manufacturing_places";
    pub const COUNTRIES: &str = "countries";
    pub const INGREDIENTS_TEXT: &str = "ingredients_text";
    pub const ALLERGENS: &str = "allergens";
    pub const TRACES: &str = "traces";
    pub const NUTRISCORE_GRADE: &str = "nutriscore_grade";
    pub const IMAGE_URL: &str = "image_url";
    pub const ENERGY_KCAL: &str = "energy-kcal_100g";
    pub const PROTEINS: &str = "proteins_100g";
    pub const CARBOHYDRATES: &str = "carbohydrates_100g";
    pub const FAT: &str = "fat_100g";
    pub const FIBER: &str = "fiber_100g";
    pub const SALT: &str = "salt_100g";
    pub const SUGARS: &str = "sugars_100g";
    pub const SATURATED_FAT: &str = "saturated-fat_100g";
    pub const COMPLETENESS: &str = "completeness";
    pub const CREATED_T: &str = "created_t";
    pub const LAST_MODIFIED_T: &str = "last_modified_t";
}

/// One normalized catalog entry, keyed by `code`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Barcode-like business key (at most 50 characters, never empty)
    pub code: String,
    pub product_name: Option<String>,
    pub generic_name: Option<String>,
    pub brands: Option<String>,
    pub categories: Option<String>,
    pub quantity: Option<String>,
    pub packaging: Option<String>,
    pub labels: Option<String>,
    pub origins: Option<String>,
    pub manufacturing_places: Option<String>,
    pub countries: Option<String>,
    pub ingredients_text: Option<String>,
    pub allergens: Option<String>,
    pub traces: Option<String>,
    pub nutriscore_grade: Option<String>,
    pub image_url: Option<String>,

    // Nutrition per 100 g
    pub energy_kcal_100g: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub carbohydrates_100g: Option<f64>,
    pub fat_100g: Option<f64>,
    pub fiber_100g: Option<f64>,
    pub salt_100g: Option<f64>,
    pub sugars_100g: Option<f64>,
    pub saturated_fat_100g: Option<f64>,
    pub completeness: Option<f64>,

    /// Upstream creation time (`created_t`)
    pub created_at: Option<DateTime<Utc>>,
    /// Upstream modification time (`last_modified_t`)
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl CatalogRecord {
    /// Record with only the key set
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            product_name: None,
            generic_name: None,
            brands: None,
            categories: None,
            quantity: None,
            packaging: None,
            labels: None,
            origins: None,
            manufacturing_places: None,
            countries: None,
            ingredients_text: None,
            allergens: None,
            traces: None,
            nutriscore_grade: None,
            image_url: None,
            energy_kcal_100g: None,
            proteins_100g: None,
            carbohydrates_100g: None,
            fat_100g: None,
            fiber_100g: None,
            salt_100g: None,
            sugars_100g: None,
            saturated_fat_100g: None,
            completeness: None,
            created_at: None,
            last_modified_at: None,
        }
    }

    /// Fields consulted by geographic filters
    pub fn geography(&self) -> [Option<&str>; 3] {
        [
            self.countries.as_deref(),
            self.manufacturing_places.as_deref(),
            self.origins.as_deref(),
        ]
    }
}
