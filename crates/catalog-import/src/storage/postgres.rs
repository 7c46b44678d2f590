//! PostgreSQL catalog and cache stores
//!
//! Records go to the `products` table with one multi-row
//! `INSERT ... ON CONFLICT (code) DO UPDATE` per slice of the batch, all inside
//! one transaction. Expected schema (created outside this tool):
//!
//! ```sql
//! CREATE TABLE products (
//!     id                   BIGSERIAL PRIMARY KEY,
//!     code                 VARCHAR(50) NOT NULL UNIQUE,
//!     product_name         VARCHAR(500),
//!     generic_name         VARCHAR(500),
//!     brands               VARCHAR(255),
//!     categories           VARCHAR(1000),
//!     quantity             VARCHAR(255),
//!     packaging            VARCHAR(500),
//!     labels               VARCHAR(1000),
//!     origins              VARCHAR(500),
//!     manufacturing_places VARCHAR(500),
//!     countries            VARCHAR(500),
//!     ingredients_text     TEXT,
//!     allergens            VARCHAR(1000),
//!     traces               VARCHAR(1000),
//!     nutriscore_grade     VARCHAR(10),
//!     image_url            VARCHAR(1000),
//!     energy_kcal_100g     DOUBLE PRECISION,
//!     proteins_100g        DOUBLE PRECISION,
//!     carbohydrates_100g   DOUBLE PRECISION,
//!     fat_100g             DOUBLE PRECISION,
//!     fiber_100g           DOUBLE PRECISION,
//!     salt_100g            DOUBLE PRECISION,
//!     sugars_100g          DOUBLE PRECISION,
//!     saturated_fat_100g   DOUBLE PRECISION,
//!     completeness         DOUBLE PRECISION,
//!     source_created_at    TIMESTAMPTZ,
//!     source_modified_at   TIMESTAMPTZ,
//!     created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE cache (
//!     key        VARCHAR(255) PRIMARY KEY,
//!     value      TEXT NOT NULL,
//!     expiration INTEGER NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

use super::{CacheStore, CatalogStore, UpsertStats};
use crate::error::WriteError;
use crate::models::CatalogRecord;

/// Insert column order; `code` first, the rest are overwritten on conflict
const COLUMNS: [&str; 27] = [
    "code",
    "product_name",
    "generic_name",
    "brands",
    "categories",
    "quantity",
    "packaging",
    "labels",
    "origins",
    "manufacturing_places",
    "countries",
    "ingredients_text",
    "allergens",
    "traces",
    "nutriscore_grade",
    "image_url",
    "energy_kcal_100g",
    "proteins_100g",
    "carbohydrates_100g",
    "fat_100g",
    "fiber_100g",
    "salt_100g",
    "sugars_100g",
    "saturated_fat_100g",
    "completeness",
    "source_created_at",
    "source_modified_at",
];

/// Rows per statement; keeps binds well under PostgreSQL's 65535 limit
const MAX_ROWS_PER_STATEMENT: usize = 1000;

fn insert_prefix() -> String {
    format!("INSERT INTO products ({}) ", COLUMNS.join(", "))
}

fn conflict_clause() -> String {
    let updates: Vec<String> = COLUMNS[1..]
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();

    format!(
        " ON CONFLICT (code) DO UPDATE SET {}, updated_at = NOW() RETURNING (xmax = 0) AS inserted",
        updates.join(", ")
    )
}

/// Catalog store backed by the `products` table
#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(level = "debug", skip(self, records), fields(records = records.len()))]
    async fn upsert(&self, records: &[CatalogRecord]) -> Result<UpsertStats, WriteError> {
        let mut stats = UpsertStats::default();
        if records.is_empty() {
            return Ok(stats);
        }

        let mut tx = self.db.begin().await?;

        for slice in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix());

            query_builder.push_values(slice, |mut b, record| {
                b.push_bind(&record.code)
                    .push_bind(&record.product_name)
                    .push_bind(&record.generic_name)
                    .push_bind(&record.brands)
                    .push_bind(&record.categories)
                    .push_bind(&record.quantity)
                    .push_bind(&record.packaging)
                    .push_bind(&record.labels)
                    .push_bind(&record.origins)
                    .push_bind(&record.manufacturing_places)
                    .push_bind(&record.countries)
                    .push_bind(&record.ingredients_text)
                    .push_bind(&record.allergens)
                    .push_bind(&record.traces)
                    .push_bind(&record.nutriscore_grade)
                    .push_bind(&record.image_url)
                    .push_bind(record.energy_kcal_100g)
                    .push_bind(record.proteins_100g)
                    .push_bind(record.carbohydrates_100g)
                    .push_bind(record.fat_100g)
                    .push_bind(record.fiber_100g)
                    .push_bind(record.salt_100g)
                    .push_bind(record.sugars_100g)
                    .push_bind(record.saturated_fat_100g)
                    .push_bind(record.completeness)
                    .push_bind(record.created_at)
                    .push_bind(record.last_modified_at);
            });

            query_builder.push(conflict_clause());

            let rows = query_builder.build().fetch_all(&mut *tx).await?;
            for row in rows {
                if row.try_get::<bool, _>("inserted")? {
                    stats.inserted += 1;
                } else {
                    stats.updated += 1;
                }
            }
        }

        tx.commit().await?;

        debug!(inserted = stats.inserted, updated = stats.updated, "Upserted catalog rows");
        Ok(stats)
    }
}

/// Cache entries kept in a `cache(key, value, expiration)` table
#[derive(Clone)]
pub struct PgCacheStore {
    db: PgPool,
    prefix: String,
}

impl PgCacheStore {
    /// `prefix` is prepended to every key, matching how the host application
    /// namespaces its cache
    pub fn new(db: PgPool, prefix: impl Into<String>) -> Self {
        Self {
            db,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn forget(&self, keys: &[String]) -> Result<(), WriteError> {
        if keys.is_empty() {
            return Ok(());
        }

        let prefixed: Vec<String> = keys.iter().map(|key| format!("{}{}", self.prefix, key)).collect();

        let result = sqlx::query("DELETE FROM cache WHERE key = ANY($1)")
            .bind(&prefixed)
            .execute(&self.db)
            .await?;

        debug!(requested = keys.len(), removed = result.rows_affected(), "Invalidated cache keys");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_clause_updates_every_mutable_column() {
        let clause = conflict_clause();
        assert!(clause.starts_with(" ON CONFLICT (code) DO UPDATE SET product_name = EXCLUDED.product_name"));
        assert!(clause.contains("source_modified_at = EXCLUDED.source_modified_at"));
        assert!(!clause.contains("code = EXCLUDED.code"));
        assert!(clause.ends_with("RETURNING (xmax = 0) AS inserted"));
    }

    #[test]
    fn test_bind_count_stays_under_limit() {
        assert!(MAX_ROWS_PER_STATEMENT * COLUMNS.len() < u16::MAX as usize);
    }

    #[test]
    fn test_insert_prefix_lists_columns_in_order() {
        let prefix = insert_prefix();
        assert!(prefix.starts_with("INSERT INTO products (code, product_name, "));
        assert!(prefix.ends_with("source_created_at, source_modified_at) "));
    }
}
