use chrono::{DateTime, NaiveDateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Catalog Models =====

/// Normalized, storage-ready form of one upstream product.
///
/// Built fresh for every record of a page and dropped once written; the
/// `last_synced_at` stamp only exists on the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub gtin: Option<String>,
    pub price: f64,
    pub cost_price: f64,
    pub unit: Option<String>,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A product row as persisted in the `products` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredProduct {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub gtin: Option<String>,
    pub price: f64,
    pub cost_price: f64,
    pub unit: Option<String>,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub last_synced_at: DateTime<Utc>,
}

// ===== Statistics =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: i64,
    pub active_products: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}
