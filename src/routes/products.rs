//! Read access to the synchronized catalog.

use crate::error::ApiError;
use crate::models::{ProductStats, StoredProduct};
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;

/// Catalog size and freshness.
#[openapi(tag = "Products")]
#[get("/products/stats")]
pub async fn get_product_stats(
    pool: &State<sqlx::PgPool>,
) -> Result<Json<ProductStats>, ApiError> {
    let stats = sqlx::query_as::<_, ProductStats>(
        r#"
        SELECT
            COUNT(*) AS total_products,
            COUNT(*) FILTER (WHERE active) AS active_products,
            MAX(last_synced_at) AS last_synced_at
        FROM products
        "#,
    )
    .fetch_one(pool.inner())
    .await?;

    Ok(Json(stats))
}

/// Fetch one stored product by its upstream id.
#[openapi(tag = "Products")]
#[get("/products/<id>")]
pub async fn get_product(
    id: i64,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<StoredProduct>, ApiError> {
    let product = sqlx::query_as::<_, StoredProduct>(
        r#"SELECT id, name, sku, gtin, price, cost_price, unit, active,
                  created_at, updated_at, last_synced_at
           FROM products WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool.inner())
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;

    Ok(Json(product))
}
