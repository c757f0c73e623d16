//! Product persistence.
//!
//! [`upsert_product`] is the single write path into the `products` table. The
//! [`ProductStore`]/[`PageSession`] pair gives the orchestrator one
//! transaction per page on a connection held for the whole run.

use super::error::SyncError;
use crate::models::CanonicalProduct;
use rocket_db_pools::sqlx::{self, PgConnection, PgPool, Postgres, Transaction, pool::PoolConnection};

/// Insert or update one product keyed on its upstream id.
///
/// Must run inside a caller-owned transaction; this function never commits.
/// `last_synced_at` never moves backwards, even if the database clock does.
pub async fn upsert_product(
    conn: &mut PgConnection,
    product: &CanonicalProduct,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO products (
            id, name, sku, gtin, price, cost_price, unit, active,
            created_at, updated_at, last_synced_at
           )
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
           ON CONFLICT (id) DO UPDATE
           SET name = EXCLUDED.name,
               sku = EXCLUDED.sku,
               gtin = EXCLUDED.gtin,
               price = EXCLUDED.price,
               cost_price = EXCLUDED.cost_price,
               unit = EXCLUDED.unit,
               active = EXCLUDED.active,
               created_at = EXCLUDED.created_at,
               updated_at = EXCLUDED.updated_at,
               last_synced_at = GREATEST(products.last_synced_at, EXCLUDED.last_synced_at)"#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.sku)
    .bind(&product.gtin)
    .bind(product.price)
    .bind(product.cost_price)
    .bind(&product.unit)
    .bind(product.active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await?;

    log::trace!("upserted product {}", product.id);
    Ok(())
}

/// Storage session held for the duration of one run.
#[rocket::async_trait]
pub trait ProductStore: Send {
    /// Open the transaction that will hold one page's writes.
    async fn begin_page<'a>(&'a mut self) -> Result<Box<dyn PageSession + 'a>, SyncError>;
}

/// One page's transaction. Either `commit` or `rollback` ends it.
#[rocket::async_trait]
pub trait PageSession: Send {
    async fn upsert(&mut self, product: &CanonicalProduct) -> Result<(), SyncError>;
    async fn commit(&mut self) -> Result<(), SyncError>;
    async fn rollback(&mut self) -> Result<(), SyncError>;
}

/// PostgreSQL-backed [`ProductStore`] holding a single pooled connection.
pub struct PgProductStore {
    conn: PoolConnection<Postgres>,
}

impl PgProductStore {
    pub async fn acquire(pool: &PgPool) -> Result<Self, SyncError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn })
    }
}

#[rocket::async_trait]
impl ProductStore for PgProductStore {
    async fn begin_page<'a>(&'a mut self) -> Result<Box<dyn PageSession + 'a>, SyncError> {
        let tx = sqlx::Connection::begin(&mut *self.conn).await?;
        Ok(Box::new(PgPageSession { tx: Some(tx) }))
    }
}

pub struct PgPageSession<'c> {
    tx: Option<Transaction<'c, Postgres>>,
}

impl<'c> PgPageSession<'c> {
    fn take(&mut self) -> Result<Transaction<'c, Postgres>, SyncError> {
        self.tx.take().ok_or_else(finished)
    }
}

fn finished() -> SyncError {
    SyncError::Storage(sqlx::Error::Protocol(
        "page transaction already finished".to_string(),
    ))
}

#[rocket::async_trait]
impl<'c> PageSession for PgPageSession<'c> {
    async fn upsert(&mut self, product: &CanonicalProduct) -> Result<(), SyncError> {
        let tx = self.tx.as_mut().ok_or_else(finished)?;
        upsert_product(&mut **tx, product).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SyncError> {
        self.take()?.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SyncError> {
        self.take()?.rollback().await?;
        Ok(())
    }
}
