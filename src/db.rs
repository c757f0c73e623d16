use rocket_db_pools::{Database, sqlx};

/// Pool for the catalog store; its url comes from `DATABASE_URL`.
#[derive(Database)]
#[database("catalog_db")]
pub struct CatalogDb(sqlx::PgPool);
