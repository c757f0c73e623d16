//! Product catalog synchronization.
//!
//! This module pulls the full product catalog from the Tiny ERP search API,
//! page by page, and upserts it into the local `products` table.
//!
//! # Components
//!
//! - **`fetcher`**: Issues one page request and classifies the answer as a data
//!   page, an empty page, the end of pages, or a failure.
//!
//! - **`normalizer`**: Turns a raw upstream product into a `CanonicalProduct`
//!   (integer ids, comma-decimal prices, status flag, `dd/mm/yyyy` timestamps).
//!
//! - **`writer`**: Insert-or-update keyed on the upstream id, executed inside a
//!   per-page transaction.
//!
//! - **`orchestrator`**: The pagination loop. Owns the page transactions,
//!   accumulates totals and decides whether to continue, stop or abort.
//!
//! - **`jobs`**: Tracks the in-flight run so only one runs at a time and the
//!   last outcome can be inspected or the run cancelled.
//!
//! ## Failure model
//!
//! Every page is committed as one unit. A failure while fetching, normalizing
//! or writing rolls back the current page only and ends the run; pages that
//! were already committed stay, so an aborted run leaves the catalog partially
//! refreshed until the next full run.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod jobs;
pub mod migration;
pub mod normalizer;
pub mod orchestrator;
pub mod payload;
pub mod writer;

pub use config::{SyncConfig, SyncCredentials};
pub use error::SyncError;
pub use fetcher::{PageFetcher, PageResult, TinyPageFetcher};
pub use migration::run_migrations;
pub use orchestrator::{SyncAbort, SyncOrchestrator, SyncOutcome, SyncReport, SyncTotals};

use rocket_db_pools::sqlx::{self, PgPool, postgres::PgPoolOptions};
use tokio_util::sync::CancellationToken;
use writer::PgProductStore;

/// Open a small pool for a standalone run and optionally bring the schema up to date.
///
/// Connection and migration failures come back as storage errors so callers can
/// report them like any other aborted run.
pub async fn connect_pool(
    config: &SyncConfig,
    apply_migrations: bool,
) -> Result<PgPool, SyncError> {
    let credentials = config.credentials()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(config.request_timeout)
        .connect(&credentials.database_url)
        .await?;

    if apply_migrations {
        if let Err(err) = run_migrations(&pool).await {
            pool.close().await;
            return Err(SyncError::Storage(sqlx::Error::Migrate(Box::new(err))));
        }
    }

    Ok(pool)
}

/// Run one full catalog sync against `pool`.
///
/// Fails with a configuration error, before any network or storage access,
/// when the API token or the database url is missing.
pub async fn run_with_pool(
    config: &SyncConfig,
    pool: &PgPool,
    cancel: CancellationToken,
) -> SyncOutcome {
    let credentials = config.credentials()?;

    let fetcher = TinyPageFetcher::new(
        &config.api_base_url,
        credentials.api_token,
        config.request_timeout,
    )?;
    let mut store = PgProductStore::acquire(pool).await?;

    SyncOrchestrator::new(fetcher, config.page_delay)
        .with_cancellation(cancel)
        .run(&mut store)
        .await
}
