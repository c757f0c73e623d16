use super::error::SyncError;
use super::fetcher::{PageFetcher, PageResult};
use super::normalizer::normalize;
use super::payload::RawProductPayload;
use super::writer::ProductStore;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Counters for pages that were committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTotals {
    pub total_synced: u64,
    pub pages_processed: u32,
}

/// A run that stopped on an error. `totals` only covers committed pages.
#[derive(Debug)]
pub struct SyncAbort {
    pub error: SyncError,
    pub totals: SyncTotals,
}

impl From<SyncError> for SyncAbort {
    fn from(error: SyncError) -> Self {
        Self {
            error,
            totals: SyncTotals::default(),
        }
    }
}

pub type SyncOutcome = Result<SyncTotals, SyncAbort>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// Result returned to whoever triggered the run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub status: ReportStatus,
    pub total_synced: u64,
    pub pages_processed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncReport {
    pub fn from_outcome(outcome: &SyncOutcome) -> Self {
        match outcome {
            Ok(totals) => Self {
                status: ReportStatus::Success,
                total_synced: totals.total_synced,
                pages_processed: totals.pages_processed,
                message: None,
            },
            Err(abort) => Self {
                status: ReportStatus::Error,
                total_synced: abort.totals.total_synced,
                pages_processed: abort.totals.pages_processed,
                message: Some(abort.error.to_string()),
            },
        }
    }
}

/// Drives the pagination loop for one run.
///
/// Pages are fetched, normalized and written strictly one after another. Each
/// page is a single transaction: a failure anywhere in it rolls the whole page
/// back and ends the run, while pages committed before it stay in place.
pub struct SyncOrchestrator<F> {
    fetcher: F,
    page_delay: Duration,
    cancel: CancellationToken,
}

impl<F: PageFetcher> SyncOrchestrator<F> {
    pub fn new(fetcher: F, page_delay: Duration) -> Self {
        Self {
            fetcher,
            page_delay,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run<S: ProductStore>(&self, store: &mut S) -> SyncOutcome {
        let mut totals = SyncTotals::default();
        let mut page: u32 = 1;

        log::info!("catalog sync started");

        loop {
            if self.cancel.is_cancelled() {
                log::warn!("catalog sync cancelled before page {}", page);
                return Err(SyncAbort {
                    error: SyncError::Cancelled,
                    totals,
                });
            }

            match self.fetcher.fetch_page(page).await {
                PageResult::EndOfPages => {
                    log::info!(
                        "page {}: end of pages; synced {} products over {} pages",
                        page,
                        totals.total_synced,
                        totals.pages_processed
                    );
                    return Ok(totals);
                }
                PageResult::EmptyPage => {
                    log::info!(
                        "page {}: empty; synced {} products over {} pages",
                        page,
                        totals.total_synced,
                        totals.pages_processed
                    );
                    return Ok(totals);
                }
                PageResult::Failure(error) => {
                    log::error!("page {}: fetch failed ({}): {}", page, error.kind(), error);
                    return Err(SyncAbort { error, totals });
                }
                PageResult::DataPage(records) => {
                    let written = match self.write_page(store, page, records).await {
                        Ok(written) => written,
                        Err(error) => {
                            log::error!(
                                "page {}: aborted ({}): {}",
                                page,
                                error.kind(),
                                error
                            );
                            return Err(SyncAbort { error, totals });
                        }
                    };

                    totals.total_synced += written as u64;
                    totals.pages_processed += 1;
                    log::info!(
                        "page {}: committed {} products ({} total)",
                        page,
                        written,
                        totals.total_synced
                    );
                }
            }

            page += 1;

            if let Err(error) = self.pause().await {
                log::warn!("catalog sync cancelled before page {}", page);
                return Err(SyncAbort { error, totals });
            }
        }
    }

    async fn write_page<S: ProductStore>(
        &self,
        store: &mut S,
        page: u32,
        records: Vec<RawProductPayload>,
    ) -> Result<usize, SyncError> {
        let count = records.len();
        let mut session = store.begin_page().await?;

        for raw in records {
            let written = match normalize(raw) {
                Ok(product) => session.upsert(&product).await,
                Err(err) => Err(err),
            };

            if let Err(error) = written {
                if let Err(rollback_err) = session.rollback().await {
                    log::error!("page {}: rollback failed: {}", page, rollback_err);
                } else {
                    log::warn!("page {}: rolled back", page);
                }
                return Err(error);
            }
        }

        session.commit().await?;
        Ok(count)
    }

    /// Courtesy delay between pages; returns early when the run is cancelled.
    async fn pause(&self) -> Result<(), SyncError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            _ = tokio::time::sleep(self.page_delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalProduct;
    use crate::sync::writer::PageSession;
    use rocket_db_pools::sqlx;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct ScriptedFetcher {
        pages: Mutex<VecDeque<PageResult>>,
        requested: Mutex<Vec<u32>>,
        cancel_after_first: Option<CancellationToken>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<PageResult>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requested: Mutex::new(Vec::new()),
                cancel_after_first: None,
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[rocket::async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, page: u32) -> PageResult {
            self.requested.lock().unwrap().push(page);
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PageResult::EndOfPages)
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: HashMap<i64, CanonicalProduct>,
        writes: usize,
        fail_on_write: Option<usize>,
        commits: usize,
        rollbacks: usize,
    }

    struct MemorySession<'a> {
        store: &'a mut MemoryStore,
        staged: Vec<CanonicalProduct>,
    }

    #[rocket::async_trait]
    impl ProductStore for MemoryStore {
        async fn begin_page<'a>(
            &'a mut self,
        ) -> Result<Box<dyn PageSession + 'a>, SyncError> {
            Ok(Box::new(MemorySession {
                store: self,
                staged: Vec::new(),
            }))
        }
    }

    #[rocket::async_trait]
    impl<'a> PageSession for MemorySession<'a> {
        async fn upsert(&mut self, product: &CanonicalProduct) -> Result<(), SyncError> {
            self.store.writes += 1;
            if self.store.fail_on_write == Some(self.store.writes) {
                return Err(SyncError::Storage(sqlx::Error::Protocol(
                    "connection reset".to_string(),
                )));
            }
            self.staged.push(product.clone());
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), SyncError> {
            for product in self.staged.drain(..) {
                self.store.rows.insert(product.id, product);
            }
            self.store.commits += 1;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), SyncError> {
            self.staged.clear();
            self.store.rollbacks += 1;
            Ok(())
        }
    }

    fn raw(id: i64) -> RawProductPayload {
        RawProductPayload {
            id: Some(id.to_string()),
            name: Some(format!("Produto {id}")),
            price: Some("10,50".to_string()),
            status: Some("A".to_string()),
            ..Default::default()
        }
    }

    fn data_page(ids: std::ops::RangeInclusive<i64>) -> PageResult {
        PageResult::DataPage(ids.map(raw).collect())
    }

    fn orchestrator(fetcher: ScriptedFetcher) -> SyncOrchestrator<ScriptedFetcher> {
        SyncOrchestrator::new(fetcher, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_end_of_pages_terminates_successfully() {
        let sync = orchestrator(ScriptedFetcher::new(vec![
            data_page(1..=3),
            data_page(4..=5),
            PageResult::EndOfPages,
        ]));
        let mut store = MemoryStore::default();

        let totals = sync.run(&mut store).await.unwrap();

        assert_eq!(totals.total_synced, 5);
        assert_eq!(totals.pages_processed, 2);
        assert_eq!(store.rows.len(), 5);
        assert_eq!(store.commits, 2);
        assert_eq!(sync.fetcher.requested(), vec![1, 2, 3]);
        assert_eq!(store.rows[&1].price, 10.5);
        assert!(store.rows[&1].active);
    }

    #[tokio::test]
    async fn test_empty_page_terminates_successfully() {
        let sync = orchestrator(ScriptedFetcher::new(vec![
            data_page(1..=4),
            PageResult::EmptyPage,
        ]));
        let mut store = MemoryStore::default();

        let outcome = sync.run(&mut store).await;
        let report = SyncReport::from_outcome(&outcome);

        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.total_synced, 4);
        assert_eq!(report.pages_processed, 1);
        assert!(report.message.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_rolls_back_only_current_page() {
        let sync = orchestrator(ScriptedFetcher::new(vec![
            data_page(1..=3),
            data_page(4..=5),
            PageResult::EndOfPages,
        ]));
        // Page one takes writes 1-3, so write 5 is the second record of page two.
        let mut store = MemoryStore {
            fail_on_write: Some(5),
            ..Default::default()
        };

        let abort = sync.run(&mut store).await.unwrap_err();

        assert!(matches!(abort.error, SyncError::Storage(_)));
        assert_eq!(abort.totals.total_synced, 3);
        assert_eq!(abort.totals.pages_processed, 1);
        assert_eq!(store.rollbacks, 1);
        let mut ids: Vec<i64> = store.rows.keys().copied().collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        // The run stops; the terminal page is never requested.
        assert_eq!(sync.fetcher.requested(), vec![1, 2]);

        let report = SyncReport::from_outcome(&Err(abort));
        assert_eq!(report.status, ReportStatus::Error);
        assert!(report.message.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_normalization_failure_aborts_page() {
        let mut broken = raw(8);
        broken.id = None;
        let sync = orchestrator(ScriptedFetcher::new(vec![
            data_page(1..=2),
            PageResult::DataPage(vec![raw(7), broken]),
        ]));
        let mut store = MemoryStore::default();

        let abort = sync.run(&mut store).await.unwrap_err();

        assert!(matches!(abort.error, SyncError::Normalization(_)));
        assert_eq!(abort.totals.pages_processed, 1);
        assert!(!store.rows.contains_key(&7));
        assert_eq!(store.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_with_prior_totals() {
        let sync = orchestrator(ScriptedFetcher::new(vec![
            data_page(1..=2),
            PageResult::Failure(SyncError::UpstreamData("bad payload".to_string())),
        ]));
        let mut store = MemoryStore::default();

        let abort = sync.run(&mut store).await.unwrap_err();

        assert!(matches!(abort.error, SyncError::UpstreamData(_)));
        assert_eq!(abort.totals.total_synced, 2);
        assert_eq!(store.rows.len(), 2);
        assert_eq!(store.rollbacks, 0);
    }

    #[tokio::test]
    async fn test_reapplying_pages_is_idempotent() {
        let mut store = MemoryStore::default();
        for _ in 0..2 {
            let sync = orchestrator(ScriptedFetcher::new(vec![data_page(1..=3)]));
            sync.run(&mut store).await.unwrap();
        }

        assert_eq!(store.rows.len(), 3);
        assert_eq!(store.writes, 6);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let sync = orchestrator(ScriptedFetcher::new(vec![data_page(1..=3)]))
            .with_cancellation(token);
        let mut store = MemoryStore::default();

        let abort = sync.run(&mut store).await.unwrap_err();

        assert!(matches!(abort.error, SyncError::Cancelled));
        assert!(sync.fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_page_delay() {
        let token = CancellationToken::new();
        let mut fetcher = ScriptedFetcher::new(vec![data_page(1..=2), data_page(3..=4)]);
        fetcher.cancel_after_first = Some(token.clone());
        let sync = SyncOrchestrator::new(fetcher, Duration::from_secs(3600))
            .with_cancellation(token);
        let mut store = MemoryStore::default();

        let abort = sync.run(&mut store).await.unwrap_err();

        assert!(matches!(abort.error, SyncError::Cancelled));
        assert_eq!(abort.totals.pages_processed, 1);
        assert_eq!(store.rows.len(), 2);
        assert_eq!(sync.fetcher.requested(), vec![1]);
    }
}
