//! Server-side pagination
//!
//! Pages are fetched through a caller-supplied `PageFetcher`. Every request
//! takes a sequence number at dispatch; a response is applied only if its
//! number is still the latest, so a slow older response can never
//! overwrite a newer one.

use crate::notify::Notifier;
use crate::pagination::paginator::PaginationState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: usize,
    pub per_page: usize,
    pub search_term: String,
}

/// One page as returned by the server
#[derive(Debug, Clone)]
pub struct PageResponse<R> {
    pub rows: Vec<R>,
    pub total_count: usize,
    pub total_pages: usize,
}

#[async_trait]
pub trait PageFetcher<R: Send>: Send + Sync {
    async fn fetch_page(&self, query: PageQuery) -> Result<PageResponse<R>>;
}

/// Adapts an async closure into a `PageFetcher`
pub struct FnFetcher<F>(pub F);

#[async_trait]
impl<R, F, Fut> PageFetcher<R> for FnFetcher<F>
where
    R: Send + 'static,
    F: Fn(PageQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResponse<R>>> + Send + 'static,
{
    async fn fetch_page(&self, query: PageQuery) -> Result<PageResponse<R>> {
        (self.0)(query).await
    }
}

/// Result of a page load as seen by the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response applied to the displayed page
    Applied,
    /// A newer request was dispatched; response discarded
    Stale,
    /// Request failed; previous page is still displayed
    Failed(String),
    /// Nothing was requested because the arguments are not allowed
    Rejected(String),
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied)
    }
}

struct ServerInner<R> {
    rows: Arc<Vec<R>>,
    pagination: PaginationState,
    /// Query of the most recently dispatched request
    requested: PageQuery,
    /// Query whose response is currently displayed
    displayed: Option<PageQuery>,
    latest_seq: u64,
    in_flight: usize,
    last_error: Option<String>,
}

pub struct ServerPaginator<R: Send> {
    fetcher: Arc<dyn PageFetcher<R>>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<ServerInner<R>>,
}

impl<R: Send + Sync + 'static> ServerPaginator<R> {
    pub fn new(fetcher: Arc<dyn PageFetcher<R>>, per_page: usize, notifier: Arc<dyn Notifier>) -> Self {
        let per_page = per_page.max(1);
        Self {
            fetcher,
            notifier,
            inner: Mutex::new(ServerInner {
                rows: Arc::new(Vec::new()),
                pagination: PaginationState::new(per_page),
                requested: PageQuery {
                    page: 1,
                    per_page,
                    search_term: String::new(),
                },
                displayed: None,
                latest_seq: 0,
                in_flight: 0,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServerInner<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rows of the displayed page, in server order
    pub fn rows(&self) -> Arc<Vec<R>> {
        self.lock().rows.clone()
    }

    pub fn pagination(&self) -> PaginationState {
        self.lock().pagination
    }

    /// Query of the latest dispatched request
    pub fn requested(&self) -> PageQuery {
        self.lock().requested.clone()
    }

    pub fn displayed(&self) -> Option<PageQuery> {
        self.lock().displayed.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Load an explicit query
    pub async fn load(&self, query: PageQuery) -> FetchOutcome {
        let seq = self.dispatch(&query);
        let result = self.fetcher.fetch_page(query.clone()).await;
        self.resolve(seq, query, result)
    }

    /// Go to `page` with the current page size and search term. Once a page
    /// is displayed, pages past the last known page clamp to it.
    pub async fn go_to_page(&self, page: usize) -> FetchOutcome {
        let query = {
            let inner = self.lock();
            let page = match inner.displayed {
                Some(_) => inner.pagination.clamp_page(page),
                None => page.max(1),
            };
            PageQuery {
                page,
                ..inner.requested.clone()
            }
        };
        self.load(query).await
    }

    pub async fn next_page(&self) -> FetchOutcome {
        let page = self.requested().page + 1;
        self.go_to_page(page).await
    }

    pub async fn prev_page(&self) -> FetchOutcome {
        let page = self.requested().page.saturating_sub(1);
        self.go_to_page(page).await
    }

    /// Page size changes always go back to page 1
    pub async fn set_per_page(&self, per_page: usize) -> FetchOutcome {
        let query = PageQuery {
            page: 1,
            per_page: per_page.max(1),
            ..self.requested()
        };
        self.load(query).await
    }

    /// A new search term goes back to page 1
    pub async fn set_search(&self, term: &str) -> FetchOutcome {
        let query = PageQuery {
            page: 1,
            search_term: term.to_string(),
            ..self.requested()
        };
        self.load(query).await
    }

    /// Re-issue the latest requested query
    pub async fn refresh(&self) -> FetchOutcome {
        let query = self.requested();
        self.load(query).await
    }

    /// Fetch every page for the current page size and search term without
    /// touching the displayed page. Any failure discards what was gathered.
    pub async fn fetch_all(&self) -> Result<Vec<R>> {
        let base = self.requested();
        let mut rows = Vec::new();
        let mut page = 1;
        loop {
            let query = PageQuery {
                page,
                ..base.clone()
            };
            let response = self
                .fetcher
                .fetch_page(query)
                .await
                .with_context(|| format!("Failed to fetch page {} for export", page))?;
            let total_pages = response.total_pages.max(1);
            trace!("Fetched page {}/{} for export", page, total_pages);
            rows.extend(response.rows);
            if page >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(rows)
    }

    fn dispatch(&self, query: &PageQuery) -> u64 {
        let mut inner = self.lock();
        inner.latest_seq += 1;
        inner.in_flight += 1;
        inner.requested = query.clone();
        debug!(
            "Dispatching page request #{} (page={}, per_page={}, search='{}')",
            inner.latest_seq, query.page, query.per_page, query.search_term
        );
        inner.latest_seq
    }

    fn resolve(&self, seq: u64, query: PageQuery, result: Result<PageResponse<R>>) -> FetchOutcome {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if seq != inner.latest_seq {
            debug!(
                "Discarding stale response #{} (latest is #{})",
                seq, inner.latest_seq
            );
            return FetchOutcome::Stale;
        }

        match result {
            Ok(response) => {
                inner.pagination = PaginationState::from_server(
                    query.page,
                    query.per_page,
                    response.total_count,
                    response.total_pages,
                );
                inner.rows = Arc::new(response.rows);
                inner.displayed = Some(query);
                inner.last_error = None;
                trace!("Applied response #{}", seq);
                FetchOutcome::Applied
            }
            Err(e) => {
                let message = format!("Failed to load page {}: {:#}", query.page, e);
                warn!("{}", message);
                inner.last_error = Some(message.clone());
                // Roll the request target back to what is on screen
                if let Some(displayed) = inner.displayed.clone() {
                    inner.requested = displayed;
                }
                drop(inner);
                self.notifier.error(&message);
                FetchOutcome::Failed(message)
            }
        }
    }
}
