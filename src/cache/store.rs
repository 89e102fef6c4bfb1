use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::error::AppError;

const SOURCE: &str = "cache::store";

struct CachedPage {
    html: Bytes,
    generated_at: Instant,
    revalidating: AtomicBool,
}

impl CachedPage {
    fn new(html: Bytes) -> Self {
        Self {
            html,
            generated_at: Instant::now(),
            revalidating: AtomicBool::new(false),
        }
    }
}

/// In-memory store of generated pages.
///
/// `revalidate_after` is the staleness window; `None` means entries stay
/// fresh for the life of the process.
pub struct PageStore {
    pages: DashMap<String, CachedPage>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
    revalidate_after: Option<Duration>,
}

impl PageStore {
    pub fn new(revalidate_after: Option<Duration>) -> Self {
        Self {
            pages: DashMap::new(),
            inflight: DashMap::new(),
            revalidate_after,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pages.contains_key(key)
    }

    /// Insert a freshly generated page, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, html: Bytes) {
        self.pages.insert(key.into(), CachedPage::new(html));
    }

    /// Serve `key` from the store, generating it on first request.
    ///
    /// Requests racing on a missing key coalesce onto one generation; its
    /// failure propagates to the blocked requesters and nothing is cached.
    /// A stale entry is served immediately while at most one background
    /// task regenerates it; a failed regeneration keeps the stale entry
    /// and a later request may try again.
    pub async fn get_or_generate<F, Fut>(
        self: &Arc<Self>,
        key: &str,
        generate: F,
    ) -> Result<Bytes, AppError>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<Bytes, AppError>> + Send + 'static,
    {
        if let Some(html) = self.serve_existing(key, &generate) {
            return Ok(html);
        }

        let gate = self.inflight_gate(key);
        let guard = gate.lock().await;

        // Another requester may have generated the page while we waited.
        if let Some(page) = self.pages.get(key) {
            return Ok(page.html.clone());
        }

        let outcome = match generate().await {
            Ok(html) => {
                self.insert(key, html.clone());
                Ok(html)
            }
            Err(err) => Err(err),
        };

        drop(guard);
        self.inflight.remove(key);
        outcome
    }

    fn serve_existing<F, Fut>(self: &Arc<Self>, key: &str, generate: &F) -> Option<Bytes>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<Bytes, AppError>> + Send + 'static,
    {
        let page = self.pages.get(key)?;

        if self.is_stale(&page)
            && page
                .revalidating
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            debug!(target: SOURCE, key, "Scheduling background regeneration");
            let store = Arc::clone(self);
            let key = key.to_string();
            let regen = generate();
            tokio::spawn(async move {
                match regen.await {
                    Ok(html) => store.insert(key, html),
                    Err(err) => {
                        warn!(
                            target: SOURCE,
                            key = %key,
                            error = %err,
                            "Background regeneration failed; keeping stale page"
                        );
                        if let Some(page) = store.pages.get(&key) {
                            page.revalidating.store(false, Ordering::Release);
                        }
                    }
                }
            });
        }

        Some(page.html.clone())
    }

    fn is_stale(&self, page: &CachedPage) -> bool {
        match self.revalidate_after {
            Some(window) => page.generated_at.elapsed() >= window,
            None => false,
        }
    }

    fn inflight_gate(&self, key: &str) -> Arc<Mutex<()>> {
        self.inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
