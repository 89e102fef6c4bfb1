//! Append-only accumulation over the remote post listing.

use thiserror::Error;

use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::posts::{ListingPage, PostSummary};

#[derive(Debug, Error)]
pub enum PaginationError {
    /// `load_more` was invoked after the listing reported a null cursor.
    #[error("listing is exhausted")]
    Exhausted,
    #[error("failed to fetch next listing page: {0}")]
    Fetch(#[from] RepoError),
}

/// In-memory accumulation state for one listing session.
///
/// The paginator is seeded with an already-fetched first page and never
/// fetches page one itself. Loaded summaries are appended in response
/// order, never reordered or deduplicated. The exclusive borrow on
/// [`load_more`](ListingPaginator::load_more) keeps loads sequential.
#[derive(Debug)]
pub struct ListingPaginator {
    results: Vec<PostSummary>,
    next_cursor: Option<String>,
}

impl ListingPaginator {
    pub fn seeded(initial: ListingPage) -> Self {
        Self {
            results: initial.results,
            next_cursor: initial.next_page,
        }
    }

    pub fn results(&self) -> &[PostSummary] {
        &self.results
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Whether a further page can be requested. Once this turns false it
    /// stays false for the rest of the session.
    pub fn can_load_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Fetch the page behind the current cursor and append its results.
    ///
    /// Exactly one fetch is issued per invocation. On failure both the
    /// accumulated results and the cursor are left untouched, so calling
    /// again retries from the same cursor; nothing retries automatically.
    pub async fn load_more(&mut self, repo: &dyn ContentRepo) -> Result<usize, PaginationError> {
        let Some(cursor) = self.next_cursor.as_deref() else {
            return Err(PaginationError::Exhausted);
        };

        let page = repo.fetch_page(cursor).await?;

        let appended = page.results.len();
        self.results.extend(page.results);
        self.next_cursor = page.next_page;
        Ok(appended)
    }
}
