//! Repository trait describing the content API collaborator.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{ListingPage, PostDetail};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("content request failed: {0}")]
    Transport(String),
    #[error("content service returned status {status}")]
    Status { status: u16 },
    #[error("malformed content payload: {0}")]
    Malformed(String),
    #[error("document not found")]
    NotFound,
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Read-side adapter for the hosted content service.
///
/// One instance lives per process; it is constructed in `main` and handed
/// to the services that need it. Queries, auth and transport details stay
/// behind this trait.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Fetch the first page of the post listing, restricted to `fields`.
    async fn list_posts(&self, page_size: u32, fields: &[&str]) -> Result<ListingPage, RepoError>;

    /// Follow an opaque `next_page` cursor URL to the next listing page.
    async fn fetch_page(&self, cursor: &str) -> Result<ListingPage, RepoError>;

    async fn get_post_by_uid(&self, uid: &str) -> Result<PostDetail, RepoError>;

    /// Enumerate every known post uid for path generation.
    async fn list_post_uids(&self) -> Result<Vec<String>, RepoError>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), RepoError> {
        self.list_posts(1, &["uid"]).await.map(|_| ())
    }
}
