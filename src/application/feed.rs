//! Listing and post-detail assembly from the content service.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::application::error::AppError;
use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::posts::{self, ListingPage, PostDetail, PostSummary};
use crate::presentation::views::{
    self, FeedContext, LayoutChrome, PostCard, PostDetailContext, SectionView,
};

/// Summary fields requested for listing queries.
const LISTING_FIELDS: &[&str] = &["title", "subtitle", "author"];

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    content: Arc<dyn ContentRepo>,
    api_url: Url,
    page_size: u32,
}

impl FeedService {
    pub fn new(content: Arc<dyn ContentRepo>, api_url: Url, page_size: u32) -> Self {
        Self {
            content,
            api_url,
            page_size,
        }
    }

    /// First listing page, shaped for the feed template.
    pub async fn feed_context(&self) -> Result<FeedContext, FeedError> {
        let page = self
            .content
            .list_posts(self.page_size, LISTING_FIELDS)
            .await?;
        Ok(build_feed_context(page))
    }

    /// Follow a `next_page` cursor on behalf of the load-more control.
    ///
    /// The cursor is opaque but must point back at the content API origin;
    /// anything else is rejected before a request goes out.
    pub async fn append_page(&self, cursor: &str) -> Result<ListingPage, FeedError> {
        self.validate_cursor(cursor)?;
        Ok(self.content.fetch_page(cursor).await?)
    }

    pub async fn post_detail(&self, slug: &str) -> Result<Option<PostDetailContext>, FeedError> {
        let detail = match self.content.get_post_by_uid(slug).await {
            Ok(detail) => detail,
            Err(RepoError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(build_post_context(detail)))
    }

    fn validate_cursor(&self, cursor: &str) -> Result<(), FeedError> {
        let parsed =
            Url::parse(cursor).map_err(|err| FeedError::InvalidCursor(err.to_string()))?;
        if parsed.origin() != self.api_url.origin() {
            return Err(FeedError::InvalidCursor(format!(
                "cursor origin `{}` does not match the content API",
                parsed.origin().ascii_serialization()
            )));
        }
        Ok(())
    }
}

/// Render the feed page to bytes ready for the page store.
pub async fn render_feed_bytes(
    feed: &FeedService,
    chrome: &LayoutChrome,
) -> Result<Bytes, AppError> {
    let context = feed.feed_context().await?;
    let html = views::render_feed_page(chrome, context)?;
    Ok(Bytes::from(html))
}

/// Render one post page to bytes ready for the page store.
///
/// An unknown slug is a generation failure, not an empty page.
pub async fn render_post_bytes(
    feed: &FeedService,
    chrome: &LayoutChrome,
    slug: &str,
) -> Result<Bytes, AppError> {
    let Some(context) = feed.post_detail(slug).await? else {
        return Err(AppError::NotFound);
    };
    let html = views::render_post_page(chrome, context)?;
    Ok(Bytes::from(html))
}

fn build_feed_context(page: ListingPage) -> FeedContext {
    let posts: Vec<PostCard> = page.results.iter().map(summary_to_card).collect();
    FeedContext {
        post_count: posts.len(),
        posts,
        next_cursor: page.next_page,
    }
}

fn summary_to_card(summary: &PostSummary) -> PostCard {
    PostCard {
        uid: summary.uid.clone(),
        title: summary.title.clone(),
        subtitle: summary.subtitle.clone(),
        author: summary.author.clone(),
        published: summary.published_at.map(posts::format_human_date),
    }
}

fn build_post_context(detail: PostDetail) -> PostDetailContext {
    let reading_minutes = posts::reading_minutes(&detail.content);
    PostDetailContext {
        slug: detail.uid,
        title: detail.title,
        banner_url: detail.banner_url,
        author: detail.author,
        published: detail.published_at.map(posts::format_human_date),
        reading_minutes,
        sections: detail
            .content
            .into_iter()
            .map(|section| SectionView {
                heading: section.heading,
                paragraphs: section.body.into_iter().map(|block| block.text).collect(),
            })
            .collect(),
    }
}
