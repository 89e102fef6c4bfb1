//! Timed regeneration of post pages through the public router.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use url::Url;

use stellato::application::feed::FeedService;
use stellato::application::repos::{ContentRepo, RepoError};
use stellato::cache::PageStore;
use stellato::domain::posts::{ListingPage, PostDetail, Section, TextBlock};
use stellato::infra::http::{HttpState, build_router};
use stellato::presentation::views::{BrandView, LayoutChrome, PageMetaView};

const REVALIDATE_WINDOW: Duration = Duration::from_secs(1800);

/// Hands out a freshly numbered revision of the same post on every fetch.
struct RevisionContent {
    revisions: AtomicUsize,
}

impl RevisionContent {
    fn new() -> Self {
        Self {
            revisions: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.revisions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentRepo for RevisionContent {
    async fn list_posts(&self, _page_size: u32, _fields: &[&str]) -> Result<ListingPage, RepoError> {
        Ok(ListingPage {
            next_page: None,
            results: Vec::new(),
        })
    }

    async fn fetch_page(&self, _cursor: &str) -> Result<ListingPage, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn get_post_by_uid(&self, uid: &str) -> Result<PostDetail, RepoError> {
        let revision = self.revisions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PostDetail {
            uid: uid.to_string(),
            published_at: None,
            title: format!("Voyage revision {revision}"),
            banner_url: "https://cdn.test/banner.png".to_string(),
            author: "Ada".to_string(),
            content: vec![Section {
                heading: "Introduction".to_string(),
                body: vec![TextBlock {
                    text: "a few words of body text".to_string(),
                }],
            }],
        })
    }

    async fn list_post_uids(&self) -> Result<Vec<String>, RepoError> {
        Ok(vec!["voyage".to_string()])
    }
}

fn router_for(content: Arc<RevisionContent>) -> Router {
    let content: Arc<dyn ContentRepo> = content;
    let feed = Arc::new(FeedService::new(
        content.clone(),
        Url::parse("https://cms.test/api/").expect("valid api url"),
        20,
    ));

    build_router(HttpState {
        feed,
        content,
        chrome: LayoutChrome {
            brand: BrandView {
                title: "stellato".to_string(),
                href: "/".to_string(),
            },
            meta: PageMetaView {
                title: "stellato".to_string(),
                description: "a blog".to_string(),
            },
        },
        post_pages: Arc::new(PageStore::new(Some(REVALIDATE_WINDOW))),
        feed_page: Arc::new(PageStore::new(None)),
    })
}

async fn get_body(router: &Router, uri: &str) -> String {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}

async fn wait_for_fetches(content: &RevisionContent, expected: usize) {
    for _ in 0..100 {
        if content.fetch_count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("regeneration never reached {expected} fetches");
}

#[tokio::test(start_paused = true)]
async fn requests_within_the_window_reuse_the_generated_page() {
    let content = Arc::new(RevisionContent::new());
    let router = router_for(content.clone());

    let first = get_body(&router, "/posts/voyage").await;
    assert!(first.contains("Voyage revision 1"));

    tokio::time::advance(Duration::from_secs(600)).await;

    let second = get_body(&router, "/posts/voyage").await;
    assert_eq!(second, first);
    assert_eq!(content.fetch_count(), 1, "no regeneration inside the window");
}

#[tokio::test(start_paused = true)]
async fn stale_pages_serve_while_regenerating_in_the_background() {
    let content = Arc::new(RevisionContent::new());
    let router = router_for(content.clone());

    let first = get_body(&router, "/posts/voyage").await;
    assert!(first.contains("Voyage revision 1"));

    tokio::time::advance(REVALIDATE_WINDOW + Duration::from_secs(1)).await;

    // The stale page answers immediately; regeneration happens off-path.
    let stale = get_body(&router, "/posts/voyage").await;
    assert_eq!(stale, first);

    wait_for_fetches(&content, 2).await;

    let refreshed = get_body(&router, "/posts/voyage").await;
    assert!(refreshed.contains("Voyage revision 2"));
}
