//! End-to-end checks of the public router against an in-memory content
//! service.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use stellato::application::feed::FeedService;
use stellato::application::repos::{ContentRepo, RepoError};
use stellato::cache::PageStore;
use stellato::domain::posts::{ListingPage, PostDetail, PostSummary, Section, TextBlock};
use stellato::infra::http::{HttpState, build_router};
use stellato::presentation::views::{BrandView, LayoutChrome, PageMetaView};

const API_URL: &str = "https://cms.test/api/";
const PAGE_TWO_CURSOR: &str = "https://cms.test/api/posts-page-2";

struct StubContent {
    first_page: ListingPage,
    pages: HashMap<String, ListingPage>,
    posts: HashMap<String, PostDetail>,
    detail_fetches: AtomicUsize,
}

impl StubContent {
    fn detail_fetch_count(&self) -> usize {
        self.detail_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentRepo for StubContent {
    async fn list_posts(&self, _page_size: u32, _fields: &[&str]) -> Result<ListingPage, RepoError> {
        Ok(self.first_page.clone())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ListingPage, RepoError> {
        self.pages
            .get(cursor)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_post_by_uid(&self, uid: &str) -> Result<PostDetail, RepoError> {
        self.detail_fetches.fetch_add(1, Ordering::SeqCst);
        self.posts.get(uid).cloned().ok_or(RepoError::NotFound)
    }

    async fn list_post_uids(&self) -> Result<Vec<String>, RepoError> {
        Ok(self.posts.keys().cloned().collect())
    }
}

fn summary(uid: &str, title: &str) -> PostSummary {
    PostSummary {
        uid: uid.to_string(),
        published_at: None,
        title: title.to_string(),
        subtitle: format!("About {title}"),
        author: "Ada".to_string(),
    }
}

fn detail(uid: &str, title: &str) -> PostDetail {
    PostDetail {
        uid: uid.to_string(),
        published_at: None,
        title: title.to_string(),
        banner_url: "https://cdn.test/banner.png".to_string(),
        author: "Ada".to_string(),
        content: vec![Section {
            heading: "Introduction".to_string(),
            body: vec![TextBlock {
                text: "a few words of body text".to_string(),
            }],
        }],
    }
}

fn stub() -> Arc<StubContent> {
    Arc::new(StubContent {
        first_page: ListingPage {
            next_page: Some(PAGE_TWO_CURSOR.to_string()),
            results: vec![
                summary("first-post", "First post"),
                summary("second-post", "Second post"),
            ],
        },
        pages: HashMap::from([(
            PAGE_TWO_CURSOR.to_string(),
            ListingPage {
                next_page: None,
                results: vec![summary("third-post", "Third post")],
            },
        )]),
        posts: HashMap::from([
            ("first-post".to_string(), detail("first-post", "First post")),
            ("second-post".to_string(), detail("second-post", "Second post")),
        ]),
        detail_fetches: AtomicUsize::new(0),
    })
}

fn chrome() -> LayoutChrome {
    LayoutChrome {
        brand: BrandView {
            title: "stellato".to_string(),
            href: "/".to_string(),
        },
        meta: PageMetaView {
            title: "stellato".to_string(),
            description: "a blog".to_string(),
        },
    }
}

fn router_for(stub: Arc<StubContent>) -> Router {
    let content: Arc<dyn ContentRepo> = stub;
    let feed = Arc::new(FeedService::new(
        content.clone(),
        Url::parse(API_URL).expect("valid api url"),
        20,
    ));

    build_router(HttpState {
        feed,
        content,
        chrome: chrome(),
        post_pages: Arc::new(PageStore::new(Some(Duration::from_secs(1800)))),
        feed_page: Arc::new(PageStore::new(None)),
    })
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8(body.to_vec()).expect("utf8 body"))
}

#[tokio::test]
async fn listing_page_shows_the_first_page_and_the_control() {
    let router = router_for(stub());

    let (status, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("First post"));
    assert!(body.contains("Second post"));
    assert!(!body.contains("Third post"), "page two is not embedded");
    assert!(body.contains("load-more"));
    assert!(body.contains(PAGE_TWO_CURSOR));
}

#[tokio::test]
async fn post_pages_generate_once_then_serve_from_the_store() {
    let content = stub();
    let router = router_for(content.clone());

    let (status, body) = get(&router, "/posts/first-post").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("First post"));
    assert!(body.contains("1 min"));
    assert_eq!(content.detail_fetch_count(), 1);

    let (status, second) = get(&router, "/posts/first-post").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, body, "same static page is served again");
    assert_eq!(content.detail_fetch_count(), 1, "no second generation");
}

#[tokio::test]
async fn unknown_slugs_fail_generation_and_are_not_cached() {
    let content = stub();
    let router = router_for(content.clone());

    let (status, body) = get(&router, "/posts/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page Not Found"));

    let (status, _) = get(&router, "/posts/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        content.detail_fetch_count(),
        2,
        "failed generations stay uncached"
    );
}

#[tokio::test]
async fn load_more_returns_the_next_wire_page() {
    let router = router_for(stub());

    let encoded = "https%3A%2F%2Fcms.test%2Fapi%2Fposts-page-2";
    let (status, body) = get(&router, &format!("/feed/page?cursor={encoded}")).await;
    assert_eq!(status, StatusCode::OK);

    let page: Value = serde_json::from_str(&body).expect("json body");
    assert!(page["next_page"].is_null());
    assert_eq!(page["results"][0]["uid"], "third-post");
    assert_eq!(page["results"][0]["data"]["title"], "Third post");
}

#[tokio::test]
async fn load_more_rejects_foreign_and_missing_cursors() {
    let router = router_for(stub());

    let foreign = "https%3A%2F%2Felsewhere.test%2Fposts-page-2";
    let (status, _) = get(&router, &format!("/feed/page?cursor={foreign}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&router, "/feed/page").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_probe_reports_content_reachability() {
    let router = router_for(stub());
    let (status, _) = get(&router, "/_health/content").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn embedded_stylesheet_is_served() {
    let router = router_for(stub());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/static/site.css")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/css"));
}

#[tokio::test]
async fn unknown_routes_render_the_not_found_page() {
    let router = router_for(stub());
    let (status, body) = get(&router, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page Not Found"));
}
