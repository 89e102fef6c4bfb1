//! HTTP client for the hosted content service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use url::Url;

use crate::application::paginator::{ListingPaginator, PaginationError};
use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::posts::{ListingPage, PostDetail, PostSummary, Section, TextBlock};

/// Page size used when walking the whole listing for path enumeration.
const UID_WALK_PAGE_SIZE: u32 = 100;

/// Wire representation of one listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPageDoc {
    pub next_page: Option<String>,
    pub results: Vec<SummaryDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDoc {
    pub uid: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub first_publication_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub data: SummaryData,
}

/// Summary fields may be trimmed by field selection, so all default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct PostDoc {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub first_publication_date: Option<OffsetDateTime>,
    pub data: PostData,
}

#[derive(Debug, Deserialize)]
pub struct PostData {
    pub title: String,
    pub banner: BannerDoc,
    pub author: String,
    pub content: Vec<SectionDoc>,
}

#[derive(Debug, Deserialize)]
pub struct BannerDoc {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SectionDoc {
    pub heading: String,
    pub body: Vec<TextBlockDoc>,
}

#[derive(Debug, Deserialize)]
pub struct TextBlockDoc {
    pub text: String,
}

/// Content API client. One instance per process, shared by reference.
pub struct ContentClient {
    http: Client,
    api_url: Url,
}

impl ContentClient {
    pub fn new(api_url: Url, timeout: Duration) -> Result<Self, RepoError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RepoError::transport)?;
        Ok(Self { http, api_url })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RepoError> {
        let mut url = self.api_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RepoError::malformed("content API URL cannot be a base"))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_listing(&self, url: Url) -> Result<ListingPage, RepoError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(RepoError::transport)?;
        let doc: ListingPageDoc = decode(response).await?;
        Ok(listing_from_doc(doc))
    }
}

#[async_trait]
impl ContentRepo for ContentClient {
    async fn list_posts(&self, page_size: u32, fields: &[&str]) -> Result<ListingPage, RepoError> {
        let mut url = self.endpoint(&["posts"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &page_size.to_string());
            if !fields.is_empty() {
                query.append_pair("fields", &fields.join(","));
            }
        }
        self.get_listing(url).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ListingPage, RepoError> {
        let url = Url::parse(cursor).map_err(|err| RepoError::InvalidCursor(err.to_string()))?;
        if url.origin() != self.api_url.origin() {
            return Err(RepoError::InvalidCursor(
                "cursor does not point at the content API".to_string(),
            ));
        }
        self.get_listing(url).await
    }

    async fn get_post_by_uid(&self, uid: &str) -> Result<PostDetail, RepoError> {
        let url = self.endpoint(&["posts", uid])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(RepoError::transport)?;
        let doc: PostDoc = decode(response).await?;
        Ok(post_from_doc(uid, doc))
    }

    async fn list_post_uids(&self) -> Result<Vec<String>, RepoError> {
        // Walk the listing the same way a reader paging through it would.
        let first = self.list_posts(UID_WALK_PAGE_SIZE, &["uid"]).await?;
        let mut paginator = ListingPaginator::seeded(first);

        while paginator.can_load_more() {
            if let Err(err) = paginator.load_more(self).await {
                return Err(match err {
                    PaginationError::Fetch(repo) => repo,
                    PaginationError::Exhausted => {
                        RepoError::malformed("listing reported an exhausted cursor mid-walk")
                    }
                });
            }
        }

        Ok(paginator
            .results()
            .iter()
            .map(|summary| summary.uid.clone())
            .collect())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RepoError> {
    match response.status() {
        status if status.is_success() => {}
        StatusCode::NOT_FOUND => return Err(RepoError::NotFound),
        status => {
            return Err(RepoError::Status {
                status: status.as_u16(),
            });
        }
    }

    let bytes = response.bytes().await.map_err(RepoError::transport)?;
    serde_json::from_slice(&bytes).map_err(RepoError::malformed)
}

fn listing_from_doc(doc: ListingPageDoc) -> ListingPage {
    ListingPage {
        next_page: doc.next_page,
        results: doc
            .results
            .into_iter()
            .map(|summary| PostSummary {
                uid: summary.uid,
                published_at: summary.first_publication_date,
                title: summary.data.title,
                subtitle: summary.data.subtitle,
                author: summary.data.author,
            })
            .collect(),
    }
}

/// Shape a listing page the way the wire represents it, for responses to
/// the load-more control.
pub fn listing_to_doc(page: &ListingPage) -> ListingPageDoc {
    ListingPageDoc {
        next_page: page.next_page.clone(),
        results: page
            .results
            .iter()
            .map(|summary| SummaryDoc {
                uid: summary.uid.clone(),
                first_publication_date: summary.published_at,
                data: SummaryData {
                    title: summary.title.clone(),
                    subtitle: summary.subtitle.clone(),
                    author: summary.author.clone(),
                },
            })
            .collect(),
    }
}

fn post_from_doc(uid: &str, doc: PostDoc) -> PostDetail {
    PostDetail {
        uid: uid.to_string(),
        published_at: doc.first_publication_date,
        title: doc.data.title,
        banner_url: doc.data.banner.url,
        author: doc.data.author,
        content: doc
            .data
            .content
            .into_iter()
            .map(|section| Section {
                heading: section.heading,
                body: section
                    .body
                    .into_iter()
                    .map(|block| TextBlock { text: block.text })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ContentClient {
        ContentClient::new(Url::parse(base).expect("valid url"), Duration::from_secs(5))
            .expect("client builds")
    }

    #[test]
    fn listing_pages_decode_from_wire_json() {
        let payload = r#"{
            "next_page": "https://cms.test/api/posts?page=2",
            "results": [
                {
                    "uid": "first-post",
                    "first_publication_date": "2021-03-15T10:30:00Z",
                    "data": {
                        "title": "First post",
                        "subtitle": "Where it began",
                        "author": "Ada"
                    }
                },
                {
                    "uid": "undated",
                    "first_publication_date": null,
                    "data": { "title": "Undated" }
                }
            ]
        }"#;

        let doc: ListingPageDoc = serde_json::from_str(payload).expect("valid listing");
        let page = listing_from_doc(doc);

        assert_eq!(page.next_page.as_deref(), Some("https://cms.test/api/posts?page=2"));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].uid, "first-post");
        assert_eq!(page.results[0].author, "Ada");
        assert!(page.results[0].published_at.is_some());
        assert!(page.results[1].published_at.is_none());
        assert_eq!(page.results[1].subtitle, "");
    }

    #[test]
    fn final_pages_decode_with_null_cursor() {
        let doc: ListingPageDoc =
            serde_json::from_str(r#"{ "next_page": null, "results": [] }"#).expect("valid page");
        let page = listing_from_doc(doc);
        assert!(page.next_page.is_none());
        assert!(page.results.is_empty());
    }

    #[test]
    fn post_documents_decode_into_detail() {
        let payload = r#"{
            "first_publication_date": "2021-03-15T10:30:00Z",
            "data": {
                "title": "Voyage",
                "banner": { "url": "https://cdn.test/banner.png" },
                "author": "Ada",
                "content": [
                    {
                        "heading": "Introduction",
                        "body": [ { "text": "hello " }, { "text": "world" } ]
                    }
                ]
            }
        }"#;

        let doc: PostDoc = serde_json::from_str(payload).expect("valid post");
        let detail = post_from_doc("voyage", doc);

        assert_eq!(detail.uid, "voyage");
        assert_eq!(detail.banner_url, "https://cdn.test/banner.png");
        assert_eq!(detail.content.len(), 1);
        assert_eq!(detail.content[0].body[1].text, "world");
    }

    #[test]
    fn endpoints_join_cleanly_with_and_without_trailing_slash() {
        let trailing = client("https://cms.test/api/");
        let url = trailing.endpoint(&["posts", "some-post"]).expect("joined");
        assert_eq!(url.as_str(), "https://cms.test/api/posts/some-post");

        let bare = client("https://cms.test/api");
        let url = bare.endpoint(&["posts"]).expect("joined");
        assert_eq!(url.as_str(), "https://cms.test/api/posts");
    }

    #[tokio::test]
    async fn foreign_cursors_are_rejected_before_any_request() {
        let client = client("https://cms.test/api/");
        let err = client
            .fetch_page("https://elsewhere.test/posts?page=2")
            .await
            .expect_err("foreign cursor");
        assert!(matches!(err, RepoError::InvalidCursor(_)));
    }

    #[test]
    fn wire_round_trip_preserves_the_cursor() {
        let page = ListingPage {
            next_page: None,
            results: vec![PostSummary {
                uid: "only".to_string(),
                published_at: None,
                title: "Only".to_string(),
                subtitle: "post".to_string(),
                author: "Ada".to_string(),
            }],
        };

        let encoded = serde_json::to_string(&listing_to_doc(&page)).expect("serializes");
        assert!(encoded.contains("\"next_page\":null"));
        assert!(encoded.contains("\"uid\":\"only\""));
    }
}
