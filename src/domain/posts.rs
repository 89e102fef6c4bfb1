//! Post entities mirrored from the content API, and the reading-time
//! estimate derived from them.

use serde::Serialize;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day] [month repr:short] [year]");

/// Fixed reading speed used by [`reading_minutes`].
pub const WORDS_PER_MINUTE: usize = 200;

/// Listing entry for a single post. Identity is the `uid` slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub published_at: Option<OffsetDateTime>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// One page of the remote post listing.
///
/// `next_page` is an opaque URL; once it is `None` the listing session is
/// permanently exhausted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

/// A unit of rich text already flattened to plain text upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub heading: String,
    pub body: Vec<TextBlock>,
}

/// Full document backing a post page. Immutable for a serving window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub uid: String,
    pub published_at: Option<OffsetDateTime>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<Section>,
}

/// Estimate reading time in whole minutes at [`WORDS_PER_MINUTE`].
///
/// Each section contributes the word count of its heading plus the word
/// count of its body blocks concatenated without a separator. Counting
/// tokenizes on whitespace with a floor of one token, so an empty heading
/// still contributes one word. That off-by-one is carried over from the
/// upstream counter on purpose; changing it is a product decision, not a
/// bug fix.
pub fn reading_minutes(content: &[Section]) -> u32 {
    let total: usize = content
        .iter()
        .map(|section| {
            let body: String = section
                .body
                .iter()
                .map(|block| block.text.as_str())
                .collect();
            count_words(&section.heading) + count_words(&body)
        })
        .sum();

    total.div_ceil(WORDS_PER_MINUTE) as u32
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}

pub fn format_human_date(moment: OffsetDateTime) -> String {
    moment
        .date()
        .format(HUMAN_DATE_FORMAT)
        .expect("valid calendar date")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn section(heading: &str, body: &[&str]) -> Section {
        Section {
            heading: heading.to_string(),
            body: body
                .iter()
                .map(|text| TextBlock {
                    text: (*text).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_content_reads_in_zero_minutes() {
        assert_eq!(reading_minutes(&[]), 0);
    }

    #[test]
    fn two_hundred_words_read_in_one_minute() {
        let body = "word ".repeat(199);
        let content = [section("Introduction", &[&body])];
        assert_eq!(reading_minutes(&content), 1);
    }

    #[test]
    fn word_two_hundred_one_starts_the_second_minute() {
        let body = "word ".repeat(200);
        let content = [section("Introduction", &[&body])];
        assert_eq!(reading_minutes(&content), 2);
    }

    #[test]
    fn empty_heading_still_counts_as_one_word() {
        // 199 body words plus the empty heading land exactly on the limit.
        let body = "word ".repeat(199);
        let unnamed = [section("", &[&body])];
        assert_eq!(reading_minutes(&unnamed), 1);

        let over = [section("", &[&format!("{body}and a little more")])];
        assert_eq!(reading_minutes(&over), 2);
    }

    #[test]
    fn body_blocks_concatenate_without_a_separator() {
        // "alphabeta" is a single word once the blocks are joined.
        let content = [section("heading", &["alpha", "beta"])];
        let split = [section("heading", &["alpha ", "beta"])];
        assert_eq!(reading_minutes(&content), 1);
        assert_eq!(reading_minutes(&split), 1);
    }

    #[test]
    fn appending_a_section_never_shrinks_the_estimate() {
        let long_body = "word ".repeat(250);
        let base = vec![section("Part one", &[&long_body])];
        let mut extended = base.clone();
        extended.push(section("Part two", &["closing remarks"]));
        assert!(reading_minutes(&extended) >= reading_minutes(&base));
    }

    #[test]
    fn human_dates_render_lowercased() {
        let moment = datetime!(2021-03-15 10:30 UTC);
        assert_eq!(format_human_date(moment), "15 mar 2021");
    }
}
