//! # HN Parser
//!
//! Extracts story listings and discussion text from Hacker News HTML pages.
//! The pages carry no structured data, so everything here is selector based
//! and tolerant of missing nodes.

use std::sync::LazyLock;

use itertools::Itertools;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::types::Item;

pub const HN_BASE_URL: &str = "https://news.ycombinator.com";

static STORY_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr.athing").unwrap());
static TITLE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".titleline > a").unwrap());
static COMMENT_TREE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".comment-tree").unwrap());
static COMMENT_TEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".commtext").unwrap());

/// Discussion page of the story with `id`
pub fn discussion_url(id: &str) -> String {
    format!("{HN_BASE_URL}/item?id={id}")
}

/// Front page listing for a given day
pub fn front_page_url(day: &str) -> String {
    format!("{HN_BASE_URL}/front?day={day}")
}

/// Parses the story rows of a front page in page order, keeping at most
/// `limit` of them. Rows without an id or a title link are skipped.
#[tracing::instrument(skip(html), fields(html_len = html.len()))]
pub fn parse_front_page(html: &str, limit: usize) -> Vec<Item> {
    let document = Html::parse_document(html);

    let items = document
        .select(&STORY_ROW_SEL)
        .filter_map(parse_story_row)
        .unique_by(|item| item.id.clone())
        .take(limit)
        .collect::<Vec<_>>();

    tracing::debug!(count = items.len(), "Parsed front page");
    items
}

fn parse_story_row(row: ElementRef<'_>) -> Option<Item> {
    let id = row.value().attr("id").filter(|id| !id.is_empty())?;
    let link = row.select(&TITLE_LINK_SEL).next()?;

    let title = link.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        return None;
    }

    // self posts link to their own discussion with a relative href
    let url = link
        .value()
        .attr("href")
        .and_then(resolve_href)
        .unwrap_or_else(|| discussion_url(id));

    Some(Item {
        id: id.to_string(),
        title,
        url,
        discussion_url: discussion_url(id),
    })
}

fn resolve_href(href: &str) -> Option<String> {
    let base = Url::parse(HN_BASE_URL).ok()?;
    base.join(href.trim()).ok().map(|url| url.to_string())
}

/// Plain text of every comment in the discussion, in page order, separated
/// by blank lines. Falls back to the whole comment tree when individual
/// comments cannot be located.
pub fn extract_comments(html: &str) -> String {
    let document = Html::parse_document(html);

    let comments = document
        .select(&COMMENT_TEXT_SEL)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .join("\n\n");
    if !comments.is_empty() {
        return comments;
    }

    document
        .select(&COMMENT_TREE_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .join(" ")
}

/// Renders an article page to wrapped plain text
pub fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 100)
}
