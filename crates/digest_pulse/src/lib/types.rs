//! Domain types shared by the pipeline stages and the collaborators.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Separator placed between the sections of a generation payload
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Returns the longest prefix of `text` holding at most `max_chars` characters
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Calendar date that partitions every artifact of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Current calendar date as observed in `tz`
    pub fn today(tz: Tz) -> Self {
        Self(Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn as_date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY/MM/DD`, the layout used by older audio keys
    pub fn as_path(&self) -> String {
        self.0.format("%Y/%m/%d").to_string()
    }
}

impl FromStr for DateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| Error::InvalidDate(s.to_string()))
    }
}

impl TryFrom<String> for DateKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateKey> for String {
    fn from(date: DateKey) -> Self {
        date.to_string()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A candidate story listed by the source for a given date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub url: String,
    pub discussion_url: String,
}

/// Article and discussion text of one item, already size capped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemContent {
    pub title: String,
    pub article: String,
    pub discussion: String,
}

impl ItemContent {
    /// Renders the delimited payload handed to the story summarizer.
    /// Empty sections are left out.
    pub fn to_payload(&self) -> String {
        [
            ("title", self.title.trim()),
            ("article", self.article.trim()),
            ("comments", self.discussion.trim()),
        ]
        .into_iter()
        .filter(|(_, body)| !body.is_empty())
        .map(|(tag, body)| format!("<{tag}>\n{body}\n</{tag}>"))
        .join(SECTION_SEPARATOR)
    }

    /// True when neither the article nor the discussion could be fetched
    pub fn is_bodyless(&self) -> bool {
        self.article.trim().is_empty() && self.discussion.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySummary {
    pub item_id: String,
    pub text: String,
}

/// Joins the summaries, in order, into one generation payload
pub fn join_summaries(summaries: &[StorySummary]) -> String {
    summaries.iter().map(|s| s.text.trim()).join(SECTION_SEPARATOR)
}

/// The persisted record for one date.
///
/// Older records used the field names `podcast`, `blog`, `audioUrl` and
/// `audioFiles`; those are still accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentArtifact {
    pub intro: String,
    #[serde(alias = "podcast")]
    pub podcast_script: String,
    #[serde(alias = "blog")]
    pub blog_text: String,
    #[serde(alias = "audioUrl", deserialize_with = "empty_as_none")]
    pub audio_locator: Option<String>,
    #[serde(alias = "audioFiles")]
    pub auxiliary_audio_locators: Vec<String>,
}

impl ContentArtifact {
    pub fn new(intro: String, podcast_script: String, blog_text: String) -> Self {
        Self {
            intro,
            podcast_script,
            blog_text,
            audio_locator: None,
            auxiliary_audio_locators: Vec::new(),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_locator.is_some()
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Store keys for one deployment environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    environment: String,
}

impl ArtifactKeys {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    pub fn content(&self, date: &DateKey) -> String {
        format!("content:{}:hacker-news:{date}", self.environment)
    }

    pub fn audio(&self, date: &DateKey) -> String {
        format!("audio/{}/hacker-news-{date}.mp3", self.environment)
    }

    pub fn intro_audio(&self, date: &DateKey) -> String {
        format!("audio/{}/hacker-news-{date}-intro.mp3", self.environment)
    }

    /// Audio keys written by earlier deployments; only ever deleted
    pub fn legacy_audio(&self, date: &DateKey) -> Vec<String> {
        vec![
            format!("audio/{date}-complete.mp3"),
            format!("audio/hacker-news-{date}.mp3"),
            format!(
                "{}/{}/hacker-news-{date}.mp3",
                date.as_path(),
                self.environment
            ),
        ]
    }
}
