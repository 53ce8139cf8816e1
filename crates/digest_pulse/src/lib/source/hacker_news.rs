use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::{
    error::Error,
    parser::{extract_comments, front_page_url, html_to_text, parse_front_page},
    source::SourceFetcher,
    types::{cap_chars, DateKey, Item, ItemContent},
};

/// Reads the daily front page and story pages of Hacker News
#[derive(Debug, Clone)]
pub struct HackerNewsFetcher {
    client: ClientWithMiddleware,
}

impl HackerNewsFetcher {
    const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, Error> {
        let resp = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::TransientUpstream(format!(
                "{url} returned {}",
                resp.status()
            )));
        }
        Ok(resp.text().await?)
    }

    /// Article text, or empty when the page cannot be fetched
    async fn article_text(&self, item: &Item) -> String {
        // self posts have no article beyond the discussion page
        if item.url == item.discussion_url {
            return String::new();
        }

        match self.fetch_html(&item.url).await {
            Ok(html) => html_to_text(&html),
            Err(e) => {
                tracing::warn!(error = %e, url = %item.url, "Failed to fetch article");
                String::new()
            }
        }
    }

    /// Discussion text, or empty when the page cannot be fetched
    async fn discussion_text(&self, item: &Item) -> String {
        match self.fetch_html(&item.discussion_url).await {
            Ok(html) => extract_comments(&html),
            Err(e) => {
                tracing::warn!(error = %e, url = %item.discussion_url, "Failed to fetch discussion");
                String::new()
            }
        }
    }
}

impl SourceFetcher for HackerNewsFetcher {
    #[tracing::instrument(skip(self))]
    async fn list_items(&self, date: &DateKey, limit: usize) -> Result<Vec<Item>, Error> {
        let html = self
            .fetch_html(&front_page_url(&date.to_string()))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch front page"))?;

        let items = parse_front_page(&html, limit);
        tracing::info!(count = items.len(), "Listed front page items");
        Ok(items)
    }

    #[tracing::instrument(skip(self, item), fields(item_id = %item.id))]
    async fn fetch_item_content(&self, item: &Item, size_cap: usize) -> Result<ItemContent, Error> {
        let (article, discussion) =
            tokio::join!(self.article_text(item), self.discussion_text(item));

        Ok(ItemContent {
            title: item.title.clone(),
            article: cap_chars(&article, size_cap).to_string(),
            discussion: cap_chars(&discussion, size_cap).to_string(),
        })
    }
}
