use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use digest_pulse::{
    source::SourceFetcher,
    types::{DateKey, Item, ItemContent},
    Error,
};
use tokio::sync::Notify;

#[derive(Clone)]
pub struct MockFetcher {
    pub items: Vec<Item>,
    pub list_calls: Arc<Mutex<Vec<(DateKey, usize)>>>,
    pub content_calls: Arc<Mutex<Vec<String>>>,
    pub bodyless: HashSet<String>,
    pub fail_with: Option<String>,
    /// Listing for this date waits for a notification before answering
    pub gate: Option<(DateKey, Arc<Notify>)>,
}

impl MockFetcher {
    /// `count` items with ids `item-1..=count` and titles `Story 1..=count`
    pub fn with_items(count: usize) -> Self {
        let items = (1..=count)
            .map(|n| Item {
                id: format!("item-{n}"),
                title: format!("Story {n}"),
                url: format!("https://example.com/story-{n}"),
                discussion_url: format!("https://news.ycombinator.com/item?id=item-{n}"),
            })
            .collect();

        Self {
            items,
            list_calls: Arc::new(Mutex::new(Vec::new())),
            content_calls: Arc::new(Mutex::new(Vec::new())),
            bodyless: HashSet::new(),
            fail_with: None,
            gate: None,
        }
    }

    pub fn empty() -> Self {
        Self::with_items(0)
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::with_items(0)
        }
    }

    /// Items whose article and discussion both come back empty
    pub fn with_bodyless(mut self, ids: &[&str]) -> Self {
        self.bodyless = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn gated(mut self, date: DateKey, gate: Arc<Notify>) -> Self {
        self.gate = Some((date, gate));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.lock().unwrap().len() + self.content_calls.lock().unwrap().len()
    }
}

impl SourceFetcher for MockFetcher {
    async fn list_items(&self, date: &DateKey, limit: usize) -> Result<Vec<Item>, Error> {
        self.list_calls.lock().unwrap().push((*date, limit));
        if let Some((gated_date, gate)) = &self.gate {
            if gated_date == date {
                gate.notified().await;
            }
        }
        if let Some(ref msg) = self.fail_with {
            return Err(Error::TransientUpstream(msg.clone()));
        }
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    async fn fetch_item_content(&self, item: &Item, _size_cap: usize) -> Result<ItemContent, Error> {
        self.content_calls.lock().unwrap().push(item.id.clone());
        if self.bodyless.contains(&item.id) {
            return Ok(ItemContent {
                title: item.title.clone(),
                ..Default::default()
            });
        }
        Ok(ItemContent {
            title: item.title.clone(),
            article: format!("Article body of {}", item.id),
            discussion: format!("Comments on {}", item.id),
        })
    }
}
