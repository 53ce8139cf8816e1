pub mod hacker_news;

use std::future::Future;

use crate::{
    error::Error,
    types::{DateKey, Item, ItemContent},
};

pub use hacker_news::HackerNewsFetcher;

pub trait SourceFetcher {
    /// Lists up to `limit` items for `date`, in source ranking order
    fn list_items(
        &self,
        date: &DateKey,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Item>, Error>> + Send;

    /// Fetches article and discussion text for `item`, each capped at
    /// `size_cap` characters. Either part may come back empty.
    fn fetch_item_content(
        &self,
        item: &Item,
        size_cap: usize,
    ) -> impl Future<Output = Result<ItemContent, Error>> + Send;
}
