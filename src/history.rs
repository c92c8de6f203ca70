//! Cached post history, always newest first.

use crate::error::GatewayError;
use crate::gateway::Backend;
use crate::model::{GeneratedItem, ItemId};
use crate::observable::Observable;
use std::cmp::Ordering;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct HistoryCache {
    items: Observable<Vec<GeneratedItem>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the list and replace the cache in one step.
    ///
    /// On failure the previous list stays as it was.
    pub async fn refresh(&self, backend: &dyn Backend) -> Result<usize, GatewayError> {
        match backend.list_posts().await {
            Ok(mut items) => {
                sort_newest_first(&mut items);
                let count = items.len();
                self.items.set(items);
                debug!(count, "history refreshed");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "history refresh failed; keeping cached list");
                Err(e)
            }
        }
    }

    pub fn items(&self) -> Vec<GeneratedItem> {
        self.items.get()
    }

    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.items.with(Vec::is_empty)
    }

    pub fn find(&self, id: ItemId) -> Option<GeneratedItem> {
        self.items.with(|items| items.iter().find(|i| i.id == id).cloned())
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<GeneratedItem>> {
        self.items.subscribe()
    }
}

/// Descending by creation time. Items whose timestamp does not parse go last,
/// keeping their relative server order.
pub fn sort_newest_first(items: &mut [GeneratedItem]) {
    items.sort_by(|a, b| match (a.created_at_utc(), b.created_at_utc()) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
