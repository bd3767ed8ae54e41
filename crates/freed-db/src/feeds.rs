use std::sync::Arc;

use freed_types::feed::Feed;
use tracing::warn;

use crate::schema::{self, FEED_INDEX, feed_key};
use crate::{KvStore, Result};

/// The only component that talks to the key-value store.
///
/// A feed is live iff its hash exists *and* its id is in the index set. When
/// the two disagree the record is reported as absent and the leftover half is
/// removed.
#[derive(Clone)]
pub struct FeedStore {
    kv: Arc<dyn KvStore>,
}

impl FeedStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Feed>> {
        let key = feed_key(id);
        let (fields, indexed) = self.kv.read_record(&key, FEED_INDEX, id).await?;

        match (fields.is_empty(), indexed) {
            (false, true) => Ok(Some(schema::decode(id, fields)?)),
            (true, false) => Ok(None),
            (true, true) => {
                if self.kv.unindex_if_missing(&key, FEED_INDEX, id).await? {
                    warn!("Feed {} was indexed without a record; removed index entry", id);
                }
                Ok(None)
            }
            (false, false) => {
                if self.kv.drop_if_unindexed(&key, FEED_INDEX, id).await? {
                    warn!("Feed {} had a record but no index entry; removed record", id);
                }
                Ok(None)
            }
        }
    }

    /// Whether `id` currently names a live feed.
    pub async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Write every field and the index entry in one atomic step.
    pub async fn put(&self, feed: &Feed) -> Result<()> {
        self.kv
            .write_record(&feed_key(&feed.id), schema::encode(feed), FEED_INDEX, &feed.id)
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.kv.delete_record(&feed_key(id), FEED_INDEX, id).await
    }

    /// Ids currently in the index. May include entries `get` would heal away.
    pub async fn ids(&self) -> Result<Vec<String>> {
        self.kv.members(FEED_INDEX).await
    }

    /// All live feeds, most recently checked first, ties broken by id.
    ///
    /// Best-effort snapshot: feeds created or removed while enumerating may or
    /// may not appear.
    pub async fn list(&self) -> Result<Vec<Feed>> {
        let mut feeds = Vec::new();
        for id in self.ids().await? {
            match self.get(&id).await {
                Ok(Some(feed)) => feeds.push(feed),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable feed {}: {}", id, e),
            }
        }
        feeds.sort_by(|a, b| {
            b.last_checked
                .cmp(&a.last_checked)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(feeds)
    }
}
