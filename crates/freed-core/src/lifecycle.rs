//! Feed state machine: create, verify, poll, destroy.
//!
//! A feed moves from unverified to verified through a signed link, is polled on
//! its own schedule, and is destroyed through a signed link. Nothing here knows
//! who the caller is; authority comes only from a token produced by [`Signer`].
//!
//! Network calls (page fetch, email) happen outside the per-feed lock. The lock
//! is only held around the store's read-compare-write, so a slow page never
//! blocks a delete and a poll that finishes after a delete cannot bring the
//! record back.

use std::sync::Arc;
use std::time::Duration;

use freed_db::{FeedStore, StoreError};
use freed_types::events::{Change, Notification};
use freed_types::feed::{Feed, NewFeed};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::detector;
use crate::error::{CreateError, FetchError};
use crate::fetcher::ContentFetcher;
use crate::locks::KeyedLocks;
use crate::notifier::Notifier;
use crate::signer::Signer;

const ID_LEN: usize = 8;
const ID_ATTEMPTS: usize = 8;

/// Whether feeds that never confirmed their address get change emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnverifiedPolicy {
    #[default]
    Notify,
    Suppress,
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub unverified: UnverifiedPolicy,
    /// Upper bound on a single page fetch.
    pub fetch_timeout: Duration,
    /// Upper bound on handing one email to the notifier.
    pub notify_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            unverified: UnverifiedPolicy::default(),
            fetch_timeout: Duration::from_secs(20),
            notify_timeout: Duration::from_secs(30),
        }
    }
}

/// What happened to a notification the lifecycle wanted to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Not attempted because of [`UnverifiedPolicy::Suppress`].
    Suppressed,
    /// Attempted and failed; the state change that triggered it stands.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    /// Token missing or wrong. Nothing was read or written.
    Rejected,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Same digest as last time; only `last_checked` moved.
    Unchanged,
    /// No previous snapshot existed; this one was stored without notifying.
    Seeded,
    Updated {
        changes: Vec<Change>,
        delivery: Delivery,
    },
    /// The page could not be read; the record was left untouched.
    FetchFailed(FetchError),
    /// Token missing or wrong on a client-triggered refresh.
    Rejected,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    Deleted,
    /// The token did not match, so a fresh delete link went to the feed's own
    /// address instead.
    ConfirmationRequested(Delivery),
    NotFound,
}

pub struct FeedLifecycle {
    store: FeedStore,
    signer: Signer,
    fetcher: Arc<dyn ContentFetcher>,
    notifier: Arc<dyn Notifier>,
    locks: KeyedLocks,
    config: LifecycleConfig,
}

impl FeedLifecycle {
    pub fn new(
        store: FeedStore,
        signer: Signer,
        fetcher: Arc<dyn ContentFetcher>,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            signer,
            fetcher,
            notifier,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub async fn list(&self) -> Result<Vec<Feed>, StoreError> {
        self.store.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Feed>, StoreError> {
        self.store.get(id).await
    }

    /// Register a page. The page must be fetchable right now; otherwise nothing
    /// is stored. On success a verify link is mailed to the new address.
    pub async fn create(&self, params: NewFeed) -> Result<Feed, CreateError> {
        let content = self
            .fetch(&params.feed_url)
            .await
            .map_err(CreateError::Unreachable)?;

        let mut feed = None;
        for _ in 0..ID_ATTEMPTS {
            let id = new_id();
            let _guard = self.locks.lock(&id).await;
            if self.store.contains(&id).await? {
                continue;
            }

            let mut candidate = Feed::new(id, params.clone(), now());
            candidate.last_digest = Some(detector::fingerprint(&content));
            candidate.last_content = Some(content.clone());
            self.store.put(&candidate).await?;
            feed = Some(candidate);
            break;
        }
        let feed = feed.ok_or(CreateError::IdExhausted)?;

        info!("Feed {} created for {}", feed.id, feed.feed_url);

        let notification = Notification::VerifyEmail {
            feed_id: feed.id.clone(),
            feed_url: feed.feed_url.clone(),
            feed_sig: self.signer.sign(&feed.id),
        };
        self.notify(&feed.notify_email, &notification).await;

        Ok(feed)
    }

    /// Mark the feed's address as confirmed. Repeating it is harmless.
    pub async fn verify(&self, id: &str, token: Option<&str>) -> Result<VerifyOutcome, StoreError> {
        if !self.signer.verify(id, token) {
            debug!("Ignoring verify for {} with bad token", id);
            return Ok(VerifyOutcome::Rejected);
        }

        let _guard = self.locks.lock(id).await;
        let Some(mut feed) = self.store.get(id).await? else {
            return Ok(VerifyOutcome::NotFound);
        };
        if feed.email_verified {
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        feed.email_verified = true;
        self.store.put(&feed).await?;
        info!("Feed {} verified", id);
        Ok(VerifyOutcome::Verified)
    }

    /// Check the page once. Scheduled, so no token is needed.
    pub async fn poll(&self, id: &str) -> Result<PollOutcome, StoreError> {
        let Some(feed) = self.store.get(id).await? else {
            return Ok(PollOutcome::NotFound);
        };

        let content = match self.fetch(&feed.feed_url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Poll of feed {} ({}) failed: {}", id, feed.feed_url, e);
                return Ok(PollOutcome::FetchFailed(e));
            }
        };
        let digest = detector::fingerprint(&content);

        let (feed, changes) = {
            let _guard = self.locks.lock(id).await;

            // Re-read: the record may have been verified or destroyed while we
            // were fetching.
            let Some(mut current) = self.store.get(id).await? else {
                debug!("Feed {} disappeared during poll", id);
                return Ok(PollOutcome::NotFound);
            };

            current.last_checked = now();
            let previous = current.last_digest.clone();

            if previous.is_none() {
                current.last_content = Some(content);
                current.last_digest = Some(digest);
                self.store.put(&current).await?;
                info!("Feed {} seeded with its first snapshot", id);
                return Ok(PollOutcome::Seeded);
            }

            if !detector::has_changed(previous.as_deref(), &digest) {
                self.store.put(&current).await?;
                debug!("Feed {} unchanged", id);
                return Ok(PollOutcome::Unchanged);
            }

            let old_text = current.content_text().unwrap_or_default();
            let new_text = String::from_utf8_lossy(&content).into_owned();
            let changes = detector::changes(&old_text, &new_text);

            current.last_content = Some(content);
            current.last_digest = Some(digest);
            self.store.put(&current).await?;
            (current, changes)
        };

        info!("Feed {} changed ({} lines differ)", id, changes.len());

        let delivery = if !feed.email_verified
            && self.config.unverified == UnverifiedPolicy::Suppress
        {
            Delivery::Suppressed
        } else {
            let notification = Notification::FeedUpdated {
                feed_url: feed.feed_url.clone(),
                changes: changes.clone(),
                feed_id: feed.id.clone(),
                feed_sig: self.signer.sign(&feed.id),
            };
            self.notify(&feed.notify_email, &notification).await
        };

        Ok(PollOutcome::Updated { changes, delivery })
    }

    /// Client-triggered poll. A bad token is silently ignored.
    pub async fn refresh(&self, id: &str, token: Option<&str>) -> Result<PollOutcome, StoreError> {
        if !self.signer.verify(id, token) {
            debug!("Ignoring refresh for {} with bad token", id);
            return Ok(PollOutcome::Rejected);
        }
        self.poll(id).await
    }

    /// Delete with a valid token; otherwise mail a fresh delete link to the
    /// feed's registered address. Both are normal outcomes.
    pub async fn destroy(&self, id: &str, token: Option<&str>) -> Result<DestroyOutcome, StoreError> {
        if self.signer.verify(id, token) {
            let _guard = self.locks.lock(id).await;
            if self.store.get(id).await?.is_none() {
                return Ok(DestroyOutcome::NotFound);
            }
            self.store.remove(id).await?;
            info!("Feed {} deleted", id);
            return Ok(DestroyOutcome::Deleted);
        }

        let Some(feed) = self.store.get(id).await? else {
            return Ok(DestroyOutcome::NotFound);
        };

        info!("Delete of feed {} needs confirmation; mailing owner", id);
        let notification = Notification::VerifyDelete {
            feed_id: feed.id.clone(),
            feed_url: feed.feed_url.clone(),
            feed_sig: self.signer.sign(&feed.id),
        };
        let delivery = self.notify(&feed.notify_email, &notification).await;
        Ok(DestroyOutcome::ConfirmationRequested(delivery))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(url))
            .await
            .unwrap_or(Err(FetchError::Timeout))
    }

    /// Failures are logged and reported, never propagated.
    async fn notify(&self, to: &str, notification: &Notification) -> Delivery {
        let sent = tokio::time::timeout(
            self.config.notify_timeout,
            self.notifier.send(to, notification),
        )
        .await;

        match sent {
            Ok(Ok(())) => Delivery::Sent,
            Ok(Err(e)) => {
                warn!(
                    "Failed to send {} for feed {}: {}",
                    notification.name(),
                    notification.feed_id(),
                    e
                );
                Delivery::Failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Timed out sending {} for feed {}",
                    notification.name(),
                    notification.feed_id()
                );
                Delivery::Failed("timed out".to_string())
            }
        }
    }
}

fn new_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LEN);
    id
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
