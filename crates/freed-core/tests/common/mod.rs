#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use freed_core::{
    ContentFetcher, FeedLifecycle, FetchError, LifecycleConfig, Notifier, NotifyError, Signer,
    UnverifiedPolicy,
};
use freed_db::{FeedStore, MemoryStore};
use freed_types::events::Notification;

pub const SECRET: &str = "test-secret";

/// Serves whatever page body the test last set for a URL.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, Result<Vec<u8>, FetchError>>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedFetcher {
    pub fn set(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(error));
    }

    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Unreachable(format!("no route to {url}"))))
    }
}

/// Records every notification; optionally fails every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn named(&self, name: &str) -> Vec<(String, Notification)> {
        self.sent()
            .into_iter()
            .filter(|(_, n)| n.name() == name)
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<(), NotifyError> {
        if *self.failing.lock().unwrap() {
            return Err(NotifyError::Transport("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), notification.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub kv: Arc<MemoryStore>,
    pub store: FeedStore,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub signer: Signer,
    pub lifecycle: Arc<FeedLifecycle>,
}

pub fn harness() -> Harness {
    harness_with(LifecycleConfig::default())
}

pub fn harness_with_policy(policy: UnverifiedPolicy) -> Harness {
    harness_with(LifecycleConfig {
        unverified: policy,
        ..LifecycleConfig::default()
    })
}

pub fn harness_with(config: LifecycleConfig) -> Harness {
    let kv = Arc::new(MemoryStore::new());
    let store = FeedStore::new(kv.clone());
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let signer = Signer::new(SECRET);
    let lifecycle = Arc::new(FeedLifecycle::new(
        store.clone(),
        signer.clone(),
        fetcher.clone(),
        notifier.clone(),
        config,
    ));
    Harness {
        kv,
        store,
        fetcher,
        notifier,
        signer,
        lifecycle,
    }
}
