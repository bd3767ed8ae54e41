use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use freed_db::StoreError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::{FeedLifecycle, PollOutcome};

/// Runs one polling task per live feed.
///
/// A periodic rescan of the index starts tasks for new feeds and stops the
/// ones whose feed is gone. A task also ends by itself once a poll reports
/// the feed missing.
pub struct Scheduler {
    lifecycle: Arc<FeedLifecycle>,
    rescan: Duration,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(lifecycle: Arc<FeedLifecycle>, rescan: Duration) -> Self {
        Self {
            lifecycle,
            rescan,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.rescan);

        loop {
            interval.tick().await;

            match self.reconcile().await {
                Ok(started) => {
                    if started > 0 {
                        info!("Scheduler: started polling {} feeds", started);
                    }
                }
                Err(e) => {
                    warn!("Scheduler rescan error: {}", e);
                }
            }
        }
    }

    /// Bring the task set in line with the index. Returns how many tasks were started.
    pub async fn reconcile(&self) -> Result<usize, StoreError> {
        let live: HashSet<String> = self.lifecycle.store().ids().await?.into_iter().collect();
        let mut tasks = self.tasks.lock().await;

        tasks.retain(|id, handle| {
            let keep = live.contains(id) && !handle.is_finished();
            if !keep {
                handle.abort();
            }
            keep
        });

        let mut started = 0;
        for id in live {
            if tasks.contains_key(&id) {
                continue;
            }
            let handle = tokio::spawn(poll_loop(self.lifecycle.clone(), id.clone()));
            tasks.insert(id, handle);
            started += 1;
        }
        Ok(started)
    }

    /// Ids with a running polling task.
    pub async fn active(&self) -> Vec<String> {
        let tasks = self.tasks.lock().await;
        let mut ids: Vec<String> = tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

async fn poll_loop(lifecycle: Arc<FeedLifecycle>, id: String) {
    let feed = match lifecycle.get(&id).await {
        Ok(Some(feed)) => feed,
        Ok(None) => return,
        Err(e) => {
            warn!("Scheduler could not load feed {}: {}", id, e);
            return;
        }
    };

    let period = Duration::from_secs(u64::from(feed.frequency) * 60);
    let mut delay = first_delay(feed.last_checked, chrono::Utc::now().timestamp(), period);
    debug!("Feed {} first poll in {:?}, then every {:?}", id, delay, period);

    loop {
        tokio::time::sleep(delay).await;
        delay = period;

        match lifecycle.poll(&id).await {
            Ok(PollOutcome::NotFound) => {
                debug!("Feed {} gone; stopping its poller", id);
                return;
            }
            Ok(_) => {}
            Err(e) => warn!("Poll of feed {} hit a store error: {}", id, e),
        }
    }
}

/// Time until the next poll is due, never longer than one period.
fn first_delay(last_checked: i64, now: i64, period: Duration) -> Duration {
    let elapsed = u64::try_from(now.saturating_sub(last_checked)).unwrap_or(0);
    period.saturating_sub(Duration::from_secs(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_respects_last_check() {
        let period = Duration::from_secs(300);
        assert_eq!(first_delay(1000, 1000, period), period);
        assert_eq!(first_delay(1000, 1100, period), Duration::from_secs(200));
        assert_eq!(first_delay(1000, 5000, period), Duration::ZERO);
        // Clock skew: a last_checked in the future waits one period at most.
        assert_eq!(first_delay(9000, 1000, period), period);
    }
}
