mod common;

use std::sync::Arc;
use std::time::Duration;

use common::harness;
use freed_core::Scheduler;
use freed_types::feed::NewFeed;

#[tokio::test]
async fn tracks_index_membership() {
    let h = harness();
    h.fetcher.set("https://example.com/a", "a");
    h.fetcher.set("https://example.com/b", "b");

    let a = h
        .lifecycle
        .create(NewFeed::new("https://example.com/a", "a@b.com", None).unwrap())
        .await
        .unwrap();
    let b = h
        .lifecycle
        .create(NewFeed::new("https://example.com/b", "a@b.com", None).unwrap())
        .await
        .unwrap();

    let scheduler = Arc::new(Scheduler::new(h.lifecycle.clone(), Duration::from_secs(60)));
    assert_eq!(scheduler.reconcile().await.unwrap(), 2);
    assert_eq!(scheduler.reconcile().await.unwrap(), 0);

    let mut expected = vec![a.id.clone(), b.id.clone()];
    expected.sort();
    assert_eq!(scheduler.active().await, expected);

    let sig = h.signer.sign(&a.id);
    h.lifecycle.destroy(&a.id, Some(&sig)).await.unwrap();
    scheduler.reconcile().await.unwrap();
    assert_eq!(scheduler.active().await, vec![b.id.clone()]);

    scheduler.shutdown().await;
    assert!(scheduler.active().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn polls_on_each_feed_cadence() {
    let h = harness();
    let url = "https://example.com/a";
    h.fetcher.set(url, "v1");
    let feed = h
        .lifecycle
        .create(NewFeed::new(url, "a@b.com", Some(1)).unwrap())
        .await
        .unwrap();

    let scheduler = Arc::new(Scheduler::new(h.lifecycle.clone(), Duration::from_secs(3600)));
    scheduler.reconcile().await.unwrap();

    h.fetcher.set(url, "v2");
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(h.notifier.named("feed_updated").len(), 1);

    h.fetcher.set(url, "v3");
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.notifier.named("feed_updated").len(), 2);

    let stored = h.store.get(&feed.id).await.unwrap().unwrap();
    assert_eq!(stored.content_text().as_deref(), Some("v3"));
    scheduler.shutdown().await;
}
