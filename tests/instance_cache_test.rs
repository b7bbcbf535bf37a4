//! 实例缓存集成测试
//!
//! 使用暂停的 tokio 时钟控制缓存过期。

mod common;

use common::{CountingDirectory, directory_with, three_instances};
use flare_discovery_client::InstanceCache;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

fn cache_over(directory: &Arc<CountingDirectory>, ttl: Duration) -> Arc<InstanceCache> {
    Arc::new(InstanceCache::new(directory.clone(), ttl, 16))
}

#[tokio::test(start_paused = true)]
async fn fresh_entry_is_served_without_directory_call() {
    let directory = directory_with("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_millis(100));

    assert_eq!(cache.get("order").await.len(), 3);
    assert_eq!(directory.calls(), 1);

    tokio::time::advance(Duration::from_millis(50)).await;
    directory.set("order", three_instances()[..1].to_vec()).await;

    tokio::time::advance(Duration::from_millis(30)).await;
    assert_eq!(cache.get("order").await.len(), 3);
    assert_eq!(directory.calls(), 1);

    tokio::time::advance(Duration::from_millis(70)).await;
    assert_eq!(cache.get("order").await.len(), 1);
    assert_eq!(directory.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_gets_share_a_single_load() {
    let directory = Arc::new(CountingDirectory::new().with_delay(Duration::from_millis(10)));
    directory.set("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_secs(1));

    let results = join_all((0..50).map(|_| cache.get("order"))).await;
    assert!(results.iter().all(|list| list.len() == 3));
    assert_eq!(directory.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;

    let results = join_all((0..50).map(|_| cache.get("order"))).await;
    assert!(results.iter().all(|list| list.len() == 3));
    assert_eq!(directory.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_gets_share_a_failed_load() {
    let directory = Arc::new(CountingDirectory::new().with_delay(Duration::from_millis(100)));
    directory.set("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_secs(1));
    assert_eq!(cache.get("order").await.len(), 3);

    directory.set_failing(true);
    tokio::time::advance(Duration::from_secs(2)).await;

    let started = tokio::time::Instant::now();
    let results = join_all((0..50).map(|_| cache.get("order"))).await;
    assert!(results.iter().all(|list| list.len() == 3));
    assert_eq!(directory.calls(), 2);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn stale_entry_is_served_when_directory_fails() {
    let directory = directory_with("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_millis(100));
    assert_eq!(cache.get("order").await.len(), 3);

    directory.set_failing(true);
    tokio::time::advance(Duration::from_millis(200)).await;

    assert_eq!(cache.get("order").await.len(), 3);
    assert_eq!(directory.calls(), 2);
    let entry = cache.entry("order").unwrap();
    assert!(entry.is_expired(tokio::time::Instant::now()));
    // 加载失败不会刷新时间戳，下一次访问仍会尝试加载
    assert_eq!(cache.get("order").await.len(), 3);
    assert_eq!(directory.calls(), 3);

    directory.set_failing(false);
    directory.set("order", three_instances()[..1].to_vec()).await;
    assert_eq!(cache.get("order").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_or_failing_without_cache_yields_empty() {
    let directory = Arc::new(CountingDirectory::new());
    let cache = cache_over(&directory, Duration::from_secs(30));

    assert!(cache.get("missing").await.is_empty());

    directory.set_failing(true);
    assert!(cache.get("payment").await.is_empty());
    assert!(cache.peek("payment").is_none());
}

#[tokio::test(start_paused = true)]
async fn peek_and_invalidate() {
    let directory = directory_with("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_secs(30));

    assert!(cache.peek("order").is_none());
    cache.get("order").await;
    assert_eq!(cache.peek("order").map(|list| list.len()), Some(3));
    assert_eq!(directory.calls(), 1);

    cache.invalidate("order");
    assert!(cache.peek("order").is_none());
    cache.get("order").await;
    assert_eq!(directory.calls(), 2);
    assert_eq!(cache.services(), vec!["order".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn refresh_task_reloads_known_services() {
    let directory = directory_with("order", three_instances()).await;
    let cache = cache_over(&directory, Duration::from_secs(30));
    cache.get("order").await;

    let handle = cache.start_refresh_task(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(directory.calls(), 2);

    directory.set("order", three_instances()[..2].to_vec()).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(cache.peek("order").map(|list| list.len()), Some(2));

    handle.abort();
}
