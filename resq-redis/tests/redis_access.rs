mod common;

use common::*;
use resq::{GroupState, domain::Broker};

#[tokio::test]
#[ignore = "仅用于测试Redis连接与消费组基础操作"]
async fn ensure_group_creates_stream_and_group() {
    let cfg = config();
    let consumer = consumer(&cfg).await;
    let mut conn = raw(&cfg).await;

    consumer.ensure_group().await.unwrap();

    let key = &cfg.stream.result_stream_key;
    assert!(consumer.is_ready());
    assert!(consumer.broker().exists(key).await.unwrap());
    let groups = consumer.broker().groups(key).await.unwrap();
    assert_eq!(groups, vec![cfg.stream.consumer_group.clone()]);
    cleanup(&mut conn, key).await;
}

#[tokio::test]
#[ignore = "仅用于测试Redis连接与消费组基础操作"]
async fn consume_in_production_order() {
    let cfg = config();
    let key = cfg.stream.result_stream_key.clone();
    let mut conn = raw(&cfg).await;
    let a = produce(&mut conn, &key, "a").await;
    let b = produce(&mut conn, &key, "b").await;
    let consumer = consumer(&cfg).await;

    let events = consumer.consume().await;

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![a.as_str(), b.as_str()]);
    assert_eq!(events[0].get("video"), Some("a"));
    assert!(consumer.consume().await.is_empty());
    cleanup(&mut conn, &key).await;
}

#[tokio::test]
#[ignore = "仅用于测试Redis连接与消费组基础操作"]
async fn consume_recovers_from_dropped_group() {
    let cfg = config();
    let key = cfg.stream.result_stream_key.clone();
    let mut conn = raw(&cfg).await;
    let consumer = consumer(&cfg).await;
    consumer.ensure_group().await.unwrap();
    consumer.consume().await;
    let id = produce(&mut conn, &key, "v1").await;
    destroy_group(&mut conn, &key, &cfg.stream.consumer_group).await;

    let events = consumer.consume().await;

    assert!(events.iter().all(|e| e.direct_read));
    assert!(events.iter().any(|e| e.id == id));
    assert_eq!(consumer.state(), GroupState::Ready);
    let next = consumer.consume().await;
    assert!(next.iter().all(|e| !e.direct_read));
    cleanup(&mut conn, &key).await;
}

#[tokio::test]
#[ignore = "仅用于测试Redis连接与消费组基础操作"]
async fn consume_without_stream_is_empty() {
    let cfg = config();
    let key = cfg.stream.result_stream_key.clone();
    let mut conn = raw(&cfg).await;
    let consumer = consumer(&cfg).await;
    consumer.ensure_group().await.unwrap();
    cleanup(&mut conn, &key).await;

    assert!(consumer.consume().await.is_empty());
}
