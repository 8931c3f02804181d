#![allow(dead_code)]

use redis::aio::MultiplexedConnection;
use resq::Consumer;
use resq_redis::{RedisBroker, app::connect, config::RedisConfig};
use std::sync::LazyLock;
use tracing::{Level, info};
use tracing_subscriber::fmt;
use uuid::Uuid;

pub(crate) static CFG: LazyLock<RedisConfig> = LazyLock::new(|| {
    fmt().with_test_writer().with_max_level(Level::DEBUG).init();
    info!("启用 {} 测试日志输出", Level::DEBUG);
    RedisConfig::load().unwrap()
});

/// 每个测试独占一条结果流
pub(crate) fn config() -> RedisConfig {
    let mut cfg = CFG.clone();
    cfg.stream.result_stream_key = format!("resq-test:{}", Uuid::new_v4());
    cfg.stream.consumer_group = format!("group-{}", Uuid::new_v4().simple());
    cfg
}

pub(crate) async fn consumer(cfg: &RedisConfig) -> Consumer<RedisBroker> {
    connect(cfg).await.unwrap()
}

pub(crate) async fn raw(cfg: &RedisConfig) -> MultiplexedConnection {
    let url = format!("redis://{}:{}/{}", cfg.host, cfg.port, cfg.db);
    redis::Client::open(url)
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

pub(crate) async fn produce(conn: &mut MultiplexedConnection, key: &str, video: &str) -> String {
    redis::cmd("XADD")
        .arg(key)
        .arg("*")
        .arg("video")
        .arg(video)
        .arg("status")
        .arg("done")
        .query_async(conn)
        .await
        .unwrap()
}

pub(crate) async fn destroy_group(conn: &mut MultiplexedConnection, key: &str, group: &str) {
    let _: i64 = redis::cmd("XGROUP")
        .arg("DESTROY")
        .arg(key)
        .arg(group)
        .query_async(conn)
        .await
        .unwrap();
}

pub(crate) async fn cleanup(conn: &mut MultiplexedConnection, key: &str) {
    let _: i64 = redis::cmd("DEL").arg(key).query_async(conn).await.unwrap();
}
