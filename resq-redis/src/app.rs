//! Redis 消费者上下文

use crate::{broker::RedisBroker, config::RedisConfig, errors::RedisAppError};
use resq::Consumer;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static CONSUMER: OnceCell<Arc<Consumer<RedisBroker>>> = OnceCell::const_new();

/// 进程级结果流消费者
///
/// 首次调用时加载配置并建立连接，此后复用同一连接。构造失败不缓存，下次调用重试。
pub async fn consumer() -> Result<Arc<Consumer<RedisBroker>>, RedisAppError> {
    CONSUMER
        .get_or_try_init(|| async {
            let cfg = RedisConfig::load()?;
            let consumer = connect(&cfg).await?;
            Ok::<_, RedisAppError>(Arc::new(consumer))
        })
        .await
        .map(Arc::clone)
}

/// 按给定配置建立消费者
pub async fn connect(cfg: &RedisConfig) -> Result<Consumer<RedisBroker>, RedisAppError> {
    let broker = RedisBroker::connect(cfg).await?;
    info!(
        stream = %cfg.stream.result_stream_key,
        group = %cfg.stream.consumer_group,
        consumer = %cfg.stream.consumer_name,
        "创建结果流消费者"
    );
    Ok(Consumer::new(broker, cfg.stream.clone()))
}
