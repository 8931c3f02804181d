//! Redis 消费者错误

use resq::errors::{BrokerError, ConfigError};
use thiserror::Error;

/// 构建进程级消费者时的错误
#[derive(Debug, Error)]
pub enum RedisAppError {
    /// 加载或验证配置失败
    #[error("配置错误：{0}")]
    Config(#[from] ConfigError),
    /// 建立 Redis 连接失败
    #[error("连接错误：{0}")]
    Broker(#[from] BrokerError),
}
