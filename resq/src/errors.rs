//! # **resq** 错误定义

use thiserror::Error;

/// 消息中间件错误枚举
///
/// 在中间件客户端边界完成分类，核心逻辑只按枚举分支处理。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// 消费组或其所属的流不存在
    #[error("消费组不存在：{0}")]
    GroupMissing(String),
    /// 消费组已存在
    #[error("消费组已存在：{0}")]
    GroupExists(String),
    /// 其他错误，含连接错误
    #[error("消息中间件错误：{0}")]
    Other(String),
}

impl From<&str> for BrokerError {
    fn from(s: &str) -> Self {
        BrokerError::Other(s.to_owned())
    }
}

/// 配置错误枚举
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 加载配置源失败
    #[error("加载配置失败：{0}")]
    Load(#[from] config::ConfigError),
    /// 配置验证失败
    #[error("配置'{section}'验证失败：{message}")]
    ValidationError {
        /// 配置节
        section: String,
        /// 验证信息
        message: String,
    },
}
