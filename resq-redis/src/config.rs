//! Redis 配置

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use resq::{
    config::{StreamConfig, build_config, load_validated},
    errors::ConfigError,
};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use validator::Validate;

/// Redis 连接与结果流配置
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct RedisConfig {
    /// 主机名
    #[validate(length(min = 1))]
    pub host: String,
    /// 端口
    #[validate(range(min = 1))]
    pub port: u16,
    /// 密码，空串视为无密码
    pub password: Option<String>,
    /// 数据库编号
    pub db: i64,
    /// 连接管理器重连次数
    pub retries: usize,
    /// 建立连接的超时毫秒数
    pub connect_timeout_ms: u64,
    /// 结果流消费配置，由同一配置源单独加载
    #[serde(skip)]
    pub stream: StreamConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            retries: 6,
            connect_timeout_ms: 1000,
            stream: StreamConfig::default(),
        }
    }
}

impl RedisConfig {
    /// 从配置文件与 `REDIS_` 环境变量加载
    pub fn load() -> Result<Self, ConfigError> {
        let config = build_config(PathBuf::from(env!("CARGO_MANIFEST_DIR")))?;
        Self::from_config(&config)
    }

    pub(crate) fn from_config(config: &config::Config) -> Result<Self, ConfigError> {
        let mut cfg: RedisConfig = load_validated(config, "redis")?;
        cfg.stream = StreamConfig::load(config)?;
        Ok(cfg)
    }

    pub(crate) fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        }
    }

    /// 应答超时需长于组读取的阻塞时长
    pub(crate) fn response_timeout(&self) -> Duration {
        self.stream.block() + Duration::from_secs(2)
    }
}
