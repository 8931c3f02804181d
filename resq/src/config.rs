//! # **resq** 配置

use crate::errors::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, de::DeserializeOwned};
use std::{path::PathBuf, time::Duration};
use uuid::Uuid;
use validator::Validate;

/// 构建分层配置
///
/// 依次叠加 `config/default`、`config/<RESQ_ENV>` 与 `REDIS_` 前缀的环境变量，
/// 配置根目录可由 `RESQ_CONFIG_ROOT` 覆盖。
pub fn build_config(crate_dir: PathBuf) -> Result<Config, ConfigError> {
    let config_root = std::env::var("RESQ_CONFIG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| crate_dir.join("config"));
    let env = std::env::var("RESQ_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = Config::builder()
        .add_source(File::from(config_root.join("default")).required(false))
        .add_source(File::from(config_root.join(env)).required(false))
        .add_source(
            Environment::with_prefix("REDIS")
                .prefix_separator("_")
                .try_parsing(true),
        )
        .build()?;
    Ok(config)
}

/// 反序列化并验证配置
pub fn load_validated<T>(config: &Config, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let cfg = config.clone().try_deserialize::<T>()?;
    cfg.validate().map_err(|e| ConfigError::ValidationError {
        section: section.to_string(),
        message: e.to_string(),
    })?;
    Ok(cfg)
}

/// 结果流消费配置
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct StreamConfig {
    /// 消费组名称
    #[validate(length(min = 1))]
    pub consumer_group: String,
    /// 消费者标识
    #[validate(length(min = 1))]
    pub consumer_name: String,
    /// 结果流键
    #[validate(length(min = 1))]
    pub result_stream_key: String,
    /// 单批上限
    #[validate(range(min = 1))]
    pub batch: usize,
    /// 组读取阻塞毫秒数
    pub block_ms: u64,
}

impl StreamConfig {
    /// 从分层配置加载
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        load_validated(config, "stream")
    }

    /// 组读取阻塞时长
    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            consumer_group: String::new(),
            consumer_name: format!("resq-{}", Uuid::new_v4().simple()),
            result_stream_key: String::new(),
            batch: 10,
            block_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> Config {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let cfg = StreamConfig::load(&source(&[
            ("consumer_group", "video-results"),
            ("result_stream_key", "video:results"),
        ]))
        .unwrap();
        assert_eq!(cfg.batch, 10);
        assert_eq!(cfg.block(), Duration::from_secs(1));
        assert!(cfg.consumer_name.starts_with("resq-"));
    }

    #[test]
    fn test_config_explicit() {
        let cfg = StreamConfig::load(&source(&[
            ("consumer_group", "g"),
            ("consumer_name", "admin-1"),
            ("result_stream_key", "s"),
            ("batch", "25"),
            ("block_ms", "200"),
        ]))
        .unwrap();
        assert_eq!(cfg.consumer_name, "admin-1");
        assert_eq!(cfg.batch, 25);
        assert_eq!(cfg.block_ms, 200);
    }

    #[test]
    fn test_config_missing_group() {
        let result = StreamConfig::load(&source(&[("result_stream_key", "s")]));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_config_zero_batch() {
        let result = StreamConfig::load(&source(&[
            ("consumer_group", "g"),
            ("result_stream_key", "s"),
            ("batch", "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }
}
