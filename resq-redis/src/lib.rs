//! # **resq** 的 Redis 实现
//!
//! 基于连接管理器的 Redis Streams 中间件，以及进程级结果流消费者。

#![warn(missing_docs)]

pub(crate) mod decode;

pub mod app;
pub mod broker;
pub mod config;
pub mod errors;

pub use app::consumer;
pub use broker::RedisBroker;
