//! # **resq** 核心库
//!
//! 基于消费组的结果流消费：惰性创建并自愈消费组，按批拉取新消息，
//! 交付后确认，消费组缺失时降级为直接读取。

#![warn(missing_docs)]

mod response;

pub mod config;
pub mod consumer;
pub mod domain;
pub mod errors;
pub mod event;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use consumer::{Consumer, GroupState};
pub use event::ProcessingEvent;
pub use response::ConsumeResponse;

/// 占位消息字段，用于在流不存在时物化空流
pub const SENTINEL: (&str, &str) = ("init", "true");
