//! # **resq** 测试工具

mod memory;

pub use memory::{Fault, MemoryBroker};
