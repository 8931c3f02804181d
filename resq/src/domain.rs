//! # **resq** 特征

use crate::errors::BrokerError;
use std::{future::Future, time::Duration};

/// 流消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// 中间件分配的消息 Id
    pub id: String,
    /// 按原始顺序排列的字段值对，空表示消息体无法使用
    pub fields: Vec<(String, String)>,
}

impl StreamEntry {
    /// 构造函数
    pub fn new(id: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// 流概要信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    /// 消息数量
    pub length: usize,
    /// 消费组数量
    pub groups: usize,
    /// 最近生成的消息 Id
    pub last_generated_id: String,
}

/// 组读取参数
#[derive(Debug, Clone, Copy)]
pub struct GroupRead<'a> {
    /// 消费组
    pub group: &'a str,
    /// 消费者标识
    pub consumer: &'a str,
    /// 游标，`>` 读取新消息，`0` 读取本消费者的待确认消息
    pub cursor: &'a str,
    /// 单批上限
    pub count: usize,
    /// 阻塞等待时长
    pub block: Option<Duration>,
}

/// 消息中间件特征
///
/// 每个方法对应一条中间件命令，错误在实现内部分类为 [`BrokerError`]。
pub trait Broker: Send + Sync + 'static {
    /// 流是否存在
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, BrokerError>> + Send;
    /// 查询流概要信息
    fn stream_info(&self, key: &str)
    -> impl Future<Output = Result<StreamInfo, BrokerError>> + Send;
    /// 查询流上的消费组名称
    fn groups(&self, key: &str) -> impl Future<Output = Result<Vec<String>, BrokerError>> + Send;
    /// 追加消息，返回自动生成的 Id
    fn append(
        &self,
        key: &str,
        fields: &[(&str, &str)],
    ) -> impl Future<Output = Result<String, BrokerError>> + Send;
    /// 销毁消费组，返回是否确有销毁
    fn destroy_group(
        &self,
        key: &str,
        group: &str,
    ) -> impl Future<Output = Result<bool, BrokerError>> + Send;
    /// 自指定位置创建消费组，流不存在时一并创建
    fn create_group(
        &self,
        key: &str,
        group: &str,
        start: &str,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;
    /// 经消费组读取
    fn read_group(
        &self,
        key: &str,
        read: GroupRead<'_>,
    ) -> impl Future<Output = Result<Vec<StreamEntry>, BrokerError>> + Send;
    /// 确认消息，返回确认数量
    fn ack(
        &self,
        key: &str,
        group: &str,
        ids: &[&str],
    ) -> impl Future<Output = Result<u64, BrokerError>> + Send;
    /// 不经消费组直接读取
    fn read(
        &self,
        key: &str,
        cursor: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<StreamEntry>, BrokerError>> + Send;
}
