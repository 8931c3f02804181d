//! ## 结果流消费者
//!
//! 消费组按需创建并在缺失时自愈。正常路径经消费组读取并在交付后确认，
//! 消费组缺失时降级为不经消费组的直接读取，所得事件带 `direct_read` 标记，
//! 不做确认，下游需按事件 Id 幂等处理。


use crate::{
    SENTINEL,
    config::StreamConfig,
    domain::{Broker, GroupRead, StreamEntry},
    errors::BrokerError,
    event::ProcessingEvent,
};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// 消费组状态
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// 未初始化，或初始化失败后复位
    Uninitialized = 0,
    /// 初始化进行中
    Initializing = 1,
    /// 消费组可用
    Ready = 2,
    /// 检测到消费组缺失，正在降级读取
    Degraded = 3,
}

impl GroupState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => GroupState::Initializing,
            2 => GroupState::Ready,
            3 => GroupState::Degraded,
            _ => GroupState::Uninitialized,
        }
    }
}

/// 结果流消费者
///
/// 状态字段是唯一的共享可变状态。并发的初始化允许竞争，
/// 每一步都把“已存在”视为成功，因此不需要互斥锁。
pub struct Consumer<B: Broker> {
    broker: B,
    cfg: StreamConfig,
    state: AtomicU8,
}

impl<B: Broker> Consumer<B> {
    /// 构造函数
    pub fn new(broker: B, cfg: StreamConfig) -> Self {
        Self {
            broker,
            cfg,
            state: AtomicU8::new(GroupState::Uninitialized as u8),
        }
    }

    /// 当前消费组状态
    pub fn state(&self) -> GroupState {
        GroupState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 消费组是否可用
    pub fn is_ready(&self) -> bool {
        self.state() == GroupState::Ready
    }

    /// 消费配置
    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    /// 中间件句柄
    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn transit(&self, state: GroupState) {
        let prev = self.state.swap(state as u8, Ordering::AcqRel);
        debug!("消费组状态 {:?} -> {state:?}", GroupState::from_u8(prev));
    }

    /// 确保消费组存在
    ///
    /// 已就绪时直接返回，可在每次读取前调用。失败时状态复位为未初始化并返回错误。
    #[instrument(
        name = "ensure_group",
        skip(self),
        fields(stream = %self.cfg.result_stream_key, group = %self.cfg.consumer_group)
    )]
    pub async fn ensure_group(&self) -> Result<(), BrokerError> {
        if self.is_ready() {
            return Ok(());
        }
        self.transit(GroupState::Initializing);
        match self.init_group().await {
            Ok(()) => {
                self.transit(GroupState::Ready);
                Ok(())
            }
            Err(e) => {
                self.transit(GroupState::Uninitialized);
                error!("初始化消费组失败：{e}");
                Err(e)
            }
        }
    }

    async fn init_group(&self) -> Result<(), BrokerError> {
        let key = self.cfg.result_stream_key.as_str();
        let group = self.cfg.consumer_group.as_str();

        let exists = self.broker.exists(key).await?;
        debug!("流存在：{exists}");
        if exists {
            match self.group_attached(key, group).await {
                Ok(true) => {
                    info!("消费组已挂载到流上");
                    return Ok(());
                }
                Ok(false) => info!("流上未找到消费组，开始创建"),
                Err(e) => warn!("获取流信息失败：{e}"),
            }
        } else {
            let id = self.broker.append(key, &[SENTINEL]).await?;
            info!("写入占位消息 {id}，物化结果流");
        }

        match self.broker.destroy_group(key, group).await {
            Ok(true) => info!("销毁残留的消费组"),
            Ok(false) => debug!("无残留的消费组"),
            Err(BrokerError::GroupMissing(e)) => debug!("无残留的消费组：{e}"),
            // 流可能在检查后被删除，交由 MKSTREAM 创建决定结果
            Err(e) => warn!("销毁消费组失败，继续创建：{e}"),
        }

        match self.broker.create_group(key, group, "0").await {
            Ok(()) => info!("自流起点创建消费组"),
            Err(BrokerError::GroupExists(e)) => info!("消费组已由其他实例创建：{e}"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn group_attached(&self, key: &str, group: &str) -> Result<bool, BrokerError> {
        let info = self.broker.stream_info(key).await?;
        debug!(
            length = info.length,
            groups = info.groups,
            last_id = %info.last_generated_id,
            "获取流信息"
        );
        let groups = self.broker.groups(key).await?;
        Ok(groups.iter().any(|g| g == group))
    }

    /// 消费一批处理结果
    ///
    /// 不返回错误：空结果表示暂无可用消息，调用方稍后再次轮询即可。
    #[instrument(
        name = "consume_results",
        skip(self),
        fields(stream = %self.cfg.result_stream_key, consumer = %self.cfg.consumer_name)
    )]
    pub async fn consume(&self) -> Vec<ProcessingEvent> {
        if !self.is_ready() && self.ensure_group().await.is_err() {
            warn!("消费组尚未初始化，跳过本次消费");
            return Vec::new();
        }

        match self.read_batch().await {
            Ok(events) => events,
            Err(BrokerError::GroupMissing(e)) => {
                warn!("消费组不存在：{e}，强制重新初始化");
                self.degrade().await
            }
            Err(e) => {
                error!("消费结果流失败：{e}");
                Vec::new()
            }
        }
    }

    async fn read_batch(&self) -> Result<Vec<ProcessingEvent>, BrokerError> {
        let key = self.cfg.result_stream_key.as_str();
        if !self.broker.exists(key).await? {
            debug!("结果流尚不存在，等待生产者发布结果");
            return Ok(Vec::new());
        }

        let mut read = GroupRead {
            group: &self.cfg.consumer_group,
            consumer: &self.cfg.consumer_name,
            cursor: "0",
            count: self.cfg.batch,
            block: None,
        };
        let mut entries = self.broker.read_group(key, read).await?;
        if entries.is_empty() {
            read.cursor = ">";
            read.block = Some(self.cfg.block());
            entries = self.broker.read_group(key, read).await?;
        } else {
            info!("重新投递 {} 条待确认消息", entries.len());
        }
        if entries.is_empty() {
            debug!("没有新消息");
            return Ok(Vec::new());
        }

        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        let events = into_events(entries, false);
        debug!("消费 {} 条消息", events.len());

        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        match self.broker.ack(key, &self.cfg.consumer_group, &ids).await {
            Ok(n) => debug!("确认 {n} 条消息"),
            Err(e) => warn!("确认消息失败，待下次重新投递：{e}"),
        }
        Ok(events)
    }

    async fn degrade(&self) -> Vec<ProcessingEvent> {
        self.transit(GroupState::Degraded);
        let mut events = self.direct_read("$").await;
        if events.is_empty() {
            events = self.direct_read("0").await;
        }
        if let Err(e) = self.ensure_group().await {
            warn!("降级后重建消费组失败，下次消费重试：{e}");
        }
        events
    }

    async fn direct_read(&self, cursor: &str) -> Vec<ProcessingEvent> {
        match self
            .broker
            .read(&self.cfg.result_stream_key, cursor, self.cfg.batch)
            .await
        {
            Ok(entries) => {
                let events = into_events(entries, true);
                debug!("游标 {cursor} 直接读取 {} 条消息", events.len());
                events
            }
            Err(e) => {
                warn!("游标 {cursor} 直接读取失败：{e}");
                Vec::new()
            }
        }
    }
}

fn into_events(entries: Vec<StreamEntry>, direct_read: bool) -> Vec<ProcessingEvent> {
    entries
        .into_iter()
        .filter_map(|entry| {
            if entry.fields.is_empty() {
                warn!("消息 {} 无可用内容，跳过", entry.id);
                None
            } else {
                Some(ProcessingEvent::from_entry(entry, direct_read))
            }
        })
        .collect()
}
