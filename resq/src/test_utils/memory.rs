use crate::{
    domain::{Broker, GroupRead, StreamEntry, StreamInfo},
    errors::BrokerError,
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::task::yield_now;

/// 注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// 所有命令均失败，模拟中间件不可达
    Unreachable,
    /// 创建消费组失败
    CreateFails,
    /// 确认消息失败
    AckFails,
    /// 直接读取失败
    DirectReadFails,
    /// 组读取时崩溃
    PanicOnRead,
}

#[derive(Default)]
struct Group {
    last_delivered: u64,
    pending: BTreeMap<u64, String>,
}

#[derive(Default)]
struct Stream {
    entries: Vec<(u64, Vec<(String, String)>)>,
    groups: HashMap<String, Group>,
}

#[derive(Default)]
struct State {
    seq: u64,
    streams: HashMap<String, Stream>,
    faults: HashSet<Fault>,
    creates: usize,
}

/// 内存消息中间件
///
/// 按 Redis Streams 的消费组语义建模，每条命令前让出一次执行权，
/// 以便并发任务在命令之间交错。
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
}

fn entry_id(seq: u64) -> String {
    format!("{seq}-0")
}

fn parse_id(id: &str) -> Option<u64> {
    id.split('-').next()?.parse().ok()
}

fn to_entry(seq: u64, fields: &[(String, String)]) -> StreamEntry {
    StreamEntry::new(entry_id(seq), fields.to_vec())
}

impl MemoryBroker {
    /// 构造函数
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn enter(&self) -> Result<MutexGuard<'_, State>, BrokerError> {
        yield_now().await;
        let state = self.lock();
        if state.faults.contains(&Fault::Unreachable) {
            return Err("Connection refused".into());
        }
        Ok(state)
    }

    /// 注入故障
    pub fn inject(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    /// 清除故障
    pub fn clear(&self, fault: Fault) {
        self.lock().faults.remove(&fault);
    }

    /// 外部追加消息
    pub fn produce(&self, key: &str, fields: &[(&str, &str)]) -> String {
        let mut state = self.lock();
        state.seq += 1;
        let seq = state.seq;
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        state
            .streams
            .entry(key.to_string())
            .or_default()
            .entries
            .push((seq, fields));
        entry_id(seq)
    }

    /// 外部销毁消费组
    pub fn drop_group(&self, key: &str, group: &str) -> bool {
        self.lock()
            .streams
            .get_mut(key)
            .is_some_and(|s| s.groups.remove(group).is_some())
    }

    /// 外部删除单条消息，待确认列表保持不变
    pub fn delete(&self, key: &str, id: &str) -> bool {
        let Some(seq) = parse_id(id) else {
            return false;
        };
        let mut state = self.lock();
        let Some(stream) = state.streams.get_mut(key) else {
            return false;
        };
        let before = stream.entries.len();
        stream.entries.retain(|(s, _)| *s != seq);
        stream.entries.len() < before
    }

    /// 外部删除流
    pub fn drop_stream(&self, key: &str) -> bool {
        self.lock().streams.remove(key).is_some()
    }

    /// 流上的消费组名称
    pub fn group_names(&self, key: &str) -> Vec<String> {
        self.lock()
            .streams
            .get(key)
            .map(|s| s.groups.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 消费组的待确认消息数
    pub fn pending(&self, key: &str, group: &str) -> Option<usize> {
        self.lock()
            .streams
            .get(key)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.pending.len())
    }

    /// 流上的消息数
    pub fn len(&self, key: &str) -> usize {
        self.lock().streams.get(key).map_or(0, |s| s.entries.len())
    }

    /// 成功创建消费组的次数
    pub fn creates(&self) -> usize {
        self.lock().creates
    }
}

impl Broker for MemoryBroker {
    async fn exists(&self, key: &str) -> Result<bool, BrokerError> {
        let state = self.enter().await?;
        Ok(state.streams.contains_key(key))
    }

    async fn stream_info(&self, key: &str) -> Result<StreamInfo, BrokerError> {
        let state = self.enter().await?;
        let stream = state.streams.get(key).ok_or("ERR no such key")?;
        Ok(StreamInfo {
            length: stream.entries.len(),
            groups: stream.groups.len(),
            last_generated_id: stream
                .entries
                .last()
                .map(|(seq, _)| entry_id(*seq))
                .unwrap_or_else(|| "0-0".to_string()),
        })
    }

    async fn groups(&self, key: &str) -> Result<Vec<String>, BrokerError> {
        let state = self.enter().await?;
        let stream = state.streams.get(key).ok_or("ERR no such key")?;
        Ok(stream.groups.keys().cloned().collect())
    }

    async fn append(&self, key: &str, fields: &[(&str, &str)]) -> Result<String, BrokerError> {
        drop(self.enter().await?);
        Ok(self.produce(key, fields))
    }

    async fn destroy_group(&self, key: &str, group: &str) -> Result<bool, BrokerError> {
        let mut state = self.enter().await?;
        let stream = state
            .streams
            .get_mut(key)
            .ok_or("ERR The XGROUP subcommand requires the key to exist")?;
        Ok(stream.groups.remove(group).is_some())
    }

    async fn create_group(&self, key: &str, group: &str, start: &str) -> Result<(), BrokerError> {
        let mut state = self.enter().await?;
        if state.faults.contains(&Fault::CreateFails) {
            return Err("ERR Invalid stream ID specified as stream command argument".into());
        }
        let stream = state.streams.entry(key.to_string()).or_default();
        if stream.groups.contains_key(group) {
            return Err(BrokerError::GroupExists(
                "BUSYGROUP Consumer Group name already exists".to_string(),
            ));
        }
        let last_delivered = match start {
            "$" => stream.entries.last().map_or(0, |(seq, _)| *seq),
            id => parse_id(id).ok_or("ERR Invalid stream ID")?,
        };
        stream.groups.insert(
            group.to_string(),
            Group {
                last_delivered,
                pending: BTreeMap::new(),
            },
        );
        state.creates += 1;
        Ok(())
    }

    async fn read_group(
        &self,
        key: &str,
        read: GroupRead<'_>,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let mut state = self.enter().await?;
        if state.faults.contains(&Fault::PanicOnRead) {
            panic!("组读取崩溃");
        }
        let missing = || {
            BrokerError::GroupMissing(format!(
                "NOGROUP No such key '{key}' or consumer group '{}'",
                read.group
            ))
        };
        let stream = state.streams.get_mut(key).ok_or_else(missing)?;
        let Stream { entries, groups } = stream;
        let group = groups.get_mut(read.group).ok_or_else(missing)?;

        if read.cursor == ">" {
            let batch: Vec<StreamEntry> = entries
                .iter()
                .filter(|(seq, _)| *seq > group.last_delivered)
                .take(read.count)
                .map(|(seq, fields)| to_entry(*seq, fields))
                .collect();
            for entry in &batch {
                if let Some(seq) = parse_id(&entry.id) {
                    group.last_delivered = seq;
                    group.pending.insert(seq, read.consumer.to_string());
                }
            }
            return Ok(batch);
        }

        let after = parse_id(read.cursor).unwrap_or(0);
        Ok(group
            .pending
            .iter()
            .filter(|(seq, owner)| **seq > after && owner.as_str() == read.consumer)
            .take(read.count)
            .map(|(seq, _)| {
                entries
                    .iter()
                    .find(|(s, _)| s == seq)
                    .map(|(s, fields)| to_entry(*s, fields))
                    .unwrap_or_else(|| StreamEntry::new(entry_id(*seq), Vec::new()))
            })
            .collect())
    }

    async fn ack(&self, key: &str, group: &str, ids: &[&str]) -> Result<u64, BrokerError> {
        let mut state = self.enter().await?;
        if state.faults.contains(&Fault::AckFails) {
            return Err("Connection reset by peer".into());
        }
        let Some(group) = state
            .streams
            .get_mut(key)
            .and_then(|s| s.groups.get_mut(group))
        else {
            return Ok(0);
        };
        let acked = ids
            .iter()
            .filter_map(|id| parse_id(id))
            .filter(|seq| group.pending.remove(seq).is_some())
            .count();
        Ok(acked as u64)
    }

    async fn read(
        &self,
        key: &str,
        cursor: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let state = self.enter().await?;
        if state.faults.contains(&Fault::DirectReadFails) {
            return Err("ERR direct read refused".into());
        }
        let Some(stream) = state.streams.get(key) else {
            return Ok(Vec::new());
        };
        if cursor == "$" {
            return Ok(Vec::new());
        }
        let after = parse_id(cursor).ok_or("ERR Invalid stream ID")?;
        Ok(stream
            .entries
            .iter()
            .filter(|(seq, _)| *seq > after)
            .take(count)
            .map(|(seq, fields)| to_entry(*seq, fields))
            .collect())
    }
}
