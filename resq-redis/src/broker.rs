//! Redis 消息中间件

use crate::{config::RedisConfig, decode};
use redis::{
    Client, RedisError, Value,
    aio::{ConnectionManager, ConnectionManagerConfig},
    streams::{StreamInfoGroupsReply, StreamInfoStreamReply},
};
use resq::{
    domain::{Broker, GroupRead, StreamEntry, StreamInfo},
    errors::BrokerError,
};
use std::time::Duration;
use tracing::{debug, info, instrument};

const NOGROUP: &str = "NOGROUP";
const BUSYGROUP: &str = "BUSYGROUP";

/// 按 Redis 错误码分类
pub fn classify_code(code: Option<&str>, message: String) -> BrokerError {
    match code {
        Some(NOGROUP) => BrokerError::GroupMissing(message),
        Some(BUSYGROUP) => BrokerError::GroupExists(message),
        _ => BrokerError::Other(message),
    }
}

fn classify(e: RedisError) -> BrokerError {
    classify_code(e.code(), e.to_string())
}

/// Redis 消息中间件
///
/// 连接管理器断线后自行重连，克隆代价低，每条命令使用一份克隆。
#[derive(Clone)]
pub struct RedisBroker {
    conn: ConnectionManager,
}

impl RedisBroker {
    /// 建立连接
    #[instrument(name = "connect_redis", skip(cfg), fields(host = %cfg.host, port = cfg.port))]
    pub async fn connect(cfg: &RedisConfig) -> Result<Self, BrokerError> {
        let client = Client::open(cfg.connection_info()).map_err(classify)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(cfg.retries)
            .set_connection_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .set_response_timeout(cfg.response_timeout());
        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(classify)?;
        info!("Redis 连接成功");
        Ok(Self { conn })
    }
}

impl Broker for RedisBroker {
    async fn exists(&self, key: &str) -> Result<bool, BrokerError> {
        let mut conn = self.conn.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)
    }

    async fn stream_info(&self, key: &str) -> Result<StreamInfo, BrokerError> {
        let mut conn = self.conn.clone();
        let reply: StreamInfoStreamReply = redis::cmd("XINFO")
            .arg("STREAM")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(StreamInfo {
            length: reply.length,
            groups: reply.groups,
            last_generated_id: reply.last_generated_id,
        })
    }

    async fn groups(&self, key: &str) -> Result<Vec<String>, BrokerError> {
        let mut conn = self.conn.clone();
        let reply: StreamInfoGroupsReply = redis::cmd("XINFO")
            .arg("GROUPS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(reply.groups.into_iter().map(|g| g.name).collect())
    }

    async fn append(&self, key: &str, fields: &[(&str, &str)]) -> Result<String, BrokerError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("XADD");
        cmd.arg(key).arg("*");
        for (field, value) in fields {
            cmd.arg(*field).arg(*value);
        }
        cmd.query_async(&mut conn).await.map_err(classify)
    }

    async fn destroy_group(&self, key: &str, group: &str) -> Result<bool, BrokerError> {
        let mut conn = self.conn.clone();
        let destroyed: i64 = redis::cmd("XGROUP")
            .arg("DESTROY")
            .arg(key)
            .arg(group)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(destroyed > 0)
    }

    async fn create_group(&self, key: &str, group: &str, start: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(key)
            .arg(group)
            .arg(start)
            .arg("MKSTREAM")
            .query_async::<()>(&mut conn)
            .await
            .map_err(classify)
    }

    async fn read_group(
        &self,
        key: &str,
        read: GroupRead<'_>,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(read.group)
            .arg(read.consumer)
            .arg("COUNT")
            .arg(read.count);
        if let Some(block) = read.block {
            cmd.arg("BLOCK").arg(block.as_millis() as u64);
        }
        cmd.arg("STREAMS").arg(key).arg(read.cursor);
        let reply: Value = cmd.query_async(&mut conn).await.map_err(classify)?;
        let entries = decode::entries(&reply, key);
        debug!("游标 {} 组读取 {} 条消息", read.cursor, entries.len());
        Ok(entries)
    }

    async fn ack(&self, key: &str, group: &str, ids: &[&str]) -> Result<u64, BrokerError> {
        let mut conn = self.conn.clone();
        redis::cmd("XACK")
            .arg(key)
            .arg(group)
            .arg(ids)
            .query_async(&mut conn)
            .await
            .map_err(classify)
    }

    async fn read(
        &self,
        key: &str,
        cursor: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, BrokerError> {
        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("XREAD")
            .arg("COUNT")
            .arg(count)
            .arg("STREAMS")
            .arg(key)
            .arg(cursor)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(decode::entries(&reply, key))
    }
}
