//! # 处理结果事件

use crate::{SENTINEL, domain::StreamEntry};
use serde::{Serialize, Serializer, ser::SerializeMap};

const ID_KEY: &str = "id";
const DIRECT_READ_KEY: &str = "directRead";

/// 处理结果事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingEvent {
    /// 消息 Id
    pub id: String,
    /// 展开后的字段，同名字段后者覆盖前者
    pub fields: Vec<(String, String)>,
    /// 是否经降级直接读取获得，可能与后续消费组投递重复
    pub direct_read: bool,
}

impl ProcessingEvent {
    /// 由流消息展开
    pub fn from_entry(entry: StreamEntry, direct_read: bool) -> Self {
        let mut fields: Vec<(String, String)> = Vec::with_capacity(entry.fields.len());
        for (name, value) in entry.fields {
            match fields.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => fields.push((name, value)),
            }
        }
        Self {
            id: entry.id,
            fields,
            direct_read,
        }
    }

    /// 按字段名取值
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 是否为物化空流时写入的占位消息
    pub fn is_sentinel(&self) -> bool {
        self.fields.len() == 1 && self.get(SENTINEL.0) == Some(SENTINEL.1)
    }
}

impl Serialize for ProcessingEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(ID_KEY, &self.id)?;
        for (name, value) in &self.fields {
            if name == ID_KEY || name == DIRECT_READ_KEY {
                continue;
            }
            map.serialize_entry(name, value)?;
        }
        if self.direct_read {
            map.serialize_entry(DIRECT_READ_KEY, &true)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, fields: &[(&str, &str)]) -> StreamEntry {
        StreamEntry::new(
            id,
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn later_duplicate_field_wins() {
        let evt = ProcessingEvent::from_entry(
            entry("1-0", &[("status", "queued"), ("video", "v1"), ("status", "done")]),
            false,
        );
        assert_eq!(evt.get("status"), Some("done"));
        assert_eq!(evt.fields.len(), 2);
        assert_eq!(evt.fields[0].0, "status");
    }

    #[test]
    fn serializes_flat_record() {
        let evt = ProcessingEvent::from_entry(entry("1-0", &[("video", "v1"), ("nsfw", "0")]), false);
        let value = serde_json::to_value(&evt).unwrap();
        assert_eq!(value, json!({"id": "1-0", "video": "v1", "nsfw": "0"}));
    }

    #[test]
    fn direct_read_flag_is_emitted_only_when_set() {
        let evt = ProcessingEvent::from_entry(entry("2-0", &[("video", "v2")]), true);
        let value = serde_json::to_value(&evt).unwrap();
        assert_eq!(value, json!({"id": "2-0", "video": "v2", "directRead": true}));
    }

    #[test]
    fn payload_cannot_override_envelope() {
        let evt = ProcessingEvent::from_entry(
            entry("3-0", &[("id", "forged"), ("directRead", "false"), ("video", "v3")]),
            true,
        );
        let value = serde_json::to_value(&evt).unwrap();
        assert_eq!(value, json!({"id": "3-0", "video": "v3", "directRead": true}));
        assert_eq!(evt.get("id"), Some("forged"));
    }

    #[test]
    fn recognizes_sentinel() {
        let sentinel = ProcessingEvent::from_entry(entry("0-1", &[("init", "true")]), false);
        assert!(sentinel.is_sentinel());
        let result = ProcessingEvent::from_entry(entry("0-2", &[("init", "true"), ("x", "y")]), false);
        assert!(!result.is_sentinel());
    }
}
