//! 流读取应答解码
//!
//! `XREAD`/`XREADGROUP` 的应答在 RESP2 下是 `[[key, [[id, [f, v, ...]], ...]], ...]`，
//! 在 RESP3 下外层为以流键为键的映射。超时应答为 nil。

use redis::Value;
use resq::domain::StreamEntry;
use tracing::warn;

fn text(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// 解码读取应答，仅保留目标流的消息
pub(crate) fn entries(reply: &Value, key: &str) -> Vec<StreamEntry> {
    match reply {
        Value::Nil => Vec::new(),
        Value::Array(streams) => streams
            .iter()
            .filter_map(|stream| match stream {
                Value::Array(pair) if pair.len() == 2 => Some((&pair[0], &pair[1])),
                _ => {
                    warn!("无法识别的流应答：{stream:?}");
                    None
                }
            })
            .filter(|(name, _)| text(name).as_deref() == Some(key))
            .flat_map(|(_, items)| stream_entries(items))
            .collect(),
        Value::Map(streams) => streams
            .iter()
            .filter(|(name, _)| text(name).as_deref() == Some(key))
            .flat_map(|(_, items)| stream_entries(items))
            .collect(),
        other => {
            warn!("无法识别的读取应答：{other:?}");
            Vec::new()
        }
    }
}

fn stream_entries(items: &Value) -> Vec<StreamEntry> {
    match items {
        Value::Array(items) => items.iter().filter_map(entry).collect(),
        Value::Nil => Vec::new(),
        other => {
            warn!("无法识别的消息列表：{other:?}");
            Vec::new()
        }
    }
}

fn entry(item: &Value) -> Option<StreamEntry> {
    let Value::Array(parts) = item else {
        warn!("无法识别的消息：{item:?}");
        return None;
    };
    let Some(id) = parts.first().and_then(text) else {
        warn!("消息缺少 Id：{item:?}");
        return None;
    };
    let fields = match parts.get(1) {
        Some(Value::Array(raw)) => fields(&id, raw),
        Some(Value::Map(raw)) => raw
            .iter()
            .map(|(k, v)| text(k).zip(text(v)))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_else(|| {
                warn!("消息 {id} 含非字符串字段，跳过");
                Vec::new()
            }),
        // 待确认但已从流中删除的消息
        Some(Value::Nil) | None => Vec::new(),
        Some(other) => {
            warn!("消息 {id} 字段格式错误：{other:?}");
            Vec::new()
        }
    };
    Some(StreamEntry::new(id, fields))
}

fn fields(id: &str, raw: &[Value]) -> Vec<(String, String)> {
    if raw.len() % 2 != 0 {
        warn!("消息 {id} 字段数为奇数（{}），跳过", raw.len());
        return Vec::new();
    }
    raw.chunks_exact(2)
        .map(|pair| text(&pair[0]).zip(text(&pair[1])))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_else(|| {
            warn!("消息 {id} 含非字符串字段，跳过");
            Vec::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    fn item(id: &str, fields: &[&str]) -> Value {
        Value::Array(vec![
            bulk(id),
            Value::Array(fields.iter().map(|f| bulk(f)).collect()),
        ])
    }

    #[test]
    fn decodes_resp2_reply_in_order() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("results"),
            Value::Array(vec![
                item("1-0", &["video", "a", "status", "done"]),
                item("2-0", &["video", "b"]),
            ]),
        ])]);

        let entries = entries(&reply, "results");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "1-0");
        assert_eq!(
            entries[0].fields,
            vec![
                ("video".to_string(), "a".to_string()),
                ("status".to_string(), "done".to_string())
            ]
        );
        assert_eq!(entries[1].id, "2-0");
    }

    #[test]
    fn decodes_resp3_map_reply() {
        let reply = Value::Map(vec![(
            bulk("results"),
            Value::Array(vec![item("5-0", &["video", "e"])]),
        )]);

        let entries = entries(&reply, "results");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fields[0].1, "e");
    }

    #[test]
    fn nil_reply_is_empty() {
        assert!(entries(&Value::Nil, "results").is_empty());
    }

    #[test]
    fn ignores_other_streams() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("other"),
            Value::Array(vec![item("1-0", &["video", "a"])]),
        ])]);

        assert!(entries(&reply, "results").is_empty());
    }

    #[test]
    fn odd_field_count_keeps_id_without_payload() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("results"),
            Value::Array(vec![
                item("1-0", &["video", "a", "status"]),
                item("2-0", &["video", "b"]),
            ]),
        ])]);

        let entries = entries(&reply, "results");

        assert_eq!(entries.len(), 2);
        assert!(entries[0].fields.is_empty());
        assert_eq!(entries[1].fields.len(), 1);
    }

    #[test]
    fn deleted_pending_entry_has_no_payload() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("results"),
            Value::Array(vec![Value::Array(vec![bulk("3-0"), Value::Nil])]),
        ])]);

        let entries = entries(&reply, "results");

        assert_eq!(entries, vec![StreamEntry::new("3-0", Vec::new())]);
    }

    #[test]
    fn entry_without_id_is_dropped() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("results"),
            Value::Array(vec![Value::Array(vec![])]),
        ])]);

        assert!(entries(&reply, "results").is_empty());
    }
}
