use crate::core::snapshot::{GraphSnapshot, RecordDefects, SnapshotRecord};
use crate::domain::model::EntityKind;
use crate::domain::ports::SnapshotCodec;
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_JSON_INDENT: usize = 4;

/// 縮排輸出的 UTF-8 JSON，非 ASCII 字元不跳脫
#[derive(Debug, Clone)]
pub struct JsonCodec {
    indent: Vec<u8>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::with_indent(DEFAULT_JSON_INDENT)
    }

    pub fn with_indent(width: usize) -> Self {
        Self {
            indent: vec![b' '; width],
        }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// 欄位的預期型別
#[derive(Debug, Clone, Copy)]
enum FieldShape {
    Id,
    Text,
    Refs(EntityKind),
}

const USER_FIELDS: &[(&str, FieldShape)] = &[
    ("user_id", FieldShape::Id),
    ("username", FieldShape::Text),
    ("email", FieldShape::Text),
    ("data_registration", FieldShape::Text),
    ("posts", FieldShape::Refs(EntityKind::Post)),
    ("comments", FieldShape::Refs(EntityKind::Comment)),
    ("friends", FieldShape::Refs(EntityKind::User)),
];

const POST_FIELDS: &[(&str, FieldShape)] = &[
    ("post_id", FieldShape::Id),
    ("user_id", FieldShape::Id),
    ("text", FieldShape::Text),
    ("created_at", FieldShape::Text),
    ("comments", FieldShape::Refs(EntityKind::Comment)),
];

const COMMENT_FIELDS: &[(&str, FieldShape)] = &[
    ("comment_id", FieldShape::Id),
    ("user_id", FieldShape::Id),
    ("post_id", FieldShape::Id),
    ("text", FieldShape::Text),
    ("created_at", FieldShape::Text),
];

/// 文件層級的結構；各實體先保留為原始 JSON 值，逐筆檢查後才轉成記錄
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    users: BTreeMap<String, Value>,
    #[serde(default)]
    posts: BTreeMap<String, Value>,
    #[serde(default)]
    comments: BTreeMap<String, Value>,
}

/// 移除型別不符的欄位與清單項目，並把問題記在 `RecordDefects`
fn sanitize(value: Value, fields: &[(&str, FieldShape)]) -> (Map<String, Value>, RecordDefects) {
    let mut defects = RecordDefects::default();
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            defects
                .problems
                .push(format!("expected an object, found {}", other));
            return (Map::new(), defects);
        }
    };

    for &(name, shape) in fields {
        let Some(field) = object.remove(name) else {
            continue;
        };
        let kept = match (shape, field) {
            (_, Value::Null) => None,
            (FieldShape::Id, field) if field.as_u64().is_some() => Some(field),
            (FieldShape::Text, field @ Value::String(_)) => Some(field),
            (FieldShape::Refs(kind), Value::Array(items)) => {
                let (ids, invalid): (Vec<Value>, Vec<Value>) =
                    items.into_iter().partition(|item| item.as_u64().is_some());
                defects
                    .invalid_refs
                    .extend(invalid.into_iter().map(|item| (kind, item.to_string())));
                Some(Value::Array(ids))
            }
            (_, field) => {
                defects
                    .problems
                    .push(format!("field '{}' has invalid value {}", name, field));
                None
            }
        };
        if let Some(field) = kept {
            object.insert(name.to_string(), field);
        }
    }

    (object, defects)
}

fn decode_table<R>(table: BTreeMap<String, Value>, fields: &[(&str, FieldShape)]) -> BTreeMap<String, R>
where
    R: DeserializeOwned + Default + SnapshotRecord,
{
    table
        .into_iter()
        .map(|(key, value)| {
            let (object, mut defects) = sanitize(value, fields);
            let mut record = match serde_json::from_value::<R>(Value::Object(object)) {
                Ok(record) => record,
                Err(e) => {
                    defects.problems.push(e.to_string());
                    R::default()
                }
            };
            if !defects.is_empty() {
                tracing::debug!("Record '{}' decoded with defects: {:?}", key, defects);
            }
            *record.defects_mut() = defects;
            (key, record)
        })
        .collect()
}

impl SnapshotCodec for JsonCodec {
    fn encode(&self, snapshot: &GraphSnapshot) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(&self.indent);
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        snapshot.serialize(&mut serializer)?;
        Ok(buffer)
    }

    /// 只有文件本身無法解析時才回傳錯誤；單一實體的型別問題留給重建階段處理
    fn decode(&self, data: &[u8]) -> Result<GraphSnapshot> {
        let raw: RawSnapshot = serde_json::from_slice(data)?;
        Ok(GraphSnapshot {
            users: decode_table(raw.users, USER_FIELDS),
            posts: decode_table(raw.posts, POST_FIELDS),
            comments: decode_table(raw.comments, COMMENT_FIELDS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::{CommentRecord, UserRecord};

    #[test]
    fn test_encode_keeps_non_ascii_and_indents() {
        let mut snapshot = GraphSnapshot::default();
        snapshot.users.insert(
            "1".into(),
            UserRecord {
                user_id: Some(1),
                username: Some("Иван".into()),
                email: Some("ivan@example.com".into()),
                data_registration: Some("2024-01-15T10:00:00".into()),
                ..Default::default()
            },
        );

        let text = String::from_utf8(JsonCodec::new().encode(&snapshot).unwrap()).unwrap();
        assert!(text.contains("\"username\": \"Иван\""));
        assert!(text.contains("\n    \"users\": {"));
        assert!(!text.contains("friends"));
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let json = br#"{
            "users": {"1": {"username": "ivan"}},
            "comments": {"7": {"comment_id": 7, "text": "hi"}}
        }"#;
        let snapshot = JsonCodec::new().decode(json).unwrap();
        assert!(snapshot.posts.is_empty());
        assert_eq!(snapshot.users["1"].email, None);
        assert!(snapshot.users["1"].posts.is_empty());
        assert_eq!(
            snapshot.comments["7"],
            CommentRecord {
                comment_id: Some(7),
                text: Some("hi".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_isolates_wrong_typed_values() {
        let json = br#"{
            "users": {
                "1": {"user_id": 1, "username": "ivan", "posts": [101, "x", null]},
                "2": {"user_id": "two", "username": "maria"},
                "3": ["not", "an", "object"]
            },
            "posts": {"101": {"post_id": 101, "user_id": 1, "comments": 5}}
        }"#;
        let snapshot = JsonCodec::new().decode(json).unwrap();

        let ivan = &snapshot.users["1"];
        assert_eq!(ivan.posts, vec![101]);
        assert!(ivan.defects.problems.is_empty());
        assert_eq!(
            ivan.defects.invalid_refs,
            vec![
                (EntityKind::Post, "\"x\"".to_string()),
                (EntityKind::Post, "null".to_string())
            ]
        );

        let maria = &snapshot.users["2"];
        assert_eq!(maria.user_id, None);
        assert_eq!(maria.username.as_deref(), Some("maria"));
        assert!(maria.defects.problems[0].contains("'user_id'"));

        assert_eq!(snapshot.users["3"].defects.problems.len(), 1);
        assert!(snapshot.posts["101"].comments.is_empty());
        assert!(snapshot.posts["101"].defects.problems[0].contains("'comments'"));
    }

    #[test]
    fn test_decode_rejects_invalid_document() {
        assert!(JsonCodec::new().decode(b"{ not json").is_err());
    }
}
