use crate::core::snapshot::{CommentRecord, GraphSnapshot, PostRecord, UserRecord};
use crate::domain::model::EntityKind;
use crate::domain::ports::SnapshotCodec;
use crate::utils::error::{Result, SocialError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

const ROOT_ELEMENT: &str = "social_network";

/// XML 只輸出純量欄位；載入時由外鍵推導關聯清單
#[derive(Debug, Clone, Default)]
pub struct XmlCodec;

impl XmlCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotCodec for XmlCodec {
    fn encode(&self, snapshot: &GraphSnapshot) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;

        write(&mut writer, Event::Start(BytesStart::new("users")))?;
        for (key, user) in &snapshot.users {
            open_entity(&mut writer, "user", user.user_id, key)?;
            field(&mut writer, "username", user.username.as_deref())?;
            field(&mut writer, "email", user.email.as_deref())?;
            field(&mut writer, "data_registration", user.data_registration.as_deref())?;
            write(&mut writer, Event::End(BytesEnd::new("user")))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("users")))?;

        write(&mut writer, Event::Start(BytesStart::new("posts")))?;
        for (key, post) in &snapshot.posts {
            open_entity(&mut writer, "post", post.post_id, key)?;
            number(&mut writer, "user_id", post.user_id)?;
            field(&mut writer, "text", post.text.as_deref())?;
            field(&mut writer, "created_at", post.created_at.as_deref())?;
            write(&mut writer, Event::End(BytesEnd::new("post")))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("posts")))?;

        write(&mut writer, Event::Start(BytesStart::new("comments")))?;
        for (key, comment) in &snapshot.comments {
            open_entity(&mut writer, "comment", comment.comment_id, key)?;
            number(&mut writer, "user_id", comment.user_id)?;
            number(&mut writer, "post_id", comment.post_id)?;
            field(&mut writer, "text", comment.text.as_deref())?;
            field(&mut writer, "created_at", comment.created_at.as_deref())?;
            write(&mut writer, Event::End(BytesEnd::new("comment")))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("comments")))?;

        write(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
        Ok(writer.into_inner())
    }

    fn decode(&self, data: &[u8]) -> Result<GraphSnapshot> {
        let text = std::str::from_utf8(data).map_err(SocialError::xml)?;
        let mut reader = Reader::from_str(text);
        let mut snapshot = GraphSnapshot::default();
        let mut entity: Option<PendingEntity> = None;
        let mut current_field: Option<(String, String)> = None;
        let mut ordinal = 0usize;

        loop {
            match reader.read_event().map_err(SocialError::xml)? {
                Event::Start(e) => {
                    let name = element_name(e.name().as_ref());
                    match (entity.as_ref(), entity_kind(&name)) {
                        (None, Some(kind)) => {
                            ordinal += 1;
                            entity = Some(PendingEntity::open(kind, &e, ordinal)?);
                        }
                        (Some(_), _) => current_field = Some((name, String::new())),
                        (None, None) => {}
                    }
                }
                Event::Empty(e) => {
                    let name = element_name(e.name().as_ref());
                    match (entity.as_mut(), entity_kind(&name)) {
                        (None, Some(kind)) => {
                            ordinal += 1;
                            PendingEntity::open(kind, &e, ordinal)?.store_into(&mut snapshot);
                        }
                        (Some(pending), _) => {
                            pending.fields.insert(name, String::new());
                        }
                        (None, None) => {}
                    }
                }
                Event::Text(t) => {
                    if let Some((_, value)) = current_field.as_mut() {
                        value.push_str(&t.unescape().map_err(SocialError::xml)?);
                    }
                }
                Event::CData(c) => {
                    if let Some((_, value)) = current_field.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(e) => {
                    let name = element_name(e.name().as_ref());
                    if current_field.as_ref().is_some_and(|(field, _)| *field == name) {
                        if let (Some((field, value)), Some(pending)) =
                            (current_field.take(), entity.as_mut())
                        {
                            pending.fields.insert(field, value);
                        }
                    } else if entity.as_ref().is_some_and(|p| Some(p.kind) == entity_kind(&name)) {
                        if let Some(pending) = entity.take() {
                            pending.store_into(&mut snapshot);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        snapshot.derive_associations();
        tracing::debug!("Decoded {} entities from XML", snapshot.entity_count());
        Ok(snapshot)
    }
}

struct PendingEntity {
    kind: EntityKind,
    key: String,
    id: Option<u64>,
    fields: HashMap<String, String>,
}

impl PendingEntity {
    fn open(kind: EntityKind, element: &BytesStart<'_>, ordinal: usize) -> Result<Self> {
        let raw_id = match element.try_get_attribute("id").map_err(SocialError::xml)? {
            Some(attr) => Some(attr.unescape_value().map_err(SocialError::xml)?.trim().to_string()),
            None => None,
        };

        Ok(Self {
            kind,
            key: raw_id.clone().unwrap_or_else(|| format!("#{}", ordinal)),
            id: raw_id.and_then(|raw| raw.parse().ok()),
            fields: HashMap::new(),
        })
    }

    fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn number(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(|v| v.trim().parse().ok())
    }

    fn store_into(self, snapshot: &mut GraphSnapshot) {
        // 重複的 id 保留為獨立項目，交由重建階段回報
        let key = match self.kind {
            EntityKind::User => unique_key(&snapshot.users, &self.key),
            EntityKind::Post => unique_key(&snapshot.posts, &self.key),
            EntityKind::Comment => unique_key(&snapshot.comments, &self.key),
        };

        match self.kind {
            EntityKind::User => {
                let record = UserRecord {
                    user_id: self.id,
                    username: self.text("username"),
                    email: self.text("email"),
                    data_registration: self.text("data_registration"),
                    ..Default::default()
                };
                snapshot.users.insert(key, record);
            }
            EntityKind::Post => {
                let record = PostRecord {
                    post_id: self.id,
                    user_id: self.number("user_id"),
                    text: self.text("text"),
                    created_at: self.text("created_at"),
                    ..Default::default()
                };
                snapshot.posts.insert(key, record);
            }
            EntityKind::Comment => {
                let record = CommentRecord {
                    comment_id: self.id,
                    user_id: self.number("user_id"),
                    post_id: self.number("post_id"),
                    text: self.text("text"),
                    created_at: self.text("created_at"),
                    ..Default::default()
                };
                snapshot.comments.insert(key, record);
            }
        }
    }
}

fn unique_key<R>(table: &std::collections::BTreeMap<String, R>, key: &str) -> String {
    let mut candidate = key.to_string();
    let mut n = 1;
    while table.contains_key(&candidate) {
        n += 1;
        candidate = format!("{}#{}", key, n);
    }
    candidate
}

fn entity_kind(name: &str) -> Option<EntityKind> {
    match name {
        "user" => Some(EntityKind::User),
        "post" => Some(EntityKind::Post),
        "comment" => Some(EntityKind::Comment),
        _ => None,
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(SocialError::xml)
}

fn open_entity(writer: &mut Writer<Vec<u8>>, name: &str, id: Option<u64>, key: &str) -> Result<()> {
    let id = id.map(|id| id.to_string()).unwrap_or_else(|| key.to_string());
    let mut element = BytesStart::new(name);
    element.push_attribute(("id", id.as_str()));
    write(writer, Event::Start(element))
}

fn field(writer: &mut Writer<Vec<u8>>, name: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn number(writer: &mut Writer<Vec<u8>>, name: &str, value: Option<u64>) -> Result<()> {
    field(writer, name, value.map(|v| v.to_string()).as_deref())
}
