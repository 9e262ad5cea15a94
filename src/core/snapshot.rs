use crate::core::graph::{DanglingRef, LinkOutcome, RefTarget, SocialGraph};
use crate::domain::model::{Comment, CommentId, EntityKind, Post, PostId, User, UserId};
use crate::utils::error::{Result, SocialError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// 扁平化的匯出格式：實體以 id 字串為鍵，關聯只保存 id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub posts: BTreeMap<String, PostRecord>,
    #[serde(default)]
    pub comments: BTreeMap<String, CommentRecord>,
}

/// 解碼時發現的欄位問題，隨記錄帶到重建階段，不會被輸出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDefects {
    /// 型別不符的純量欄位或整筆記錄的問題；非空時整個實體會被拒絕
    pub problems: Vec<String>,
    /// 關聯清單中無法當成 id 的項目（目標種類、原始值）
    pub invalid_refs: Vec<(EntityKind, String)>,
}

impl RecordDefects {
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty() && self.invalid_refs.is_empty()
    }
}

/// 快照記錄共用的存取介面
pub trait SnapshotRecord {
    fn defects(&self) -> &RecordDefects;
    fn defects_mut(&mut self) -> &mut RecordDefects;
}

// 欄位皆為 Option：缺欄位只影響單一實體，不會讓整份檔案解析失敗

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_registration: Option<String>,
    #[serde(default)]
    pub posts: Vec<PostId>,
    #[serde(default)]
    pub comments: Vec<CommentId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub friends: Vec<UserId>,
    #[serde(skip)]
    pub defects: RecordDefects,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub comments: Vec<CommentId>,
    #[serde(skip)]
    pub defects: RecordDefects,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<CommentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip)]
    pub defects: RecordDefects,
}

macro_rules! snapshot_record {
    ($($record:ty),*) => {
        $(impl SnapshotRecord for $record {
            fn defects(&self) -> &RecordDefects {
                &self.defects
            }

            fn defects_mut(&mut self) -> &mut RecordDefects {
                &mut self.defects
            }
        })*
    };
}

snapshot_record!(UserRecord, PostRecord, CommentRecord);

/// 載入結果：被拒絕的實體與被丟棄的懸空參照都會回報，不會中止整個載入
#[derive(Debug)]
pub struct LoadReport {
    pub graph: SocialGraph,
    pub rejected: Vec<SocialError>,
    pub dropped: Vec<DanglingRef>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.dropped.is_empty()
    }
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value.trim())
                .ok()
                .map(|dt| dt.naive_local())
        })
}

impl GraphSnapshot {
    pub fn entity_count(&self) -> usize {
        self.users.len() + self.posts.len() + self.comments.len()
    }

    /// 由外鍵（user_id、post_id）推導關聯清單，供不含關聯欄位的格式使用
    pub fn derive_associations(&mut self) {
        let user_keys = index_keys(&self.users, |r| r.user_id);
        let post_keys = index_keys(&self.posts, |r| r.post_id);

        let mut posts: Vec<(PostId, UserId)> = self
            .posts
            .iter()
            .filter_map(|(key, r)| Some((r.post_id.or_else(|| key.parse().ok())?, r.user_id?)))
            .collect();
        posts.sort_unstable();
        for (post_id, user_id) in posts {
            if let Some(user) = user_keys.get(&user_id).and_then(|k| self.users.get_mut(k)) {
                if !user.posts.contains(&post_id) {
                    user.posts.push(post_id);
                }
            }
        }

        let mut comments: Vec<(CommentId, Option<UserId>, Option<PostId>)> = self
            .comments
            .iter()
            .filter_map(|(key, r)| {
                let id = r.comment_id.or_else(|| key.parse().ok())?;
                Some((id, r.user_id, r.post_id))
            })
            .collect();
        comments.sort_unstable();
        for (comment_id, user_id, post_id) in comments {
            if let Some(user) = user_id
                .and_then(|id| user_keys.get(&id))
                .and_then(|k| self.users.get_mut(k))
            {
                if !user.comments.contains(&comment_id) {
                    user.comments.push(comment_id);
                }
            }
            if let Some(post) = post_id
                .and_then(|id| post_keys.get(&id))
                .and_then(|k| self.posts.get_mut(k))
            {
                if !post.comments.contains(&comment_id) {
                    post.comments.push(comment_id);
                }
            }
        }
    }
}

fn index_keys<R>(table: &BTreeMap<String, R>, id_of: impl Fn(&R) -> Option<u64>) -> HashMap<u64, String> {
    table
        .iter()
        .filter_map(|(key, record)| {
            let id = id_of(record).or_else(|| key.parse().ok())?;
            Some((id, key.clone()))
        })
        .collect()
}

impl SocialGraph {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::default();

        for user in self.users() {
            snapshot.users.insert(
                user.id().to_string(),
                UserRecord {
                    user_id: Some(user.id()),
                    username: Some(user.username().to_string()),
                    email: Some(user.email().to_string()),
                    data_registration: Some(format_timestamp(user.registered_at())),
                    posts: user.posts().to_vec(),
                    comments: user.comments().to_vec(),
                    friends: user.friends().to_vec(),
                    ..Default::default()
                },
            );
        }

        for post in self.posts() {
            snapshot.posts.insert(
                post.id().to_string(),
                PostRecord {
                    post_id: Some(post.id()),
                    user_id: Some(post.author_id()),
                    text: Some(post.text().to_string()),
                    created_at: Some(format_timestamp(post.created_at())),
                    comments: post.comments().to_vec(),
                    ..Default::default()
                },
            );
        }

        for comment in self.comments() {
            snapshot.comments.insert(
                comment.id().to_string(),
                CommentRecord {
                    comment_id: Some(comment.id()),
                    user_id: Some(comment.author_id()),
                    post_id: Some(comment.post_id()),
                    text: Some(comment.text().to_string()),
                    created_at: Some(format_timestamp(comment.created_at())),
                    ..Default::default()
                },
            );
        }

        snapshot
    }

    /// 兩階段重建
    ///
    /// 1. 物件階段：只讀取純量欄位建立實體並放入 id 表，不碰任何關聯清單。
    /// 2. 關聯階段：所有表都完整後，再依記錄的 id 清單串接貼文、留言與好友。
    ///
    /// 兩個階段不可交錯，否則參照到較晚建立的實體時會解析失敗。
    /// 結構不完整的實體只會被單獨拒絕；無法解析、重複或不是 id 的關聯項目
    /// 會被略過並記錄在 `dropped`。好友清單的反向重複是對稱關係的正常結果，不列入。
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> LoadReport {
        let mut graph = SocialGraph::new();
        let mut rejected = Vec::new();

        // 物件階段
        let mut loaded_users = Vec::new();
        for (key, record) in &snapshot.users {
            let result = user_from_record(key, record).and_then(|user| {
                let id = user.id();
                graph.insert_user(user).map(|_| id)
            });
            match result {
                Ok(id) => loaded_users.push((id, record)),
                Err(err) => reject(&mut rejected, err),
            }
        }

        let mut loaded_posts = Vec::new();
        for (key, record) in &snapshot.posts {
            let result = post_from_record(key, record).and_then(|post| {
                let id = post.id();
                graph
                    .insert_post(post)
                    .map(|_| id)
                    .map_err(|err| unresolved_owner(EntityKind::Post, key, err))
            });
            match result {
                Ok(id) => loaded_posts.push((id, record)),
                Err(err) => reject(&mut rejected, err),
            }
        }

        for (key, record) in &snapshot.comments {
            let result = comment_from_record(key, record).and_then(|comment| {
                graph
                    .insert_comment(comment)
                    .map_err(|err| unresolved_owner(EntityKind::Comment, key, err))
            });
            if let Err(err) = result {
                reject(&mut rejected, err);
            }
        }

        // 關聯階段
        let mut dropped = Vec::new();
        for (post_id, record) in &loaded_posts {
            for &comment_id in &record.comments {
                let outcome = graph.link_post_comment(*post_id, comment_id);
                track(&mut dropped, outcome, EntityKind::Post, *post_id, EntityKind::Comment, comment_id);
            }
            drop_invalid(&mut dropped, EntityKind::Post, *post_id, record.defects());
        }

        for (user_id, record) in &loaded_users {
            for &post_id in &record.posts {
                let outcome = graph.link_user_post(*user_id, post_id);
                track(&mut dropped, outcome, EntityKind::User, *user_id, EntityKind::Post, post_id);
            }
            for &comment_id in &record.comments {
                let outcome = graph.link_user_comment(*user_id, comment_id);
                track(&mut dropped, outcome, EntityKind::User, *user_id, EntityKind::Comment, comment_id);
            }
            for &friend_id in &record.friends {
                if graph.link_friends(*user_id, friend_id) == LinkOutcome::Dangling {
                    track(&mut dropped, LinkOutcome::Dangling, EntityKind::User, *user_id, EntityKind::User, friend_id);
                }
            }
            drop_invalid(&mut dropped, EntityKind::User, *user_id, record.defects());
        }

        let stats = graph.stats();
        tracing::info!(
            "Reconstructed graph: {} users, {} posts, {} comments ({} rejected, {} dropped references)",
            stats.users,
            stats.posts,
            stats.comments,
            rejected.len(),
            dropped.len()
        );

        LoadReport {
            graph,
            rejected,
            dropped,
        }
    }
}

fn reject(rejected: &mut Vec<SocialError>, err: SocialError) {
    tracing::warn!("⚠️ Skipping entity: {}", err);
    rejected.push(err);
}

fn track(
    dropped: &mut Vec<DanglingRef>,
    outcome: LinkOutcome,
    owner_kind: EntityKind,
    owner_id: u64,
    target_kind: EntityKind,
    target_id: u64,
) {
    let label = match outcome {
        LinkOutcome::Linked => return,
        LinkOutcome::AlreadyLinked => "repeated",
        LinkOutcome::Dangling => "dangling",
    };
    let reference = DanglingRef {
        owner_kind,
        owner_id,
        target_kind,
        target: RefTarget::Id(target_id),
    };
    tracing::warn!("⚠️ Dropping {} reference {}", label, reference);
    dropped.push(reference);
}

fn drop_invalid(dropped: &mut Vec<DanglingRef>, owner_kind: EntityKind, owner_id: u64, defects: &RecordDefects) {
    for (target_kind, raw) in &defects.invalid_refs {
        let reference = DanglingRef {
            owner_kind,
            owner_id,
            target_kind: *target_kind,
            target: RefTarget::Invalid(raw.clone()),
        };
        tracing::warn!("⚠️ Dropping invalid reference {}", reference);
        dropped.push(reference);
    }
}

fn check_defects(kind: EntityKind, key: &str, defects: &RecordDefects) -> Result<()> {
    if defects.problems.is_empty() {
        Ok(())
    } else {
        Err(SocialError::malformed(kind, key, defects.problems.join("; ")))
    }
}

fn unresolved_owner(kind: EntityKind, key: &str, err: SocialError) -> SocialError {
    match err {
        SocialError::UserNotFound(id) => {
            SocialError::malformed(kind, key, format!("author {} was not loaded", id))
        }
        SocialError::PostNotFound(id) => {
            SocialError::malformed(kind, key, format!("post {} was not loaded", id))
        }
        other => other,
    }
}

fn resolve_id(kind: EntityKind, key: &str, embedded: Option<u64>) -> Result<u64> {
    match (embedded, key.parse::<u64>().ok()) {
        (Some(id), Some(key_id)) if id != key_id => Err(SocialError::malformed(
            kind,
            key,
            format!("embedded id {} does not match key", id),
        )),
        (Some(id), _) | (None, Some(id)) => Ok(id),
        (None, None) => Err(SocialError::malformed(kind, key, "missing id")),
    }
}

fn required<T: Clone>(kind: EntityKind, key: &str, field: &str, value: &Option<T>) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| SocialError::malformed(kind, key, format!("missing field '{}'", field)))
}

fn required_timestamp(kind: EntityKind, key: &str, field: &str, value: &Option<String>) -> Result<NaiveDateTime> {
    let raw = required(kind, key, field, value)?;
    parse_timestamp(&raw)
        .ok_or_else(|| SocialError::malformed(kind, key, format!("invalid timestamp '{}'", raw)))
}

fn user_from_record(key: &str, record: &UserRecord) -> Result<User> {
    let kind = EntityKind::User;
    check_defects(kind, key, record.defects())?;
    User::new(
        resolve_id(kind, key, record.user_id)?,
        required(kind, key, "username", &record.username)?,
        required(kind, key, "email", &record.email)?,
        required_timestamp(kind, key, "data_registration", &record.data_registration)?,
    )
}

fn post_from_record(key: &str, record: &PostRecord) -> Result<Post> {
    let kind = EntityKind::Post;
    check_defects(kind, key, record.defects())?;
    Post::new(
        resolve_id(kind, key, record.post_id)?,
        required(kind, key, "user_id", &record.user_id)?,
        required(kind, key, "text", &record.text)?,
        required_timestamp(kind, key, "created_at", &record.created_at)?,
    )
}

fn comment_from_record(key: &str, record: &CommentRecord) -> Result<Comment> {
    let kind = EntityKind::Comment;
    check_defects(kind, key, record.defects())?;
    Comment::new(
        resolve_id(kind, key, record.comment_id)?,
        required(kind, key, "user_id", &record.user_id)?,
        required(kind, key, "post_id", &record.post_id)?,
        required(kind, key, "text", &record.text)?,
        required_timestamp(kind, key, "created_at", &record.created_at)?,
    )
}
