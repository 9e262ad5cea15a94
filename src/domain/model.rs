use crate::utils::error::Result;
use crate::utils::validation::validate_non_empty_text;
use chrono::NaiveDateTime;
use std::fmt;

pub type UserId = u64;
pub type PostId = u64;
pub type CommentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Post,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Post => write!(f, "post"),
            EntityKind::Comment => write!(f, "comment"),
        }
    }
}

/// 使用者。身份欄位不可變，關聯清單只會追加。
///
/// 關聯清單只存 id，實體本身由 `SocialGraph` 以 id 為鍵持有。
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    registered_at: NaiveDateTime,
    posts: Vec<PostId>,
    comments: Vec<CommentId>,
    friends: Vec<UserId>,
}

impl User {
    pub(crate) fn new(
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        registered_at: NaiveDateTime,
    ) -> Result<Self> {
        let username = username.into();
        let email = email.into();
        validate_non_empty_text("username", &username)?;
        validate_non_empty_text("email", &email)?;

        Ok(Self {
            id,
            username,
            email,
            registered_at,
            posts: Vec::new(),
            comments: Vec::new(),
            friends: Vec::new(),
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn registered_at(&self) -> NaiveDateTime {
        self.registered_at
    }

    /// 依建立順序排列的貼文 id
    pub fn posts(&self) -> &[PostId] {
        &self.posts
    }

    pub fn comments(&self) -> &[CommentId] {
        &self.comments
    }

    pub fn friends(&self) -> &[UserId] {
        &self.friends
    }

    pub fn is_friend_of(&self, other: UserId) -> bool {
        self.friends.contains(&other)
    }

    pub(crate) fn push_post(&mut self, post_id: PostId) {
        self.posts.push(post_id);
    }

    pub(crate) fn push_comment(&mut self, comment_id: CommentId) {
        self.comments.push(comment_id);
    }

    pub(crate) fn push_friend(&mut self, user_id: UserId) {
        self.friends.push(user_id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    id: PostId,
    author_id: UserId,
    text: String,
    created_at: NaiveDateTime,
    comments: Vec<CommentId>,
}

impl Post {
    pub(crate) fn new(
        id: PostId,
        author_id: UserId,
        text: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Result<Self> {
        let text = text.into();
        validate_non_empty_text("post text", &text)?;

        Ok(Self {
            id,
            author_id,
            text,
            created_at,
            comments: Vec::new(),
        })
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn comments(&self) -> &[CommentId] {
        &self.comments
    }

    pub(crate) fn push_comment(&mut self, comment_id: CommentId) {
        self.comments.push(comment_id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    id: CommentId,
    author_id: UserId,
    post_id: PostId,
    text: String,
    created_at: NaiveDateTime,
}

impl Comment {
    pub(crate) fn new(
        id: CommentId,
        author_id: UserId,
        post_id: PostId,
        text: impl Into<String>,
        created_at: NaiveDateTime,
    ) -> Result<Self> {
        let text = text.into();
        validate_non_empty_text("comment text", &text)?;

        Ok(Self {
            id,
            author_id,
            post_id,
            text,
            created_at,
        })
    }

    pub fn id(&self) -> CommentId {
        self.id
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }
}
