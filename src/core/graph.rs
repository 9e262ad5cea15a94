use crate::domain::model::{Comment, CommentId, EntityKind, Post, PostId, User, UserId};
use crate::domain::ports::{Clock, SystemClock};
use crate::utils::error::{Result, SocialError};
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::sync::Arc;

/// 社群圖聚合：所有實體的唯一擁有者
///
/// 實體以 id 為鍵存放於三張表中；使用者與貼文上的關聯清單只記錄 id，
/// 因此不會形成擁有權循環。所有建立操作先完成驗證才寫入，失敗時狀態不變。
pub struct SocialGraph {
    users: BTreeMap<UserId, User>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    clock: Arc<dyn Clock + Send + Sync>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub friendships: usize,
}

/// 關聯清單中無法解析的項目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub owner_kind: EntityKind,
    pub owner_id: u64,
    pub target_kind: EntityKind,
    pub target: RefTarget,
}

/// 關聯清單項目：合法的 id，或匯入時無法當成 id 的原始值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Id(u64),
    Invalid(String),
}

impl From<u64> for RefTarget {
    fn from(id: u64) -> Self {
        RefTarget::Id(id)
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Id(id) => write!(f, "{}", id),
            RefTarget::Invalid(raw) => write!(f, "<invalid {}>", raw),
        }
    }
}

impl fmt::Display for DanglingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {}",
            self.owner_kind, self.owner_id, self.target_kind, self.target
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkOutcome {
    Linked,
    AlreadyLinked,
    Dangling,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            users: BTreeMap::new(),
            posts: BTreeMap::new(),
            comments: BTreeMap::new(),
            clock: Arc::new(clock),
        }
    }

    pub fn add_user(
        &mut self,
        id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<&User> {
        let user = User::new(id, username, email, self.clock.now())?;

        match self.users.entry(id) {
            Entry::Occupied(_) => Err(SocialError::DuplicateId {
                kind: EntityKind::User,
                id,
            }),
            Entry::Vacant(slot) => {
                tracing::debug!("Added user {} ({})", id, user.username());
                Ok(slot.insert(user))
            }
        }
    }

    pub fn add_post(&mut self, id: PostId, author_id: UserId, text: impl Into<String>) -> Result<&Post> {
        if !self.users.contains_key(&author_id) {
            return Err(SocialError::UserNotFound(author_id));
        }
        let post = Post::new(id, author_id, text, self.clock.now())?;
        if self.posts.contains_key(&id) {
            return Err(SocialError::DuplicateId {
                kind: EntityKind::Post,
                id,
            });
        }

        self.posts.insert(id, post);
        if let Some(author) = self.users.get_mut(&author_id) {
            author.push_post(id);
        }
        tracing::debug!("Added post {} by user {}", id, author_id);
        Ok(&self.posts[&id])
    }

    pub fn add_comment(
        &mut self,
        id: CommentId,
        author_id: UserId,
        post_id: PostId,
        text: impl Into<String>,
    ) -> Result<&Comment> {
        if !self.users.contains_key(&author_id) {
            return Err(SocialError::UserNotFound(author_id));
        }
        if !self.posts.contains_key(&post_id) {
            return Err(SocialError::PostNotFound(post_id));
        }
        let comment = Comment::new(id, author_id, post_id, text, self.clock.now())?;
        if self.comments.contains_key(&id) {
            return Err(SocialError::DuplicateId {
                kind: EntityKind::Comment,
                id,
            });
        }

        self.comments.insert(id, comment);
        if let Some(post) = self.posts.get_mut(&post_id) {
            post.push_comment(id);
        }
        if let Some(author) = self.users.get_mut(&author_id) {
            author.push_comment(id);
        }
        tracing::debug!("Added comment {} by user {} on post {}", id, author_id, post_id);
        Ok(&self.comments[&id])
    }

    /// 建立雙向好友關係
    pub fn add_friendship(&mut self, user_id: UserId, friend_id: UserId) -> Result<()> {
        let user = self.get_user(user_id)?;
        self.get_user(friend_id)?;

        if user_id == friend_id {
            return Err(SocialError::Friendship {
                reason: format!("user {} cannot befriend themselves", user_id),
            });
        }
        if user.is_friend_of(friend_id) {
            return Err(SocialError::Friendship {
                reason: format!("users {} and {} are already friends", user_id, friend_id),
            });
        }

        self.link_friends(user_id, friend_id);
        tracing::debug!("Users {} and {} are now friends", user_id, friend_id);
        Ok(())
    }

    pub fn get_user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or(SocialError::UserNotFound(id))
    }

    pub fn get_post(&self, id: PostId) -> Result<&Post> {
        self.posts.get(&id).ok_or(SocialError::PostNotFound(id))
    }

    pub fn get_comment(&self, id: CommentId) -> Result<&Comment> {
        self.comments.get(&id).ok_or(SocialError::CommentNotFound(id))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }

    pub fn posts_by_user(&self, user_id: UserId) -> Result<Vec<&Post>> {
        let user = self.get_user(user_id)?;
        Ok(user.posts().iter().filter_map(|id| self.posts.get(id)).collect())
    }

    pub fn comments_by_user(&self, user_id: UserId) -> Result<Vec<&Comment>> {
        let user = self.get_user(user_id)?;
        Ok(user
            .comments()
            .iter()
            .filter_map(|id| self.comments.get(id))
            .collect())
    }

    pub fn comments_on_post(&self, post_id: PostId) -> Result<Vec<&Comment>> {
        let post = self.get_post(post_id)?;
        Ok(post
            .comments()
            .iter()
            .filter_map(|id| self.comments.get(id))
            .collect())
    }

    pub fn friends_of(&self, user_id: UserId) -> Result<Vec<&User>> {
        let user = self.get_user(user_id)?;
        Ok(user.friends().iter().filter_map(|id| self.users.get(id)).collect())
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            users: self.users.len(),
            posts: self.posts.len(),
            comments: self.comments.len(),
            friendships: self.users.values().map(|u| u.friends().len()).sum::<usize>() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.posts.is_empty() && self.comments.is_empty()
    }

    /// 稽核所有關聯清單；由工廠方法建立的圖永遠回傳空清單
    pub fn dangling_references(&self) -> Vec<DanglingRef> {
        let mut dangling = Vec::new();

        for user in self.users.values() {
            for &post_id in user.posts() {
                let owned = self
                    .posts
                    .get(&post_id)
                    .is_some_and(|p| p.author_id() == user.id());
                if !owned {
                    dangling.push(DanglingRef {
                        owner_kind: EntityKind::User,
                        owner_id: user.id(),
                        target_kind: EntityKind::Post,
                        target: post_id.into(),
                    });
                }
            }
            for &comment_id in user.comments() {
                let owned = self
                    .comments
                    .get(&comment_id)
                    .is_some_and(|c| c.author_id() == user.id());
                if !owned {
                    dangling.push(DanglingRef {
                        owner_kind: EntityKind::User,
                        owner_id: user.id(),
                        target_kind: EntityKind::Comment,
                        target: comment_id.into(),
                    });
                }
            }
            for &friend_id in user.friends() {
                if !self.users.contains_key(&friend_id) {
                    dangling.push(DanglingRef {
                        owner_kind: EntityKind::User,
                        owner_id: user.id(),
                        target_kind: EntityKind::User,
                        target: friend_id.into(),
                    });
                }
            }
        }

        for post in self.posts.values() {
            for &comment_id in post.comments() {
                let attached = self
                    .comments
                    .get(&comment_id)
                    .is_some_and(|c| c.post_id() == post.id());
                if !attached {
                    dangling.push(DanglingRef {
                        owner_kind: EntityKind::Post,
                        owner_id: post.id(),
                        target_kind: EntityKind::Comment,
                        target: comment_id.into(),
                    });
                }
            }
        }

        dangling
    }

    // 以下供快照重建使用：物件階段只放入實體，關聯階段再串接

    pub(crate) fn insert_user(&mut self, user: User) -> Result<()> {
        match self.users.entry(user.id()) {
            Entry::Occupied(_) => Err(SocialError::DuplicateId {
                kind: EntityKind::User,
                id: user.id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    pub(crate) fn insert_post(&mut self, post: Post) -> Result<()> {
        if !self.users.contains_key(&post.author_id()) {
            return Err(SocialError::UserNotFound(post.author_id()));
        }
        match self.posts.entry(post.id()) {
            Entry::Occupied(_) => Err(SocialError::DuplicateId {
                kind: EntityKind::Post,
                id: post.id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(post);
                Ok(())
            }
        }
    }

    pub(crate) fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        if !self.users.contains_key(&comment.author_id()) {
            return Err(SocialError::UserNotFound(comment.author_id()));
        }
        if !self.posts.contains_key(&comment.post_id()) {
            return Err(SocialError::PostNotFound(comment.post_id()));
        }
        match self.comments.entry(comment.id()) {
            Entry::Occupied(_) => Err(SocialError::DuplicateId {
                kind: EntityKind::Comment,
                id: comment.id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(comment);
                Ok(())
            }
        }
    }

    pub(crate) fn link_user_post(&mut self, user_id: UserId, post_id: PostId) -> LinkOutcome {
        let owned = self
            .posts
            .get(&post_id)
            .is_some_and(|p| p.author_id() == user_id);
        let Some(user) = self.users.get_mut(&user_id) else {
            return LinkOutcome::Dangling;
        };
        if !owned {
            LinkOutcome::Dangling
        } else if user.posts().contains(&post_id) {
            LinkOutcome::AlreadyLinked
        } else {
            user.push_post(post_id);
            LinkOutcome::Linked
        }
    }

    pub(crate) fn link_user_comment(&mut self, user_id: UserId, comment_id: CommentId) -> LinkOutcome {
        let owned = self
            .comments
            .get(&comment_id)
            .is_some_and(|c| c.author_id() == user_id);
        let Some(user) = self.users.get_mut(&user_id) else {
            return LinkOutcome::Dangling;
        };
        if !owned {
            LinkOutcome::Dangling
        } else if user.comments().contains(&comment_id) {
            LinkOutcome::AlreadyLinked
        } else {
            user.push_comment(comment_id);
            LinkOutcome::Linked
        }
    }

    pub(crate) fn link_post_comment(&mut self, post_id: PostId, comment_id: CommentId) -> LinkOutcome {
        let attached = self
            .comments
            .get(&comment_id)
            .is_some_and(|c| c.post_id() == post_id);
        let Some(post) = self.posts.get_mut(&post_id) else {
            return LinkOutcome::Dangling;
        };
        if !attached {
            LinkOutcome::Dangling
        } else if post.comments().contains(&comment_id) {
            LinkOutcome::AlreadyLinked
        } else {
            post.push_comment(comment_id);
            LinkOutcome::Linked
        }
    }

    pub(crate) fn link_friends(&mut self, user_id: UserId, friend_id: UserId) -> LinkOutcome {
        if user_id == friend_id
            || !self.users.contains_key(&user_id)
            || !self.users.contains_key(&friend_id)
        {
            return LinkOutcome::Dangling;
        }

        let mut outcome = LinkOutcome::AlreadyLinked;
        for (from, to) in [(user_id, friend_id), (friend_id, user_id)] {
            if let Some(user) = self.users.get_mut(&from) {
                if !user.is_friend_of(to) {
                    user.push_friend(to);
                    outcome = LinkOutcome::Linked;
                }
            }
        }
        outcome
    }
}

impl Default for SocialGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SocialGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialGraph")
            .field("users", &self.users)
            .field("posts", &self.posts)
            .field("comments", &self.comments)
            .finish_non_exhaustive()
    }
}
