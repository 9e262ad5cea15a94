pub mod graph;
pub mod serializer;
pub mod snapshot;

pub use crate::domain::model::{Comment, CommentId, EntityKind, Post, PostId, User, UserId};
pub use crate::domain::ports::{Clock, SnapshotCodec, Storage, SystemClock};
pub use crate::utils::error::Result;
