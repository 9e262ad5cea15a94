pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, Command};

pub use crate::adapters::{JsonCodec, LocalStorage, XmlCodec};
pub use crate::config::AppConfig;
pub use crate::core::graph::{DanglingRef, GraphStats, RefTarget, SocialGraph};
pub use crate::core::serializer::{Format, Serializer};
pub use crate::core::snapshot::{GraphSnapshot, LoadReport};
pub use crate::utils::error::{Result, SocialError};
