use crate::domain::model::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SocialError {
    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },

    #[error("Duplicate id: {kind} {id} already exists")]
    DuplicateId { kind: EntityKind, id: u64 },

    #[error("User not found: {0}")]
    UserNotFound(u64),

    #[error("Post not found: {0}")]
    PostNotFound(u64),

    #[error("Comment not found: {0}")]
    CommentNotFound(u64),

    #[error("Friendship error: {reason}")]
    Friendship { reason: String },

    #[error("Malformed snapshot: {kind} '{key}': {reason}")]
    MalformedSnapshot {
        kind: EntityKind,
        key: String,
        reason: String,
    },

    #[error("Storage error at '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML error: {message}")]
    Xml { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Integrity,
    Data,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SocialError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(kind: EntityKind, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            kind,
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn xml(err: impl std::fmt::Display) -> Self {
        Self::Xml {
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::Friendship { .. } => ErrorCategory::Input,
            Self::DuplicateId { .. }
            | Self::UserNotFound(_)
            | Self::PostNotFound(_)
            | Self::CommentNotFound(_) => ErrorCategory::Integrity,
            Self::MalformedSnapshot { .. } | Self::Serialization(_) | Self::Xml { .. } => {
                ErrorCategory::Data
            }
            Self::Storage { .. } => ErrorCategory::Storage,
            Self::Config { .. } | Self::InvalidConfigValue { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Integrity => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Provide a non-empty value for the rejected field",
            Self::DuplicateId { .. } => "Choose an id that is not already in use",
            Self::UserNotFound(_) => "Create the user before referencing it",
            Self::PostNotFound(_) => "Create the post before commenting on it",
            Self::CommentNotFound(_) => "Check the comment id",
            Self::Friendship { .. } => "Pick two different users that are not already friends",
            Self::MalformedSnapshot { .. } => {
                "Inspect the exported file; the affected entity was skipped"
            }
            Self::Serialization(_) | Self::Xml { .. } => {
                "Make sure the file is a valid export in the selected format"
            }
            Self::Storage { .. } => "Check that the path exists and is readable/writable",
            Self::Config { .. } | Self::InvalidConfigValue { .. } => {
                "Review the TOML configuration file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Storage { path, .. } => format!("Could not access file '{}'", path),
            Self::Serialization(_) | Self::Xml { .. } => {
                format!("The file could not be parsed: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SocialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_critical() {
        let err = SocialError::storage(
            "missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("missing.json"));
    }

    #[test]
    fn test_lookup_errors_are_integrity() {
        assert_eq!(SocialError::UserNotFound(7).category(), ErrorCategory::Integrity);
        assert_eq!(SocialError::UserNotFound(7).to_string(), "User not found: 7");
    }
}
