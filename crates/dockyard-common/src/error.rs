//! Unified error types for the Dockyard workspace.
//!
//! The model layer distinguishes three failure families: malformed port
//! tokens ([`DockyardError::Format`]), persisted records that fail validation
//! once every legacy fallback has been applied ([`DockyardError::Schema`]),
//! and lifecycle transitions the state machine does not allow
//! ([`DockyardError::InvalidTransition`]). None of them is retried here.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DockyardError {
    /// A port token, legacy port spec or bind spec could not be decoded.
    #[error("malformed token {input:?}: {reason}")]
    Format {
        /// The offending input.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A persisted record is structurally readable but fails validation.
    #[error("invalid {record} record: {message}")]
    Schema {
        /// Kind of record being loaded (`container`, `image`, `state`...).
        record: &'static str,
        /// Description of the violated requirement.
        message: String,
    },

    /// A lifecycle transition was requested from a state that forbids it.
    #[error("cannot {action} a container that is {from}")]
    InvalidTransition {
        /// The transition that was attempted.
        action: &'static str,
        /// The lifecycle phase the state was in.
        from: &'static str,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A requested record was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing record.
        kind: &'static str,
        /// Identifier of the missing record.
        id: String,
    },

    /// A write-once record already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Type of the conflicting record.
        kind: &'static str,
        /// Identifier of the conflicting record.
        id: String,
    },

    /// A short identifier matches more than one record.
    #[error("{kind} prefix {prefix:?} is ambiguous")]
    Ambiguous {
        /// Type of the records matched.
        kind: &'static str,
        /// The prefix that was looked up.
        prefix: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl DockyardError {
    /// Shorthand for a [`DockyardError::Schema`] error.
    pub fn schema(record: &'static str, message: impl Into<String>) -> Self {
        Self::Schema {
            record,
            message: message.into(),
        }
    }

    /// Shorthand for a [`DockyardError::Format`] error.
    pub fn format(input: impl Into<String>, reason: &'static str) -> Self {
        Self::Format {
            input: input.into(),
            reason,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DockyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_action_and_phase() {
        let err = DockyardError::InvalidTransition {
            action: "mark as ghost",
            from: "exited",
        };
        assert_eq!(err.to_string(), "cannot mark as ghost a container that is exited");
    }

    #[test]
    fn format_error_quotes_input() {
        let err = DockyardError::format("8080", "missing '/' separator");
        assert_eq!(
            err.to_string(),
            "malformed token \"8080\": missing '/' separator"
        );
    }

    #[test]
    fn ambiguous_prefix_message() {
        let err = DockyardError::Ambiguous {
            kind: "container",
            prefix: "4f".into(),
        };
        assert_eq!(err.to_string(), "container prefix \"4f\" is ambiguous");
    }

    #[test]
    fn serde_errors_convert_into_serialization() {
        let source = serde_json::from_str::<u32>("nope").expect_err("must fail");
        let err: DockyardError = source.into();
        assert!(matches!(err, DockyardError::Serialization { .. }));
    }
}
