//! Error types for searchstack.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StackError>;

#[derive(Debug, Error)]
pub enum StackError {
    /// Fatal at startup: bad connection map, unknown engine, malformed
    /// router list, missing default alias.
    #[error("configuration error: {0}")]
    Config(String),

    /// Recoverable: the model has no index registered for the requested
    /// connection. Callers treat this as "skip", not "abort".
    #[error("no index registered for model '{0}'")]
    NotHandled(String),

    /// The underlying search store failed or is unreachable. Fatal for the
    /// current alias; logged and re-raised, never swallowed.
    #[error("backend error ({alias}): {message}")]
    Backend { alias: String, message: String },

    #[error("query error: {0}")]
    Query(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StackError {
    pub fn backend(alias: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            alias: alias.into(),
            message: message.to_string(),
        }
    }

    /// True when the error means "this model is not indexed here" rather
    /// than a real failure.
    pub fn is_not_handled(&self) -> bool {
        matches!(self, Self::NotHandled(_))
    }
}
