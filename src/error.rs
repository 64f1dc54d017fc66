//! Errors raised while keeping a derived view in sync with its source.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The source delivered a change that does not fit the
    /// state the view has seen so far.
    #[error("invalid {action} event: {reason}")]
    InvalidEvent { action: &'static str, reason: String },

    #[error("input is already mapped to an output")]
    DuplicateIdentity,

    #[error("view has been disposed")]
    Disposed,

    /// A predicate, key or mapping panicked halfway through an update.
    #[error("an earlier update was interrupted by a panic")]
    Interrupted,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ViewError {
    pub fn invalid(action: &'static str, reason: impl Into<String>) -> Self {
        ViewError::InvalidEvent {
            action,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;
