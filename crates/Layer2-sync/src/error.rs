//! Lock substrate errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Lock name rejected (empty, too long, or containing `/` / NUL)
    #[error("Invalid lock name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The underlying semaphore was closed while waiting
    #[error("Semaphore closed: {0}")]
    Closed(String),

    /// A release without a matching acquire
    #[error("Unbalanced release on {0}")]
    Unbalanced(String),
}

impl SyncError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SyncError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
