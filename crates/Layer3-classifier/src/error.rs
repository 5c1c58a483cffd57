//! Classifier error types
//!
//! `TrainingError` 는 백엔드가 학습 실패를 분류해서 돌려주는 값이고,
//! coordinator 경계를 넘어가지 않는다. `ClassifierError` 는 lock, 저장소,
//! 백엔드 조회 같은 인프라 실패다.

use hotswap_foundation::Error as FoundationError;
use hotswap_sync::SyncError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Training failure severity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrainingError {
    /// Transient; calling `train` again later is expected to help
    #[error("Retryable training error: {0}")]
    Retryable(String),

    /// Terminal for this attempt; needs operator attention
    #[error("Fatal training error: {0}")]
    Fatal(String),
}

impl TrainingError {
    pub fn retryable(message: impl Into<String>) -> Self {
        TrainingError::Retryable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        TrainingError::Fatal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TrainingError::Retryable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            TrainingError::Retryable(msg) | TrainingError::Fatal(msg) => msg,
        }
    }
}

/// Infrastructure errors surfaced to callers of the coordinator
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Lock error: {0}")]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Foundation(#[from] FoundationError),

    #[error("Unknown backend kind: {0}")]
    UnknownKind(String),

    #[error("Backend instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Classifier for job {0} is already initialized")]
    AlreadyInitialized(u64),

    #[error("Classifier for job {0} is not initialized")]
    NotInitialized(u64),

    #[error("Backend error: {backend} - {message}")]
    Backend { backend: String, message: String },
}

impl ClassifierError {
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        ClassifierError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
