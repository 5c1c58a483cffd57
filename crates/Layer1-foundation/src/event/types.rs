//! Event Types - 학습/서빙 이벤트 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// 새 이벤트 ID 생성
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Kind
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Retrain accepted by the modify mutex
    TrainingStarted,
    /// Role swap persisted
    TrainingFinished,
    /// Transient failure, retrain may be re-invoked later
    RetryableTrainingError,
    /// Terminal failure for this attempt, needs operator attention
    FatalTrainingError,
    /// A sample was served by the reader instance
    SampleClassified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrainingStarted => "TrainingStarted",
            Self::TrainingFinished => "TrainingFinished",
            Self::RetryableTrainingError => "RetryableTrainingError",
            Self::FatalTrainingError => "FatalTrainingError",
            Self::SampleClassified => "SampleClassified",
        }
    }

    /// 에러 이벤트 여부
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::RetryableTrainingError | Self::FatalTrainingError
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TrainingEvent
// ============================================================================

/// Event published through an [`EventSink`](super::EventSink)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub job_id: u64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TrainingEvent {
    pub fn new(kind: EventKind, job_id: u64, message: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            kind,
            job_id,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_name() {
        let json = serde_json::to_string(&EventKind::FatalTrainingError).unwrap();
        assert_eq!(json, "\"FatalTrainingError\"");
        assert_eq!(EventKind::FatalTrainingError.to_string(), "FatalTrainingError");
    }

    #[test]
    fn test_error_kinds() {
        assert!(EventKind::RetryableTrainingError.is_error());
        assert!(EventKind::FatalTrainingError.is_error());
        assert!(!EventKind::TrainingFinished.is_error());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = TrainingEvent::new(EventKind::TrainingStarted, 1, "start");
        let b = TrainingEvent::new(EventKind::TrainingStarted, 1, "start");
        assert_ne!(a.id, b.id);
    }
}
