//! Sample / label / report types shared by backends and the coordinator

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Classification label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub String);

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A training or classification sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub text: String,

    /// Present for training samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

impl Sample {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            label: None,
        }
    }

    pub fn labeled(text: impl Into<String>, label: impl Into<Label>) -> Self {
        Self {
            id: None,
            text: text.into(),
            label: Some(label.into()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// `classify_with_info` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: Label,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Classification {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            metadata: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// `analyze` result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub kind: String,
    pub instance_ref: String,
    pub trained: bool,
    pub sample_count: u64,

    /// Training samples per label
    #[serde(default)]
    pub labels: BTreeMap<Label, u64>,

    /// Accuracy measured on the last training set, if the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Asynchronous training job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStatus {
    Running,
    Done,
}

/// Result of one `train` / `update` attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// Writer finished and the roles were swapped
    Success,
    /// Transient failure, no swap
    RetryableError(String),
    /// Terminal failure, no swap, trained flag forced false
    FatalError(String),
    /// The configured polling deadline passed before the backend reported `Done`
    DeadlineExceeded,
}

impl TrainingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainingOutcome::Success)
    }
}
