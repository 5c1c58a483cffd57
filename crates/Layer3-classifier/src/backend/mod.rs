//! Classifier backend contract
//!
//! 백엔드는 교체 가능한 외부 구현이다. coordinator 는 이 trait 만 보고
//! `reader_ref` / `writer_ref` 로 인스턴스를 구분한다.
//!
//! - 학습 계열 (`train`, `update`, `get_train_status`) 은 `TrainingError` 로 실패를 분류
//! - 서빙 계열 (`classify`, `classify_with_info`, `analyze`) 은 인프라 에러만 반환

pub mod keyword;

pub use keyword::{KeywordClassifier, KEYWORD_KIND};

use crate::error::{Result, TrainingError};
use crate::types::{Classification, Label, PerformanceReport, Sample, TrainStatus};
use async_trait::async_trait;

/// One swappable classifier instance
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Backend family (matches `ClassifierSlotRecord::kind`)
    fn kind(&self) -> &str;

    /// Opaque reference stored in the slot record
    fn instance_ref(&self) -> &str;

    /// Start a full retrain from scratch
    async fn train(&self, samples: &[Sample]) -> std::result::Result<(), TrainingError>;

    /// Start an incremental update on top of the current model
    async fn update(&self, samples: &[Sample]) -> std::result::Result<(), TrainingError>;

    /// Completion status of the last `train` / `update`
    async fn get_train_status(&self) -> std::result::Result<TrainStatus, TrainingError>;

    /// Predict a label; `None` when the model has nothing to offer
    async fn classify(&self, sample: &Sample) -> Result<Option<Label>>;

    /// Predict a label with backend specific metadata
    async fn classify_with_info(&self, sample: &Sample) -> Result<Option<Classification>> {
        Ok(self.classify(sample).await?.map(Classification::new))
    }

    async fn analyze(&self) -> Result<PerformanceReport>;
}
