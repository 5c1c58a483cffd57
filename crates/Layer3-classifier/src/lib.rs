//! # hotswap-classifier
//!
//! Online classifier hot-swap:
//! - `Classifier247`: 재학습 coordinator + 서빙 경로
//! - `ClassifierBackend`: 교체 가능한 백엔드 trait (`KeywordClassifier` 내장)
//! - `BackendRegistry`: slot ref → 백엔드 인스턴스
//! - `ClassifierFactory`: job 별 classifier 초기화 / 캐시
//! - `PollSchedule`: 학습 완료 polling 간격
//!
//! ## 흐름
//!
//! ```text
//! train/update ─► modify mutex ─► writer.train ─► poll (15s, 30s, ... ≤ 600s)
//!                                                     │ Done
//!                                                     ▼
//!                               write lock ─► reader_ref ⇄ writer_ref ─► save
//!
//! classify ─► read lock ─► reader.classify
//! ```

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod poll;
pub mod registry;
pub mod types;

pub use backend::{ClassifierBackend, KeywordClassifier, KEYWORD_KIND};
pub use coordinator::{Classifier247, ClassifierContext, DEFAULT_LOCK_NAMESPACE};
pub use error::{ClassifierError, Result, TrainingError};
pub use factory::ClassifierFactory;
pub use poll::PollSchedule;
pub use registry::{BackendConstructor, BackendRegistry};
pub use types::{
    Classification, Label, PerformanceReport, Sample, TrainStatus, TrainingOutcome,
};
