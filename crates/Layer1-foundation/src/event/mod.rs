//! Event System - 학습 이벤트 발행/구독
//!
//! Coordinator 는 `EventSink` 에만 의존한다. 운영 환경에서는 `EventBus`
//! 를 넘겨 리스너(알림, 감사 로그 등)를 붙이고, 간단한 경우 `TracingSink` 를 쓴다.
//!
//! ```ignore
//! let bus = Arc::new(EventBus::new());
//! bus.subscribe(Arc::new(MyListener)).await;
//! bus.notify(EventKind::TrainingStarted, job_id, "training started").await;
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusConfig, EventListener, EventSink, ListenerId, TracingSink};
pub use types::{EventId, EventKind, TrainingEvent};
