//! # hotswap-foundation
//!
//! Foundation layer for Hotswap:
//! - Error: 공통 에러 타입
//! - Config: 통합 설정 (HotswapConfig, PollingConfig)
//! - Storage: SQLite slot store, in-memory slot store, JsonStore
//! - Event: 학습 이벤트 sink / bus
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Classifier247 (Layer3)                      │
//! │      │ get / save          │ notify          │
//! │      ▼                     ▼                 │
//! │  SlotStore            EventSink              │
//! │  ├── SqliteSlotStore  ├── EventBus           │
//! │  └── MemorySlotStore  └── TracingSink        │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{HotswapConfig, PollingConfig, HOTSWAP_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    ClassifierSlotRecord, JsonStore, MemorySlotStore, SlotStore, SqliteSlotStore, SLOT_DB_FILE,
};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    EventBus, EventBusConfig, EventId, EventKind, EventListener, EventSink, ListenerId,
    TracingSink, TrainingEvent,
};
