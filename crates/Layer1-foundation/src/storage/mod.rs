//! Storage module for Hotswap
//!
//! - `slot`: ClassifierSlotRecord + SlotStore trait (+ in-memory store)
//! - `db`: SQLite - slot record 영속화
//! - `json`: JSON - 범용 파일 저장/로드

mod db;
mod json;
mod slot;

// Slot records
pub use slot::{ClassifierSlotRecord, MemorySlotStore, SlotStore};

// SQLite Storage
pub use db::{SqliteSlotStore, SLOT_DB_FILE};

// JSON Storage (범용)
pub use json::JsonStore;
