//! Config - 통합 설정 관리
//!
//! - `hotswap.rs` - HotswapConfig 통합 설정 (polling, locks, storage)

mod hotswap;

pub use hotswap::{HotswapConfig, PollingConfig, HOTSWAP_CONFIG_FILE};
