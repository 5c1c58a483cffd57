//! # hotswap-sync
//!
//! Lock substrate for the hot-swap classifier:
//! - `NamedSemaphore`: 이름으로 식별되는 semaphore (초기값 1)
//! - `LockManager`: 이름별 handle 중복 제거 캐시 + light switch 카운터
//! - `LightSwitch`: 첫 입장자가 companion lock 을 잡고 마지막 퇴장자가 놓는다
//! - `ReadersWriterLock`: 두 light switch + 세 named lock, writer starvation 방지
//!
//! ```ignore
//! let manager = LockManager::new();
//! let lock = ReadersWriterLock::new(&manager, "classifier247-job-1")?;
//!
//! {
//!     let _reader = lock.read().await?;
//!     // serve
//! }
//!
//! let writer = lock.write().await?;
//! // swap
//! drop(writer);
//! ```

pub mod error;
pub mod light_switch;
pub mod manager;
pub mod name;
pub mod rwlock;
pub mod semaphore;

pub use error::{Result, SyncError};
pub use light_switch::LightSwitch;
pub use manager::LockManager;
pub use name::{LockName, LockNames, MAX_LOCK_NAME_LEN};
pub use rwlock::{ReadGuard, ReadersWriterLock, WriteGuard};
pub use semaphore::{NamedSemaphore, SemaphoreGuard, INITIAL_VALUE};
