//! Light switch
//!
//! "지금 역할 X 를 가진 holder 가 몇 명인가" 카운터. 첫 번째 holder(0→1)가
//! 그룹을 대신해 companion lock 을 잡고, 마지막 holder(1→0)가 놓는다.
//!
//! Acquire 는 switch 의 private mutex 로 직렬화된다. 첫 holder 는 mutex 를 쥔 채
//! companion 을 기다리므로, 그 사이 들어온 holder 는 companion 이 잡힐 때까지
//! 통과하지 못한다. Release 는 카운터를 CAS 로 감소시키므로 mutex 를 기다리지
//! 않고 동기적으로 끝난다 (Drop 에서 호출 가능). 카운터가 0 인 동안에는 살아있는
//! holder 가 없으므로 0→1 전이와 release 가 경쟁하지 않는다.

use crate::error::{Result, SyncError};
use crate::manager::LockManager;
use crate::name::LockName;
use crate::semaphore::NamedSemaphore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

pub struct LightSwitch {
    name: LockName,
    mutex: Arc<NamedSemaphore>,
    counter: Arc<AtomicU64>,
}

impl LightSwitch {
    /// Switch named `name`; its private mutex is `<name>-mutex`.
    /// Switches built from the same manager and name share state.
    pub fn new(manager: &LockManager, name: LockName) -> Result<Self> {
        let mutex = manager.lock_for(&name.with_suffix("-mutex")?);
        let counter = manager.counter(&name);
        Ok(Self {
            name,
            mutex,
            counter,
        })
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    /// Number of un-released `acquire` calls
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    pub async fn acquire(&self, companion: &NamedSemaphore) -> Result<()> {
        let _serial = self.mutex.lock().await?;

        let mut current = self.counter.load(Ordering::Acquire);
        loop {
            if current == 0 {
                // 실패하면 카운터는 그대로 0
                companion.acquire().await?;
                self.counter.fetch_add(1, Ordering::AcqRel);
                trace!(switch = %self.name, companion = %companion.name(), "First holder took companion");
                return Ok(());
            }
            match self.counter.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                // 마지막 holder 가 방금 나갔으면 0 을 보고 companion 부터 잡는다
                Err(observed) => current = observed,
            }
        }
    }

    pub fn release(&self, companion: &NamedSemaphore) -> Result<()> {
        let mut current = self.counter.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(SyncError::Unbalanced(self.name.to_string()));
            }
            match self.counter.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if current == 1 {
                        companion.release();
                        trace!(switch = %self.name, companion = %companion.name(), "Last holder released companion");
                    }
                    return Ok(());
                }
                Err(observed) => current = observed,
            }
        }
    }
}

impl std::fmt::Debug for LightSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSwitch")
            .field("name", &self.name)
            .field("count", &self.count())
            .finish()
    }
}
