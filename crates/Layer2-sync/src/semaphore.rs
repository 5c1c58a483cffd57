//! Named semaphore
//!
//! 이름으로 식별되는 binary/counting semaphore (초기값 1). 프로세스 로컬
//! 핸들이고 `LockManager` 를 통해서만 얻을 수 있다. 마지막 참조가 사라지면
//! semaphore 를 닫고 handle cache 에서 자기 항목을 지운다.
//!
//! Permit 은 RAII 로 묶이지 않는다: `acquire` 한 태스크와 `release` 하는
//! 태스크가 달라도 된다 (light switch 의 companion lock 이 그렇게 쓰인다).

use crate::error::{Result, SyncError};
use crate::manager::HandleTable;
use crate::name::LockName;
use std::sync::{Arc, Weak};
use tokio::sync::Semaphore;
use tracing::trace;

/// Initial value of every named semaphore
pub const INITIAL_VALUE: usize = 1;

pub struct NamedSemaphore {
    name: LockName,
    inner: Semaphore,
    table: Weak<HandleTable>,
}

impl NamedSemaphore {
    pub(crate) fn new(name: LockName, table: Weak<HandleTable>) -> Self {
        trace!(lock = %name, "Creating semaphore");
        Self {
            name,
            inner: Semaphore::new(INITIAL_VALUE),
            table,
        }
    }

    pub fn name(&self) -> &LockName {
        &self.name
    }

    /// Wait (P). Waiters are served in FIFO order.
    pub async fn acquire(&self) -> Result<()> {
        trace!(lock = %self.name, "acquire");
        let permit = self
            .inner
            .acquire()
            .await
            .map_err(|_| SyncError::Closed(self.name.to_string()))?;
        permit.forget();
        Ok(())
    }

    /// Non-blocking wait; true if the semaphore was decremented
    pub fn try_acquire(&self) -> bool {
        match self.inner.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    /// Signal (V)
    pub fn release(&self) {
        trace!(lock = %self.name, "release");
        self.inner.add_permits(1);
    }

    /// Current semaphore value
    pub fn value(&self) -> usize {
        self.inner.available_permits()
    }

    /// Scoped acquisition: released when the guard is dropped
    pub async fn lock(self: &Arc<Self>) -> Result<SemaphoreGuard> {
        self.acquire().await?;
        Ok(SemaphoreGuard {
            semaphore: Arc::clone(self),
        })
    }
}

impl std::fmt::Debug for NamedSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSemaphore")
            .field("name", &self.name)
            .field("value", &self.value())
            .finish()
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        self.inner.close();
        if let Some(table) = self.table.upgrade() {
            table.forget(&self.name, self as *const NamedSemaphore);
        }
        trace!(lock = %self.name, "Closed semaphore");
    }
}

/// Holds one unit of a [`NamedSemaphore`] until dropped
#[derive(Debug)]
pub struct SemaphoreGuard {
    semaphore: Arc<NamedSemaphore>,
}

impl SemaphoreGuard {
    pub fn semaphore(&self) -> &Arc<NamedSemaphore> {
        &self.semaphore
    }
}

impl Drop for SemaphoreGuard {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
