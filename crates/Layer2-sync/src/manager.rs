//! Lock manager
//!
//! 같은 이름의 lock 을 요청한 독립적인 호출자들이 하나의 semaphore 를 공유하도록
//! 이름 → 약한 참조 테이블로 handle 을 중복 제거한다. 전역 싱글톤 대신 필요한
//! 컴포넌트에 명시적으로 넘긴다. Light switch 카운터 저장소도 여기서 관리한다.

use crate::error::Result;
use crate::name::LockName;
use crate::semaphore::NamedSemaphore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use tracing::debug;

/// name → live handle. 테이블 mutex 는 lookup/insert 동안에만 잡는다.
#[derive(Default)]
pub(crate) struct HandleTable {
    entries: Mutex<HashMap<LockName, Weak<NamedSemaphore>>>,
}

impl HandleTable {
    /// Called from `NamedSemaphore::drop`. A newer handle registered under the
    /// same name in the meantime is left alone.
    pub(crate) fn forget(&self, name: &LockName, handle: *const NamedSemaphore) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(name) {
            if std::ptr::eq(entry.as_ptr(), handle) {
                entries.remove(name);
            }
        }
    }
}

/// Light switch counters, lazily created at 0. Held weakly like handles:
/// the entry goes away once every switch using it is dropped.
#[derive(Default)]
struct CounterStore {
    counters: Mutex<HashMap<LockName, Weak<AtomicU64>>>,
}

/// Process-wide registry of named locks and switch counters
#[derive(Clone, Default)]
pub struct LockManager {
    handles: Arc<HandleTable>,
    counters: Arc<CounterStore>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `name`, created on first use
    pub fn get_lock(&self, name: &str) -> Result<Arc<NamedSemaphore>> {
        let name = LockName::new(name)?;
        Ok(self.lock_for(&name))
    }

    /// Same as [`get_lock`](Self::get_lock) for an already validated name
    pub fn lock_for(&self, name: &LockName) -> Arc<NamedSemaphore> {
        let mut entries = self.handles.entries.lock();
        if let Some(handle) = entries.get(name).and_then(Weak::upgrade) {
            return handle;
        }

        let handle = Arc::new(NamedSemaphore::new(
            name.clone(),
            Arc::downgrade(&self.handles),
        ));
        entries.insert(name.clone(), Arc::downgrade(&handle));
        debug!(lock = %name, live = entries.len(), "Registered semaphore handle");
        handle
    }

    /// Shared counter for a light switch
    pub fn counter(&self, name: &LockName) -> Arc<AtomicU64> {
        let mut counters = self.counters.counters.lock();
        if let Some(counter) = counters.get(name).and_then(Weak::upgrade) {
            return counter;
        }

        counters.retain(|_, w| w.strong_count() > 0);
        let counter = Arc::new(AtomicU64::new(0));
        counters.insert(name.clone(), Arc::downgrade(&counter));
        counter
    }

    /// Number of switch counters still referenced somewhere
    pub fn live_counters(&self) -> usize {
        self.counters
            .counters
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Counter entries kept in the store, dead ones included until the next insert
    pub fn counter_entries(&self) -> usize {
        self.counters.counters.lock().len()
    }

    /// Number of cached handles still referenced somewhere
    pub fn live_handles(&self) -> usize {
        self.handles
            .entries
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        LockName::new(name)
            .map(|n| self.handles.entries.lock().contains_key(&n))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("live_handles", &self.live_handles())
            .field("live_counters", &self.live_counters())
            .finish()
    }
}
