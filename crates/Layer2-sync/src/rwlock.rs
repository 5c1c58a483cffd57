//! Readers-writer lock built from named semaphores
//!
//! 구성: reader light switch, writer light switch, 그리고 세 개의 named lock
//! (`no_readers`, `no_writers`, `readers_queue`). 별도의 mode 필드는 없다.
//!
//! - 활성 reader 그룹은 `no_writers` 를 쥐고 있으므로 writer 는 이미 입장한
//!   reader 들이 빠질 때까지 기다린다.
//! - 대기/활성 writer 그룹은 `no_readers` 를 쥐고 있으므로 새 reader 는 writer
//!   뒤에 줄을 선다. `readers_queue` 는 reader 입장을 한 번에 하나로 제한해
//!   writer 가 끼어들 수 있게 한다. 따라서 writer 대기 시간은 "이미 입장한
//!   reader 의 drain" 으로 bounded 된다.
//! - writer 끼리는 `no_writers` 로 상호 배제된다.

use crate::error::Result;
use crate::light_switch::LightSwitch;
use crate::manager::LockManager;
use crate::name::LockNames;
use crate::semaphore::NamedSemaphore;
use std::sync::Arc;
use tracing::{trace, warn};

pub struct ReadersWriterLock {
    names: LockNames,
    read_switch: LightSwitch,
    write_switch: LightSwitch,
    no_readers: Arc<NamedSemaphore>,
    no_writers: Arc<NamedSemaphore>,
    readers_queue: Arc<NamedSemaphore>,
}

impl ReadersWriterLock {
    /// Lock for `template`. Every lock built from the same manager and
    /// template shares the same underlying semaphores and counters.
    pub fn new(manager: &LockManager, template: &str) -> Result<Self> {
        let names = LockNames::for_template(template)?;
        Ok(Self {
            read_switch: LightSwitch::new(manager, names.read.clone())?,
            write_switch: LightSwitch::new(manager, names.write.clone())?,
            no_readers: manager.lock_for(&names.no_readers),
            no_writers: manager.lock_for(&names.no_writers),
            readers_queue: manager.lock_for(&names.readers_queue),
            names,
        })
    }

    pub fn names(&self) -> &LockNames {
        &self.names
    }

    /// Readers currently admitted
    pub fn active_readers(&self) -> u64 {
        self.read_switch.count()
    }

    /// Writers currently inside or waiting for the exclusive section
    pub fn pending_writers(&self) -> u64 {
        self.write_switch.count()
    }

    pub async fn reader_acquire(&self) -> Result<()> {
        // queue, no_readers 는 입장하는 동안만 잡는다 (drop 순서: no_readers → queue)
        let _queue = self.readers_queue.lock().await?;
        let _admission = self.no_readers.lock().await?;
        self.read_switch.acquire(&self.no_writers).await?;
        trace!(lock = %self.names.template, readers = self.active_readers(), "Reader admitted");
        Ok(())
    }

    pub fn reader_release(&self) -> Result<()> {
        self.read_switch.release(&self.no_writers)
    }

    pub async fn writer_acquire(&self) -> Result<()> {
        self.write_switch.acquire(&self.no_readers).await?;
        // no_writers 대기 중 실패하거나 future 가 취소되면 write switch 를 되돌린다
        let rollback = SwitchRollback {
            switch: &self.write_switch,
            companion: &self.no_readers,
            armed: true,
        };
        self.no_writers.acquire().await?;
        rollback.disarm();
        trace!(lock = %self.names.template, "Writer entered exclusive section");
        Ok(())
    }

    pub fn writer_release(&self) -> Result<()> {
        self.no_writers.release();
        self.write_switch.release(&self.no_readers)
    }

    /// Scoped reader acquisition
    pub async fn read(&self) -> Result<ReadGuard<'_>> {
        self.reader_acquire().await?;
        Ok(ReadGuard { lock: Some(self) })
    }

    /// Scoped writer acquisition
    pub async fn write(&self) -> Result<WriteGuard<'_>> {
        self.writer_acquire().await?;
        Ok(WriteGuard { lock: Some(self) })
    }
}

impl std::fmt::Debug for ReadersWriterLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadersWriterLock")
            .field("template", &self.names.template)
            .field("active_readers", &self.active_readers())
            .field("pending_writers", &self.pending_writers())
            .finish()
    }
}

struct SwitchRollback<'a> {
    switch: &'a LightSwitch,
    companion: &'a NamedSemaphore,
    armed: bool,
}

impl SwitchRollback<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SwitchRollback<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.switch.release(self.companion) {
                warn!(switch = %self.switch.name(), error = %e, "Failed to roll back light switch");
            }
        }
    }
}

/// Reader side held until dropped (or explicitly released)
#[must_use = "the reader lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: Option<&'a ReadersWriterLock>,
}

impl ReadGuard<'_> {
    pub fn release(mut self) -> Result<()> {
        match self.lock.take() {
            Some(lock) => lock.reader_release(),
            None => Ok(()),
        }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(e) = lock.reader_release() {
                warn!(lock = %lock.names.template, error = %e, "Failed to release reader lock");
            }
        }
    }
}

/// Writer side held until dropped (or explicitly released)
#[must_use = "the writer lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: Option<&'a ReadersWriterLock>,
}

impl WriteGuard<'_> {
    pub fn release(mut self) -> Result<()> {
        match self.lock.take() {
            Some(lock) => lock.writer_release(),
            None => Ok(()),
        }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(e) = lock.writer_release() {
                warn!(lock = %lock.names.template, error = %e, "Failed to release writer lock");
            }
        }
    }
}
