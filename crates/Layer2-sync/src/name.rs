//! Lock names
//!
//! 하나의 template id 로부터 필요한 모든 lock 이름을 결정적으로 만든다.

use crate::error::{Result, SyncError};
use std::fmt;

/// Maximum accepted name length (POSIX named semaphores allow NAME_MAX - 4)
pub const MAX_LOCK_NAME_LEN: usize = 251;

/// Name of one logical lock resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockName(String);

impl LockName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SyncError::invalid_name(name, "empty"));
        }
        if name.len() > MAX_LOCK_NAME_LEN {
            return Err(SyncError::invalid_name(
                name,
                format!("longer than {} bytes", MAX_LOCK_NAME_LEN),
            ));
        }
        if name.contains('/') || name.contains('\0') {
            return Err(SyncError::invalid_name(name, "contains '/' or NUL"));
        }
        Ok(Self(name))
    }

    /// `<self><suffix>`
    pub fn with_suffix(&self, suffix: &str) -> Result<Self> {
        Self::new(format!("{}{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LockName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// All names derived from one template id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockNames {
    pub template: LockName,
    /// Reader light switch (counter key; its private mutex is `<read>-mutex`)
    pub read: LockName,
    /// Writer light switch (counter key; its private mutex is `<write>-mutex`)
    pub write: LockName,
    pub no_readers: LockName,
    pub no_writers: LockName,
    pub readers_queue: LockName,
    /// Retrain ("modify") mutex
    pub mutex: LockName,
}

impl LockNames {
    pub fn for_template(template: &str) -> Result<Self> {
        let template = LockName::new(template)?;
        Ok(Self {
            read: template.with_suffix("-read")?,
            write: template.with_suffix("-write")?,
            no_readers: template.with_suffix("-no_readers")?,
            no_writers: template.with_suffix("-no_writers")?,
            readers_queue: template.with_suffix("-readers_queue")?,
            mutex: template.with_suffix("-mutex")?,
            template,
        })
    }
}
