//! Hotswap Config - 통합 설정
//!
//! 글로벌(`<config_dir>/hotswap/config.json`) + 프로젝트(`.hotswap/config.json`) 병합

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 설정 파일명
pub const HOTSWAP_CONFIG_FILE: &str = "config.json";

fn default_version() -> u32 {
    1
}

fn default_backend() -> String {
    "keyword".to_string()
}

fn default_lock_namespace() -> String {
    "classifier247".to_string()
}

// ============================================================================
// Hotswap Config (통합)
// ============================================================================

/// Hotswap 통합 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotswapConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 데이터 디렉토리 (slot DB, 모델 스냅샷). None 이면 플랫폼 기본 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// 새 classifier 의 기본 백엔드 종류
    #[serde(default = "default_backend")]
    pub default_backend: String,

    /// Lock 이름 prefix
    #[serde(default = "default_lock_namespace")]
    pub lock_namespace: String,

    /// 학습 완료 polling 설정
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for HotswapConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: None,
            default_backend: default_backend(),
            lock_namespace: default_lock_namespace(),
            polling: PollingConfig::default(),
        }
    }
}

impl HotswapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<HotswapConfig>(HOTSWAP_CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) =
                project.load_optional::<HotswapConfig>(HOTSWAP_CONFIG_FILE)?
            {
                config.merge(project_config);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 특정 저장소에서 로드 (없으면 기본값)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let config = store
            .load_optional::<HotswapConfig>(HOTSWAP_CONFIG_FILE)?
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(HOTSWAP_CONFIG_FILE, self)
    }

    /// 다른 설정을 위에 덮어쓴다 (other 우선)
    pub fn merge(&mut self, other: HotswapConfig) {
        // 파일에 없는 필드는 serde 기본값으로 채워지므로 기본값과 다를 때만 덮어쓴다
        if other.version != default_version() {
            self.version = other.version;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.default_backend != default_backend() {
            self.default_backend = other.default_backend;
        }
        if other.lock_namespace != default_lock_namespace() {
            self.lock_namespace = other.lock_namespace;
        }
        self.polling.merge(other.polling);
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock_namespace.trim().is_empty() {
            return Err(Error::Config("lockNamespace must not be empty".to_string()));
        }
        self.polling.validate()
    }

    /// 데이터 디렉토리 (설정값 또는 `<data_dir>/hotswap`)
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("hotswap"))
            .ok_or_else(|| Error::Config("Cannot find data directory".to_string()))
    }
}

// ============================================================================
// Polling
// ============================================================================

/// 학습 완료 polling 설정
///
/// 매 poll 이후 `min(step * n, max_wait)` 만큼 대기한다.
/// `deadline_secs` 가 None 이면 전체 polling 시간에 상한이 없다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "PollingConfig::default_step")]
    pub step_secs: u64,

    #[serde(default = "PollingConfig::default_max_wait")]
    pub max_wait_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl PollingConfig {
    pub const DEFAULT_STEP_SECS: u64 = 15;
    pub const DEFAULT_MAX_WAIT_SECS: u64 = 600;

    fn default_step() -> u64 {
        Self::DEFAULT_STEP_SECS
    }

    fn default_max_wait() -> u64 {
        Self::DEFAULT_MAX_WAIT_SECS
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// 기본값이 아닌 필드만 덮어쓴다 (other 우선)
    pub fn merge(&mut self, other: PollingConfig) {
        if other.step_secs != Self::DEFAULT_STEP_SECS {
            self.step_secs = other.step_secs;
        }
        if other.max_wait_secs != Self::DEFAULT_MAX_WAIT_SECS {
            self.max_wait_secs = other.max_wait_secs;
        }
        if other.deadline_secs.is_some() {
            self.deadline_secs = other.deadline_secs;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_secs == 0 {
            return Err(Error::Config("polling.stepSecs must be > 0".to_string()));
        }
        if self.max_wait_secs < self.step_secs {
            return Err(Error::Config(
                "polling.maxWaitSecs must be >= polling.stepSecs".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            step_secs: Self::DEFAULT_STEP_SECS,
            max_wait_secs: Self::DEFAULT_MAX_WAIT_SECS,
            deadline_secs: None,
        }
    }
}
