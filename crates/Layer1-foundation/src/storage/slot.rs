//! Classifier slot records
//!
//! 하나의 논리적 classifier 는 같은 종류의 백엔드 인스턴스 두 개를 가진다.
//! `reader_ref` 는 서빙 중인 인스턴스, `writer_ref` 는 재학습 대상 인스턴스.
//! 역할 교체는 참조 값을 바꾸는 것으로만 이루어지고 모델 상태는 복사하지 않는다.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted role assignment for one logical classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierSlotRecord {
    /// Logical classifier id
    pub id: String,

    /// Owning job
    pub job_id: u64,

    /// Backend family (selects the concrete backend)
    pub kind: String,

    /// Instance currently serving `classify` calls
    pub reader_ref: String,

    /// Instance that receives the next `train` / `update`
    pub writer_ref: String,

    /// Externally visible "trained" flag
    pub trained: bool,

    pub updated_at: DateTime<Utc>,
}

impl ClassifierSlotRecord {
    pub fn new(
        id: impl Into<String>,
        job_id: u64,
        kind: impl Into<String>,
        reader_ref: impl Into<String>,
        writer_ref: impl Into<String>,
    ) -> Result<Self> {
        let record = Self {
            id: id.into(),
            job_id,
            kind: kind.into(),
            reader_ref: reader_ref.into(),
            writer_ref: writer_ref.into(),
            trained: false,
            updated_at: Utc::now(),
        };
        record.validate()?;
        Ok(record)
    }

    /// reader_ref != writer_ref 불변식 확인
    pub fn validate(&self) -> Result<()> {
        if self.reader_ref == self.writer_ref {
            return Err(Error::InvalidInput(format!(
                "slot {} has identical reader and writer ref {}",
                self.id, self.reader_ref
            )));
        }
        Ok(())
    }

    /// Both roles exchanged in a single value, so one `save` persists the whole swap.
    pub fn swapped(&self) -> Self {
        Self {
            reader_ref: self.writer_ref.clone(),
            writer_ref: self.reader_ref.clone(),
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_trained(mut self, trained: bool) -> Self {
        self.trained = trained;
        self.updated_at = Utc::now();
        self
    }
}

/// Persistence collaborator for slot records
pub trait SlotStore: Send + Sync {
    /// 레코드 조회 (없으면 None)
    fn find(&self, id: &str) -> Result<Option<ClassifierSlotRecord>>;

    /// 레코드 저장 (insert or replace)
    fn save(&self, record: &ClassifierSlotRecord) -> Result<()>;

    /// 전체 레코드 목록
    fn list(&self) -> Result<Vec<ClassifierSlotRecord>>;

    /// 레코드 조회 (없으면 `SlotNotFound`)
    fn get(&self, id: &str) -> Result<ClassifierSlotRecord> {
        self.find(id)?
            .ok_or_else(|| Error::SlotNotFound(id.to_string()))
    }
}

/// In-memory slot store (tests, single-process setups)
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    records: RwLock<HashMap<String, ClassifierSlotRecord>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn find(&self, id: &str) -> Result<Option<ClassifierSlotRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn save(&self, record: &ClassifierSlotRecord) -> Result<()> {
        record.validate()?;
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ClassifierSlotRecord>> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}
