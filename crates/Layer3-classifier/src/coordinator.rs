//! Classifier247 - hot-swap retrain coordinator
//!
//! 하나의 논리적 classifier 는 reader / writer 두 백엔드 인스턴스를 가진다.
//!
//! ```text
//!   classify ──► ReadersWriterLock(read) ──► reader_ref 인스턴스
//!
//!   train ──► modify mutex ──► writer_ref.train ──► poll status ──┐
//!                                                                  ▼
//!                       ReadersWriterLock(write) ──► swap + save ──► release
//! ```
//!
//! modify mutex 와 readers-writer lock 은 서로 다른 축이다. 학습 중에도
//! 서빙은 이전 reader 로 계속되고, writer 구간은 swap 저장 동안만 열린다.

use crate::backend::ClassifierBackend;
use crate::error::{Result, TrainingError};
use crate::poll::PollSchedule;
use crate::registry::BackendRegistry;
use crate::types::{Classification, Label, PerformanceReport, Sample, TrainStatus, TrainingOutcome};
use hotswap_foundation::{
    ClassifierSlotRecord, EventKind, EventSink, HotswapConfig, PollingConfig, SlotStore,
    TracingSink,
};
use hotswap_sync::{LockManager, NamedSemaphore, ReadersWriterLock};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_LOCK_NAMESPACE: &str = "classifier247";

// ============================================================================
// ClassifierContext
// ============================================================================

/// Collaborators shared by every coordinator in a process
#[derive(Clone)]
pub struct ClassifierContext {
    pub locks: LockManager,
    pub store: Arc<dyn SlotStore>,
    pub registry: Arc<BackendRegistry>,
    pub events: Arc<dyn EventSink>,
    pub polling: PollingConfig,
    pub lock_namespace: String,
}

impl ClassifierContext {
    pub fn new(store: Arc<dyn SlotStore>, registry: Arc<BackendRegistry>) -> Self {
        Self {
            locks: LockManager::new(),
            store,
            registry,
            events: Arc::new(TracingSink),
            polling: PollingConfig::default(),
            lock_namespace: DEFAULT_LOCK_NAMESPACE.to_string(),
        }
    }

    pub fn from_config(
        config: &HotswapConfig,
        store: Arc<dyn SlotStore>,
        registry: Arc<BackendRegistry>,
    ) -> Result<Self> {
        Ok(Self::new(store, registry)
            .with_polling(config.polling)?
            .with_namespace(config.lock_namespace.clone()))
    }

    pub fn with_locks(mut self, locks: LockManager) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// step 0 은 대기 없이 status 를 연속 호출하게 되므로 거부한다
    pub fn with_polling(mut self, polling: PollingConfig) -> Result<Self> {
        polling.validate()?;
        self.polling = polling;
        Ok(self)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.lock_namespace = namespace.into();
        self
    }
}

impl std::fmt::Debug for ClassifierContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierContext")
            .field("locks", &self.locks)
            .field("registry", &self.registry)
            .field("polling", &self.polling)
            .field("lock_namespace", &self.lock_namespace)
            .finish()
    }
}

// ============================================================================
// Classifier247
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainMode {
    /// 처음부터 재학습, 시작 시 trained 플래그를 내린다
    Full,
    /// 기존 모델 위에 증분 학습
    Incremental,
}

impl TrainMode {
    fn as_str(&self) -> &'static str {
        match self {
            TrainMode::Full => "train",
            TrainMode::Incremental => "update",
        }
    }
}

enum Completion {
    Done,
    Failed(TrainingError),
    DeadlineExceeded,
}

/// Retrain coordinator and serving path for one logical classifier
pub struct Classifier247 {
    id: String,
    job_id: u64,
    ctx: ClassifierContext,
    rw: ReadersWriterLock,
    modify: Arc<NamedSemaphore>,
}

impl Classifier247 {
    /// Coordinator for an existing slot record
    pub fn open(ctx: ClassifierContext, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let record = ctx.store.get(&id)?;
        Self::with_record(ctx, &record)
    }

    /// Create the slot record with two fresh instances of `kind`
    pub fn create(
        ctx: ClassifierContext,
        id: impl Into<String>,
        job_id: u64,
        kind: &str,
    ) -> Result<Self> {
        let reader = ctx.registry.create(kind)?;
        let writer = ctx.registry.create(kind)?;
        let record = ClassifierSlotRecord::new(
            id,
            job_id,
            kind,
            reader.instance_ref(),
            writer.instance_ref(),
        )?;
        ctx.store.save(&record)?;
        info!(id = %record.id, job_id, kind, "Created classifier slot");
        Self::with_record(ctx, &record)
    }

    fn with_record(ctx: ClassifierContext, record: &ClassifierSlotRecord) -> Result<Self> {
        let template = format!("{}-{}", ctx.lock_namespace, record.id);
        let rw = ReadersWriterLock::new(&ctx.locks, &template)?;
        let modify = ctx.locks.lock_for(&rw.names().mutex);
        Ok(Self {
            id: record.id.clone(),
            job_id: record.job_id,
            ctx,
            rw,
            modify,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn lock(&self) -> &ReadersWriterLock {
        &self.rw
    }

    /// Current persisted slot record
    pub fn slot(&self) -> Result<ClassifierSlotRecord> {
        Ok(self.ctx.store.get(&self.id)?)
    }

    pub fn is_trained(&self) -> Result<bool> {
        Ok(self.slot()?.trained)
    }

    // ========================================================================
    // Retrain
    // ========================================================================

    /// Full retrain on the writer instance, then swap roles on success
    pub async fn train(&self, samples: &[Sample]) -> Result<TrainingOutcome> {
        self.retrain(samples, TrainMode::Full).await
    }

    /// Incremental update on the writer instance; the trained flag is left alone
    /// unless the attempt fails fatally
    pub async fn update(&self, samples: &[Sample]) -> Result<TrainingOutcome> {
        self.retrain(samples, TrainMode::Incremental).await
    }

    /// Swap roles without training (operator recovery)
    pub async fn switch(&self) -> Result<ClassifierSlotRecord> {
        let _modify = self.modify.lock().await?;
        let record = self.commit(|r| r.swapped()).await?;
        info!(
            id = %self.id,
            job_id = self.job_id,
            reader = %record.reader_ref,
            writer = %record.writer_ref,
            "Cold switch"
        );
        Ok(record)
    }

    async fn retrain(&self, samples: &[Sample], mode: TrainMode) -> Result<TrainingOutcome> {
        let _modify = self.modify.lock().await?;
        trace!(lock = %self.rw.names().mutex, "Modify mutex acquired");

        let mut record = self.ctx.store.get(&self.id)?;
        if mode == TrainMode::Full && record.trained {
            record = self.commit(|r| r.with_trained(false)).await?;
        }

        let writer = self
            .ctx
            .registry
            .resolve(&record.kind, &record.writer_ref)?;

        info!(
            id = %self.id,
            job_id = self.job_id,
            mode = mode.as_str(),
            writer = %record.writer_ref,
            samples = samples.len(),
            "Training started"
        );
        self.notify(
            EventKind::TrainingStarted,
            format!("{} started on {} with {} samples", mode.as_str(), record.writer_ref, samples.len()),
        )
        .await;

        let started = match mode {
            TrainMode::Full => writer.train(samples).await,
            TrainMode::Incremental => writer.update(samples).await,
        };
        if let Err(e) = started {
            return self.fail(e).await;
        }

        match self.wait_for_completion(writer.as_ref()).await {
            Completion::Done => {}
            Completion::Failed(e) => return self.fail(e).await,
            Completion::DeadlineExceeded => {
                let message = format!(
                    "training on {} did not finish within {}s",
                    record.writer_ref,
                    self.ctx.polling.deadline_secs.unwrap_or_default()
                );
                warn!(id = %self.id, job_id = self.job_id, "{}", message);
                self.notify(EventKind::RetryableTrainingError, message).await;
                return Ok(TrainingOutcome::DeadlineExceeded);
            }
        }

        let record = self.commit(|r| r.swapped().with_trained(true)).await?;
        info!(
            id = %self.id,
            job_id = self.job_id,
            reader = %record.reader_ref,
            writer = %record.writer_ref,
            "Training finished, roles swapped"
        );
        self.notify(
            EventKind::TrainingFinished,
            format!("{} finished, now serving {}", mode.as_str(), record.reader_ref),
        )
        .await;

        Ok(TrainingOutcome::Success)
    }

    /// Poll until the writer reports `Done`.
    ///
    /// status check 의 retryable 에러는 "아직 학습 중" 으로 본다.
    /// `polling.deadline_secs` 가 없으면 상한 없이 기다린다.
    async fn wait_for_completion(&self, writer: &dyn ClassifierBackend) -> Completion {
        let started = Instant::now();
        let deadline = self.ctx.polling.deadline();
        let mut schedule = PollSchedule::from_config(&self.ctx.polling);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match writer.get_train_status().await {
                Ok(TrainStatus::Done) => {
                    debug!(id = %self.id, attempt, "Training status: done");
                    return Completion::Done;
                }
                Ok(TrainStatus::Running) => {
                    debug!(id = %self.id, attempt, "Training status: running");
                }
                Err(TrainingError::Retryable(msg)) => {
                    warn!(id = %self.id, attempt, error = %msg, "Status check failed, still training");
                }
                Err(e) => return Completion::Failed(e),
            }

            let mut delay = schedule.next_delay();
            if let Some(limit) = deadline {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Completion::DeadlineExceeded;
                }
                delay = delay.min(limit - elapsed);
            }

            trace!(id = %self.id, attempt, delay_secs = delay.as_secs(), "Waiting for training");
            sleep(delay).await;
        }
    }

    async fn fail(&self, err: TrainingError) -> Result<TrainingOutcome> {
        match err {
            TrainingError::Retryable(msg) => {
                warn!(id = %self.id, job_id = self.job_id, error = %msg, "Retryable training error");
                self.notify(EventKind::RetryableTrainingError, msg.clone()).await;
                Ok(TrainingOutcome::RetryableError(msg))
            }
            TrainingError::Fatal(msg) => {
                error!(id = %self.id, job_id = self.job_id, error = %msg, "Fatal training error");
                self.notify(EventKind::FatalTrainingError, msg.clone()).await;
                self.commit(|r| r.with_trained(false)).await?;
                Ok(TrainingOutcome::FatalError(msg))
            }
        }
    }

    /// 슬롯 레코드 변경은 writer 구간 안에서만 한다
    async fn commit<F>(&self, change: F) -> Result<ClassifierSlotRecord>
    where
        F: FnOnce(ClassifierSlotRecord) -> ClassifierSlotRecord + Send,
    {
        let _writer = self.rw.write().await?;
        let next = change(self.ctx.store.get(&self.id)?);
        self.ctx.store.save(&next)?;
        trace!(id = %self.id, reader = %next.reader_ref, trained = next.trained, "Slot saved");
        Ok(next)
    }

    // ========================================================================
    // Serving
    // ========================================================================

    pub async fn classify(&self, sample: &Sample) -> Result<Option<Label>> {
        let label = {
            let _reader = self.rw.read().await?;
            self.reader_backend()?.classify(sample).await?
        };
        self.record_classified(sample, label.as_ref()).await;
        Ok(label)
    }

    pub async fn classify_with_info(&self, sample: &Sample) -> Result<Option<Classification>> {
        let info = {
            let _reader = self.rw.read().await?;
            self.reader_backend()?.classify_with_info(sample).await?
        };
        self.record_classified(sample, info.as_ref().map(|i| &i.label))
            .await;
        Ok(info)
    }

    pub async fn analyze(&self) -> Result<PerformanceReport> {
        let _reader = self.rw.read().await?;
        self.reader_backend()?.analyze().await
    }

    /// Instance currently holding the reader role. Caller holds the reader lock.
    fn reader_backend(&self) -> Result<Arc<dyn ClassifierBackend>> {
        let record = self.ctx.store.get(&self.id)?;
        trace!(id = %self.id, reader = %record.reader_ref, "Resolved reader");
        self.ctx.registry.resolve(&record.kind, &record.reader_ref)
    }

    async fn record_classified(&self, sample: &Sample, label: Option<&Label>) {
        let Some(sample_id) = &sample.id else {
            return;
        };
        let message = match label {
            Some(label) => format!("sample {} classified as {}", sample_id, label),
            None => format!("sample {} left unclassified", sample_id),
        };
        self.notify(EventKind::SampleClassified, message).await;
    }

    async fn notify(&self, kind: EventKind, message: String) {
        self.ctx.events.notify(kind, self.job_id, &message).await;
    }
}

impl std::fmt::Debug for Classifier247 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier247")
            .field("id", &self.id)
            .field("job_id", &self.job_id)
            .field("lock", &self.rw)
            .finish()
    }
}
