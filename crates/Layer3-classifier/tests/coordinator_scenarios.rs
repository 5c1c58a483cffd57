//! Retrain / serving scenarios against a scripted backend

use async_trait::async_trait;
use futures::future::join_all;
use hotswap_classifier::{
    BackendRegistry, Classifier247, ClassifierBackend, ClassifierContext, ClassifierError,
    ClassifierFactory, Label, PerformanceReport, Sample, TrainStatus, TrainingError,
    TrainingOutcome,
};
use hotswap_foundation::{
    ClassifierSlotRecord, EventBus, EventKind, MemorySlotStore, PollingConfig, SlotStore,
    SqliteSlotStore,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::Instant;

const KIND: &str = "scripted";
const SLOT: &str = "job-1";

// ============================================================================
// Scripted backend
// ============================================================================

struct ScriptedBackend {
    instance_ref: String,
    train_results: Mutex<VecDeque<Result<(), TrainingError>>>,
    statuses: Mutex<VecDeque<Result<TrainStatus, TrainingError>>>,
    /// Status once the script runs out
    fallback_status: TrainStatus,
    status_calls: Mutex<Vec<Instant>>,
    fail_classify: bool,
    classify_barrier: Option<Arc<Barrier>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    fn new(instance_ref: &str) -> Self {
        Self {
            instance_ref: instance_ref.to_string(),
            train_results: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: TrainStatus::Done,
            status_calls: Mutex::new(Vec::new()),
            fail_classify: false,
            classify_barrier: None,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn train_fails_with(self, err: TrainingError) -> Self {
        self.train_results.lock().push_back(Err(err));
        self
    }

    fn statuses(self, script: Vec<Result<TrainStatus, TrainingError>>) -> Self {
        self.statuses.lock().extend(script);
        self
    }

    fn never_done(mut self) -> Self {
        self.fallback_status = TrainStatus::Running;
        self
    }

    fn failing_classify(mut self) -> Self {
        self.fail_classify = true;
        self
    }

    fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.classify_barrier = Some(barrier);
        self
    }

    fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = journal;
        self
    }

    fn status_offsets(&self, start: Instant) -> Vec<u64> {
        self.status_calls
            .lock()
            .iter()
            .map(|at| at.duration_since(start).as_secs())
            .collect()
    }

    fn start(&self, verb: &str) -> Result<(), TrainingError> {
        self.journal
            .lock()
            .push(format!("{}:{}", verb, self.instance_ref));
        self.train_results.lock().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl ClassifierBackend for ScriptedBackend {
    fn kind(&self) -> &str {
        KIND
    }

    fn instance_ref(&self) -> &str {
        &self.instance_ref
    }

    async fn train(&self, _samples: &[Sample]) -> Result<(), TrainingError> {
        self.start("train")
    }

    async fn update(&self, _samples: &[Sample]) -> Result<(), TrainingError> {
        self.start("update")
    }

    async fn get_train_status(&self) -> Result<TrainStatus, TrainingError> {
        self.status_calls.lock().push(Instant::now());
        let status = self
            .statuses
            .lock()
            .pop_front()
            .unwrap_or(Ok(self.fallback_status));
        if let Ok(TrainStatus::Done) = status {
            self.journal
                .lock()
                .push(format!("done:{}", self.instance_ref));
        }
        status
    }

    async fn classify(&self, _sample: &Sample) -> hotswap_classifier::Result<Option<Label>> {
        if let Some(barrier) = &self.classify_barrier {
            barrier.wait().await;
        }
        if self.fail_classify {
            return Err(ClassifierError::backend(KIND, "model file corrupted"));
        }
        Ok(Some(Label::new(self.instance_ref.clone())))
    }

    async fn analyze(&self) -> hotswap_classifier::Result<PerformanceReport> {
        Ok(PerformanceReport {
            kind: KIND.to_string(),
            instance_ref: self.instance_ref.clone(),
            ..Default::default()
        })
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    classifier: Arc<Classifier247>,
    reader: Arc<ScriptedBackend>,
    writer: Arc<ScriptedBackend>,
    store: Arc<dyn SlotStore>,
    events: Arc<EventBus>,
}

impl Fixture {
    fn new(reader: ScriptedBackend, writer: ScriptedBackend) -> Self {
        Self::build(reader, writer, PollingConfig::default(), false)
    }

    fn build(
        reader: ScriptedBackend,
        writer: ScriptedBackend,
        polling: PollingConfig,
        trained: bool,
    ) -> Self {
        let store: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        Self::with_store(reader, writer, polling, trained, store)
    }

    fn with_store(
        reader: ScriptedBackend,
        writer: ScriptedBackend,
        polling: PollingConfig,
        trained: bool,
        store: Arc<dyn SlotStore>,
    ) -> Self {
        let reader = Arc::new(reader);
        let writer = Arc::new(writer);

        let registry = Arc::new(BackendRegistry::new());
        registry.insert(reader.clone());
        registry.insert(writer.clone());

        let record = ClassifierSlotRecord::new(
            SLOT,
            1,
            KIND,
            reader.instance_ref(),
            writer.instance_ref(),
        )
        .unwrap()
        .with_trained(trained);
        store.save(&record).unwrap();

        let events = Arc::new(EventBus::new());
        let ctx = ClassifierContext::new(store.clone(), registry)
            .with_events(events.clone())
            .with_polling(polling)
            .unwrap();
        let classifier = Arc::new(Classifier247::open(ctx, SLOT).unwrap());

        Self {
            classifier,
            reader,
            writer,
            store,
            events,
        }
    }

    fn refs(&self) -> (String, String) {
        let slot = self.store.get(SLOT).unwrap();
        (slot.reader_ref, slot.writer_ref)
    }

    async fn count(&self, kind: EventKind) -> usize {
        self.events.events_of(kind).await.len()
    }
}

fn samples() -> Vec<Sample> {
    vec![Sample::labeled("cheap flights", "Yes")]
}

fn running() -> Result<TrainStatus, TrainingError> {
    Ok(TrainStatus::Running)
}

fn done() -> Result<TrainStatus, TrainingError> {
    Ok(TrainStatus::Done)
}

// ============================================================================
// Retrain
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_polling_backoff_then_swap() {
    let fx = Fixture::new(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").statuses(vec![running(), running(), running(), done()]),
    );

    let start = Instant::now();
    let outcome = fx.classifier.train(&samples()).await.unwrap();

    assert_eq!(outcome, TrainingOutcome::Success);
    assert_eq!(fx.writer.status_offsets(start), vec![0, 15, 45, 90]);
    assert_eq!(start.elapsed(), Duration::from_secs(90));
    assert_eq!(fx.refs(), ("b".to_string(), "a".to_string()));
    assert!(fx.classifier.is_trained().unwrap());
    assert_eq!(fx.count(EventKind::TrainingStarted).await, 1);
    assert_eq!(fx.count(EventKind::TrainingFinished).await, 1);
}

#[tokio::test]
async fn test_retryable_train_error_leaves_slot_untouched() {
    let fx = Fixture::new(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").train_fails_with(TrainingError::retryable("quota exceeded")),
    );

    let outcome = fx.classifier.train(&samples()).await.unwrap();
    assert_eq!(
        outcome,
        TrainingOutcome::RetryableError("quota exceeded".to_string())
    );
    assert_eq!(fx.count(EventKind::RetryableTrainingError).await, 1);
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));
    assert!(fx.writer.status_offsets(Instant::now()).is_empty());

    // modify mutex 가 풀렸는지: 바로 다시 학습 가능해야 한다
    let retry = tokio::time::timeout(Duration::from_secs(5), fx.classifier.train(&samples()))
        .await
        .expect("modify mutex still held")
        .unwrap();
    assert_eq!(retry, TrainingOutcome::Success);
    assert_eq!(fx.refs(), ("b".to_string(), "a".to_string()));
}

#[tokio::test]
async fn test_fatal_train_error_forces_untrained() {
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").train_fails_with(TrainingError::fatal("invalid training set")),
        PollingConfig::default(),
        true,
    );

    let outcome = fx.classifier.train(&samples()).await.unwrap();
    assert_eq!(
        outcome,
        TrainingOutcome::FatalError("invalid training set".to_string())
    );
    assert_eq!(fx.count(EventKind::FatalTrainingError).await, 1);
    assert!(!fx.classifier.is_trained().unwrap());
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));

    let retry = tokio::time::timeout(Duration::from_secs(5), fx.classifier.train(&samples()))
        .await
        .expect("modify mutex still held")
        .unwrap();
    assert!(retry.is_success());
}

#[tokio::test]
async fn test_update_keeps_trained_flag_on_retryable_error() {
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").train_fails_with(TrainingError::retryable("busy")),
        PollingConfig::default(),
        true,
    );

    let outcome = fx.classifier.update(&samples()).await.unwrap();
    assert!(matches!(outcome, TrainingOutcome::RetryableError(_)));
    assert!(fx.classifier.is_trained().unwrap());
}

#[tokio::test]
async fn test_train_resets_trained_flag_on_retryable_error() {
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").train_fails_with(TrainingError::retryable("busy")),
        PollingConfig::default(),
        true,
    );

    let outcome = fx.classifier.train(&samples()).await.unwrap();
    assert!(matches!(outcome, TrainingOutcome::RetryableError(_)));
    assert!(!fx.classifier.is_trained().unwrap());
}

#[tokio::test]
async fn test_update_fatal_error_forces_untrained() {
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").train_fails_with(TrainingError::fatal("schema mismatch")),
        PollingConfig::default(),
        true,
    );

    let outcome = fx.classifier.update(&samples()).await.unwrap();
    assert!(matches!(outcome, TrainingOutcome::FatalError(_)));
    assert!(!fx.classifier.is_trained().unwrap());
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_retryable_status_error_keeps_polling() {
    let fx = Fixture::new(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").statuses(vec![
            Err(TrainingError::retryable("status endpoint timeout")),
            running(),
            done(),
        ]),
    );

    let start = Instant::now();
    let outcome = fx.classifier.train(&samples()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(fx.writer.status_offsets(start), vec![0, 15, 45]);
    assert_eq!(fx.count(EventKind::RetryableTrainingError).await, 0);
    assert_eq!(fx.refs(), ("b".to_string(), "a".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_fatal_status_error_aborts_polling() {
    let fx = Fixture::new(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").statuses(vec![
            running(),
            Err(TrainingError::fatal("training job lost")),
        ]),
    );

    let outcome = fx.classifier.train(&samples()).await.unwrap();

    assert_eq!(
        outcome,
        TrainingOutcome::FatalError("training job lost".to_string())
    );
    assert_eq!(fx.count(EventKind::FatalTrainingError).await, 1);
    assert_eq!(fx.count(EventKind::TrainingFinished).await, 0);
    assert!(!fx.classifier.is_trained().unwrap());
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_polling() {
    let polling = PollingConfig {
        deadline_secs: Some(100),
        ..PollingConfig::default()
    };
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").never_done(),
        polling,
        false,
    );

    let start = Instant::now();
    let outcome = fx.classifier.train(&samples()).await.unwrap();

    assert_eq!(outcome, TrainingOutcome::DeadlineExceeded);
    assert_eq!(fx.writer.status_offsets(start), vec![0, 15, 45, 90, 100]);
    assert_eq!(fx.count(EventKind::RetryableTrainingError).await, 1);
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_retrains_run_one_at_a_time() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let fx = Fixture::new(
        ScriptedBackend::new("a")
            .statuses(vec![running()])
            .with_journal(journal.clone()),
        ScriptedBackend::new("b")
            .statuses(vec![running()])
            .with_journal(journal.clone()),
    );

    let first = tokio::spawn({
        let classifier = fx.classifier.clone();
        async move { classifier.train(&samples()).await }
    });
    let second = tokio::spawn({
        let classifier = fx.classifier.clone();
        async move { classifier.train(&samples()).await }
    });

    assert!(first.await.unwrap().unwrap().is_success());
    assert!(second.await.unwrap().unwrap().is_success());

    assert_eq!(
        *journal.lock(),
        vec!["train:b", "done:b", "train:a", "done:a"]
    );
    assert_eq!(fx.refs(), ("a".to_string(), "b".to_string()));
}

#[tokio::test]
async fn test_cold_switch_swaps_without_training() {
    let fx = Fixture::build(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b"),
        PollingConfig::default(),
        true,
    );

    let record = fx.classifier.switch().await.unwrap();

    assert_eq!(record.reader_ref, "b");
    assert!(record.trained);
    assert_eq!(fx.refs(), ("b".to_string(), "a".to_string()));
    assert_eq!(
        fx.classifier.classify(&Sample::new("x")).await.unwrap(),
        Some(Label::new("b"))
    );
    assert_eq!(fx.count(EventKind::TrainingStarted).await, 0);
}

// ============================================================================
// Serving
// ============================================================================

#[tokio::test]
async fn test_classify_is_idempotent_without_training() {
    let fx = Fixture::new(ScriptedBackend::new("a"), ScriptedBackend::new("b"));

    for _ in 0..5 {
        let label = fx.classifier.classify(&Sample::new("x")).await.unwrap();
        assert_eq!(label, Some(Label::new("a")));
    }
    assert_eq!(fx.classifier.lock().active_readers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_serving_continues_on_old_reader_during_training() {
    let fx = Fixture::new(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b").statuses(vec![running(), running(), done()]),
    );

    let training = tokio::spawn({
        let classifier = fx.classifier.clone();
        async move { classifier.train(&samples()).await }
    });

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(
        fx.classifier.classify(&Sample::new("x")).await.unwrap(),
        Some(Label::new("a"))
    );
    assert_eq!(fx.classifier.lock().pending_writers(), 0);

    assert!(training.await.unwrap().unwrap().is_success());
    assert_eq!(
        fx.classifier.classify(&Sample::new("x")).await.unwrap(),
        Some(Label::new("b"))
    );
}

#[tokio::test]
async fn test_concurrent_readers_do_not_block_each_other() {
    const READERS: usize = 16;
    let barrier = Arc::new(Barrier::new(READERS));
    let fx = Fixture::new(
        ScriptedBackend::new("a").with_barrier(barrier),
        ScriptedBackend::new("b"),
    );

    let sample = Sample::new("x");
    let calls = (0..READERS).map(|_| fx.classifier.classify(&sample));
    let results = tokio::time::timeout(Duration::from_secs(5), join_all(calls))
        .await
        .expect("readers blocked each other");

    assert!(results
        .into_iter()
        .all(|r| r.unwrap() == Some(Label::new("a"))));
    assert_eq!(fx.classifier.lock().active_readers(), 0);
}

#[tokio::test]
async fn test_backend_error_releases_reader_lock() {
    let fx = Fixture::new(
        ScriptedBackend::new("a").failing_classify(),
        ScriptedBackend::new("b"),
    );

    let err = fx.classifier.classify(&Sample::new("x")).await.unwrap_err();
    assert!(matches!(err, ClassifierError::Backend { .. }));
    assert_eq!(fx.classifier.lock().active_readers(), 0);

    // writer 구간에 들어갈 수 있어야 한다
    let outcome = tokio::time::timeout(Duration::from_secs(5), fx.classifier.train(&samples()))
        .await
        .expect("reader lock leaked")
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_serving_delegates_to_reader() {
    let fx = Fixture::new(ScriptedBackend::new("a"), ScriptedBackend::new("b"));

    let report = fx.classifier.analyze().await.unwrap();
    assert_eq!(report.instance_ref, "a");

    let info = fx
        .classifier
        .classify_with_info(&Sample::new("x"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.label, Label::new("a"));
    assert!(fx.reader.status_offsets(Instant::now()).is_empty());
}

#[tokio::test]
async fn test_sample_classified_events_need_sample_id() {
    let fx = Fixture::new(ScriptedBackend::new("a"), ScriptedBackend::new("b"));

    fx.classifier.classify(&Sample::new("x")).await.unwrap();
    assert_eq!(fx.count(EventKind::SampleClassified).await, 0);

    fx.classifier
        .classify(&Sample::new("x").with_id("sample-7"))
        .await
        .unwrap();
    let events = fx.events.events_of(EventKind::SampleClassified).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id, 1);
    assert_eq!(events[0].message, "sample sample-7 classified as a");
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_swap_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SlotStore> = Arc::new(SqliteSlotStore::open(dir.path()).unwrap());
    let fx = Fixture::with_store(
        ScriptedBackend::new("a"),
        ScriptedBackend::new("b"),
        PollingConfig::default(),
        false,
        store,
    );

    let before = fx.store.get(SLOT).unwrap();
    assert!(fx.classifier.train(&samples()).await.unwrap().is_success());
    drop(fx);

    let reopened = SqliteSlotStore::open(dir.path()).unwrap();
    let after = reopened.get(SLOT).unwrap();
    assert_eq!(after.reader_ref, before.writer_ref);
    assert_eq!(after.writer_ref, before.reader_ref);
    assert!(after.trained);
}

// ============================================================================
// Factory + keyword backend
// ============================================================================

#[tokio::test]
async fn test_factory_keyword_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let models = hotswap_foundation::JsonStore::new(dir.path().join("models"));
    let ctx = ClassifierContext::new(
        Arc::new(MemorySlotStore::new()),
        Arc::new(BackendRegistry::with_keyword(Some(models))),
    );
    let factory = ClassifierFactory::new(ctx, "keyword");

    let classifier = factory.initialize_classifier(42, None).unwrap();
    let initial = classifier.slot().unwrap();
    assert_eq!(classifier.classify(&Sample::new("hotel")).await.unwrap(), None);

    let training = vec![
        Sample::labeled("cheap hotel deals", "Yes"),
        Sample::labeled("weather forecast", "No"),
    ];
    assert!(classifier.train(&training).await.unwrap().is_success());

    let same = factory.create_classifier(42).unwrap();
    assert!(Arc::ptr_eq(&classifier, &same));
    assert_eq!(same.slot().unwrap().reader_ref, initial.writer_ref);
    assert_eq!(
        same.classify(&Sample::new("hotel")).await.unwrap(),
        Some(Label::new("Yes"))
    );
    assert!(dir
        .path()
        .join("models")
        .join(format!("{}.json", initial.writer_ref))
        .exists());
}
