//! Classifier factory
//!
//! job 하나에 classifier 하나. 한 번 초기화된 job 의 backend kind 는 바뀌지 않는다.
//! 프로세스 안에서는 job 별 coordinator 를 캐시해서 같은 lock 핸들을 재사용한다.

use crate::coordinator::{Classifier247, ClassifierContext};
use crate::error::{ClassifierError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct ClassifierFactory {
    ctx: ClassifierContext,
    default_kind: String,
    cache: Mutex<HashMap<u64, Arc<Classifier247>>>,
}

impl ClassifierFactory {
    pub fn new(ctx: ClassifierContext, default_kind: impl Into<String>) -> Self {
        Self {
            ctx,
            default_kind: default_kind.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &ClassifierContext {
        &self.ctx
    }

    pub fn default_kind(&self) -> &str {
        &self.default_kind
    }

    /// Slot id of the classifier owned by `job_id`
    pub fn slot_id(job_id: u64) -> String {
        format!("job-{}", job_id)
    }

    /// Create the slot record for a job. Fails if the job already has one.
    pub fn initialize_classifier(
        &self,
        job_id: u64,
        kind: Option<&str>,
    ) -> Result<Arc<Classifier247>> {
        let kind = kind.unwrap_or(&self.default_kind);
        let id = Self::slot_id(job_id);

        let mut cache = self.cache.lock();
        if cache.contains_key(&job_id) || self.ctx.store.find(&id)?.is_some() {
            return Err(ClassifierError::AlreadyInitialized(job_id));
        }
        if !self.ctx.registry.has_kind(kind) {
            return Err(ClassifierError::UnknownKind(kind.to_string()));
        }

        let classifier = Arc::new(Classifier247::create(self.ctx.clone(), id, job_id, kind)?);
        cache.insert(job_id, classifier.clone());
        Ok(classifier)
    }

    /// Cached coordinator for a job, or one built from its stored slot record
    pub fn create_classifier(&self, job_id: u64) -> Result<Arc<Classifier247>> {
        let mut cache = self.cache.lock();
        if let Some(classifier) = cache.get(&job_id) {
            return Ok(classifier.clone());
        }

        let id = Self::slot_id(job_id);
        if self.ctx.store.find(&id)?.is_none() {
            return Err(ClassifierError::NotInitialized(job_id));
        }

        let classifier = Arc::new(Classifier247::open(self.ctx.clone(), id)?);
        debug!(job_id, "Cached classifier");
        cache.insert(job_id, classifier.clone());
        Ok(classifier)
    }

    /// Drop the cached coordinator; the slot record stays
    pub fn evict(&self, job_id: u64) -> bool {
        self.cache.lock().remove(&job_id).is_some()
    }

    pub fn cached_jobs(&self) -> Vec<u64> {
        let mut jobs: Vec<u64> = self.cache.lock().keys().copied().collect();
        jobs.sort_unstable();
        jobs
    }
}

impl std::fmt::Debug for ClassifierFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierFactory")
            .field("default_kind", &self.default_kind)
            .field("cached_jobs", &self.cached_jobs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BackendRegistry;
    use hotswap_foundation::MemorySlotStore;

    fn factory() -> ClassifierFactory {
        let ctx = ClassifierContext::new(
            Arc::new(MemorySlotStore::new()),
            Arc::new(BackendRegistry::with_keyword(None)),
        );
        ClassifierFactory::new(ctx, "keyword")
    }

    #[test]
    fn test_initialize_creates_slot() {
        let factory = factory();
        let classifier = factory.initialize_classifier(3, None).unwrap();
        let slot = classifier.slot().unwrap();

        assert_eq!(slot.id, "job-3");
        assert_eq!(slot.job_id, 3);
        assert_eq!(slot.kind, "keyword");
        assert_ne!(slot.reader_ref, slot.writer_ref);
        assert!(!slot.trained);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let factory = factory();
        factory.initialize_classifier(3, None).unwrap();
        assert!(matches!(
            factory.initialize_classifier(3, None),
            Err(ClassifierError::AlreadyInitialized(3))
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let factory = factory();
        assert!(matches!(
            factory.initialize_classifier(3, Some("decision-tree")),
            Err(ClassifierError::UnknownKind(_))
        ));
        assert!(factory.cached_jobs().is_empty());
    }

    #[test]
    fn test_create_classifier_is_cached() {
        let factory = factory();
        let initialized = factory.initialize_classifier(5, None).unwrap();
        let first = factory.create_classifier(5).unwrap();
        let second = factory.create_classifier(5).unwrap();

        assert!(Arc::ptr_eq(&initialized, &first));
        assert!(Arc::ptr_eq(&first, &second));

        assert!(factory.evict(5));
        let rebuilt = factory.create_classifier(5).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.slot().unwrap(), first.slot().unwrap());
    }

    #[test]
    fn test_create_uninitialized_fails() {
        let factory = factory();
        assert!(matches!(
            factory.create_classifier(9),
            Err(ClassifierError::NotInitialized(9))
        ));
    }
}
