//! Backend registry
//!
//! slot record 의 `reader_ref` / `writer_ref` 는 불투명한 문자열이다.
//! `BackendRegistry` 는 이 참조를 살아있는 인스턴스로 바꿔주고,
//! 종류(kind) 별 생성자로 새 인스턴스를 만든다.

use crate::backend::{ClassifierBackend, KeywordClassifier, KEYWORD_KIND};
use crate::error::{ClassifierError, Result};
use hotswap_foundation::JsonStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds a backend instance for a given reference
pub type BackendConstructor =
    Arc<dyn Fn(&str) -> Result<Arc<dyn ClassifierBackend>> + Send + Sync>;

/// Kind constructors plus live instances keyed by reference
#[derive(Default)]
pub struct BackendRegistry {
    constructors: RwLock<HashMap<String, BackendConstructor>>,
    instances: RwLock<HashMap<String, Arc<dyn ClassifierBackend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the in-tree keyword backend.
    /// `models` 가 있으면 모델을 `<ref>.json` 으로 저장/복원한다.
    pub fn with_keyword(models: Option<JsonStore>) -> Self {
        let registry = Self::new();
        registry.register_kind(
            KEYWORD_KIND,
            Arc::new(move |instance_ref: &str| -> Result<Arc<dyn ClassifierBackend>> {
                let backend = match &models {
                    Some(store) => KeywordClassifier::with_store(instance_ref, store.clone())?,
                    None => KeywordClassifier::new(instance_ref)?,
                };
                Ok(Arc::new(backend))
            }),
        );
        registry
    }

    pub fn register_kind(&self, kind: impl Into<String>, constructor: BackendConstructor) {
        let kind = kind.into();
        debug!(kind = %kind, "Registered backend kind");
        self.constructors.write().insert(kind, constructor);
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.constructors.read().contains_key(kind)
    }

    /// Create a fresh instance with a new unique reference
    pub fn create(&self, kind: &str) -> Result<Arc<dyn ClassifierBackend>> {
        let instance_ref = format!("{}-{}", kind, uuid::Uuid::new_v4().simple());
        let backend = self.construct(kind, &instance_ref)?;
        self.insert(backend.clone());
        Ok(backend)
    }

    /// Register an externally built instance under its own reference
    pub fn insert(&self, backend: Arc<dyn ClassifierBackend>) {
        self.instances
            .write()
            .insert(backend.instance_ref().to_string(), backend);
    }

    /// Resolve a reference, rebuilding it through the kind constructor if this
    /// process has not seen it yet
    pub fn resolve(&self, kind: &str, instance_ref: &str) -> Result<Arc<dyn ClassifierBackend>> {
        if let Some(backend) = self.instances.read().get(instance_ref) {
            return Ok(backend.clone());
        }

        let backend = match self.construct(kind, instance_ref) {
            Ok(backend) => backend,
            Err(ClassifierError::UnknownKind(_)) => {
                return Err(ClassifierError::InstanceNotFound(instance_ref.to_string()))
            }
            Err(e) => return Err(e),
        };

        // 동시에 같은 ref 를 만든 경우 먼저 들어간 인스턴스를 쓴다
        let mut instances = self.instances.write();
        Ok(instances
            .entry(instance_ref.to_string())
            .or_insert(backend)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    fn construct(&self, kind: &str, instance_ref: &str) -> Result<Arc<dyn ClassifierBackend>> {
        let constructor = self
            .constructors
            .read()
            .get(kind)
            .cloned()
            .ok_or_else(|| ClassifierError::UnknownKind(kind.to_string()))?;
        constructor(instance_ref)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .field("instances", &self.len())
            .finish()
    }
}
