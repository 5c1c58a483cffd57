//! Keyword classifier
//!
//! 단어 빈도 기반의 naive Bayes 분류기. 학습은 동기적으로 끝나므로
//! `get_train_status` 는 항상 `Done` 이다. 모델은 선택적으로
//! `JsonStore` 에 `<ref>.json` 으로 저장된다.

use super::ClassifierBackend;
use crate::error::{ClassifierError, Result, TrainingError};
use crate::types::{Classification, Label, PerformanceReport, Sample, TrainStatus};
use async_trait::async_trait;
use hotswap_foundation::JsonStore;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub const KEYWORD_KIND: &str = "keyword";

/// Serializable model state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordModel {
    /// Samples per label
    label_counts: BTreeMap<Label, u64>,

    /// Token frequencies per label
    token_counts: BTreeMap<Label, HashMap<String, u64>>,

    /// Total tokens per label
    token_totals: BTreeMap<Label, u64>,

    sample_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
}

impl KeywordModel {
    fn is_trained(&self) -> bool {
        !self.label_counts.is_empty()
    }

    fn vocabulary_size(&self) -> usize {
        let mut vocab: Vec<&String> = self.token_counts.values().flat_map(|t| t.keys()).collect();
        vocab.sort_unstable();
        vocab.dedup();
        vocab.len()
    }

    fn add(&mut self, label: &Label, tokens: &[String]) {
        *self.label_counts.entry(label.clone()).or_insert(0) += 1;
        *self.token_totals.entry(label.clone()).or_insert(0) += tokens.len() as u64;
        let counts = self.token_counts.entry(label.clone()).or_default();
        for token in tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        self.sample_count += 1;
    }

    /// Log-probability per label, Laplace smoothed
    fn scores(&self, tokens: &[String]) -> Vec<(Label, f64)> {
        let vocab = self.vocabulary_size().max(1) as f64;
        let total = self.sample_count.max(1) as f64;

        self.label_counts
            .iter()
            .map(|(label, count)| {
                let prior = (*count as f64 / total).ln();
                let label_total = self.token_totals.get(label).copied().unwrap_or(0) as f64;
                let counts = self.token_counts.get(label);
                let likelihood: f64 = tokens
                    .iter()
                    .map(|token| {
                        let hits = counts.and_then(|c| c.get(token)).copied().unwrap_or(0) as f64;
                        ((hits + 1.0) / (label_total + vocab)).ln()
                    })
                    .sum();
                (label.clone(), prior + likelihood)
            })
            .collect()
    }

    /// 가장 높은 점수의 label 과 softmax 확률
    fn predict(&self, tokens: &[String]) -> Option<(Label, f64)> {
        let scores = self.scores(tokens);
        let (best, best_score) = scores
            .iter()
            .fold(None::<&(Label, f64)>, |best, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })?
            .clone();

        let norm: f64 = scores.iter().map(|(_, s)| (s - best_score).exp()).sum();
        Some((best, 1.0 / norm))
    }
}

/// In-tree keyword backend
pub struct KeywordClassifier {
    instance_ref: String,
    word: Regex,
    model: RwLock<KeywordModel>,
    store: Option<JsonStore>,
}

impl KeywordClassifier {
    pub fn new(instance_ref: impl Into<String>) -> Result<Self> {
        let word = Regex::new(r"\w+")
            .map_err(|e| ClassifierError::backend(KEYWORD_KIND, e.to_string()))?;
        Ok(Self {
            instance_ref: instance_ref.into(),
            word,
            model: RwLock::new(KeywordModel::default()),
            store: None,
        })
    }

    /// Persist the model under `store`, loading a previously saved one if present
    pub fn with_store(instance_ref: impl Into<String>, store: JsonStore) -> Result<Self> {
        let mut classifier = Self::new(instance_ref)?;
        if let Some(model) = store.load_optional::<KeywordModel>(&classifier.model_file())? {
            debug!(instance = %classifier.instance_ref, samples = model.sample_count, "Loaded keyword model");
            classifier.model = RwLock::new(model);
        }
        classifier.store = Some(store);
        Ok(classifier)
    }

    fn model_file(&self) -> String {
        format!("{}.json", self.instance_ref)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// labeled sample 만 학습에 쓴다
    fn fit(&self, model: &mut KeywordModel, samples: &[Sample]) -> std::result::Result<(), TrainingError> {
        let labeled: Vec<(&Label, Vec<String>)> = samples
            .iter()
            .filter_map(|s| s.label.as_ref().map(|l| (l, self.tokenize(&s.text))))
            .collect();

        if labeled.is_empty() {
            return Err(TrainingError::retryable("no labeled samples to train on"));
        }
        let skipped = samples.len() - labeled.len();
        if skipped > 0 {
            debug!(instance = %self.instance_ref, skipped, "Skipping unlabeled samples");
        }

        for (label, tokens) in &labeled {
            model.add(label, tokens);
        }

        let correct = labeled
            .iter()
            .filter(|(label, tokens)| {
                model
                    .predict(tokens)
                    .map(|(predicted, _)| &predicted == *label)
                    .unwrap_or(false)
            })
            .count();
        model.accuracy = Some(correct as f64 / labeled.len() as f64);
        Ok(())
    }

    fn commit(&self, model: KeywordModel) -> std::result::Result<(), TrainingError> {
        if let Some(store) = &self.store {
            store.save(&self.model_file(), &model).map_err(|e| {
                warn!(instance = %self.instance_ref, error = %e, "Failed to persist keyword model");
                TrainingError::retryable(format!("failed to persist model: {}", e))
            })?;
        }
        *self.model.write() = model;
        Ok(())
    }
}

impl std::fmt::Debug for KeywordClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordClassifier")
            .field("instance_ref", &self.instance_ref)
            .field("samples", &self.model.read().sample_count)
            .finish()
    }
}

#[async_trait]
impl ClassifierBackend for KeywordClassifier {
    fn kind(&self) -> &str {
        KEYWORD_KIND
    }

    fn instance_ref(&self) -> &str {
        &self.instance_ref
    }

    async fn train(&self, samples: &[Sample]) -> std::result::Result<(), TrainingError> {
        let mut model = KeywordModel::default();
        self.fit(&mut model, samples)?;
        self.commit(model)
    }

    async fn update(&self, samples: &[Sample]) -> std::result::Result<(), TrainingError> {
        let mut model = self.model.read().clone();
        self.fit(&mut model, samples)?;
        self.commit(model)
    }

    async fn get_train_status(&self) -> std::result::Result<TrainStatus, TrainingError> {
        Ok(TrainStatus::Done)
    }

    async fn classify(&self, sample: &Sample) -> Result<Option<Label>> {
        let tokens = self.tokenize(&sample.text);
        Ok(self.model.read().predict(&tokens).map(|(label, _)| label))
    }

    async fn classify_with_info(&self, sample: &Sample) -> Result<Option<Classification>> {
        let tokens = self.tokenize(&sample.text);
        let model = self.model.read();
        Ok(model.predict(&tokens).map(|(label, probability)| {
            Classification::new(label)
                .with_meta("probability", probability)
                .with_meta("tokens", tokens.len() as u64)
                .with_meta("instance", self.instance_ref.clone())
        }))
    }

    async fn analyze(&self) -> Result<PerformanceReport> {
        let model = self.model.read();
        Ok(PerformanceReport {
            kind: KEYWORD_KIND.to_string(),
            instance_ref: self.instance_ref.clone(),
            trained: model.is_trained(),
            sample_count: model.sample_count,
            labels: model.label_counts.clone(),
            accuracy: model.accuracy,
        })
    }
}
