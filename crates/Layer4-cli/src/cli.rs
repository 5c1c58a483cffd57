//! Command implementations
//!
//! 출력은 stdout 에 JSON (list / show / analyze) 또는 한 줄 요약,
//! 로그는 stderr 로 간다.

use anyhow::{bail, Context, Result};
use hotswap_classifier::{
    BackendRegistry, ClassifierContext, ClassifierFactory, Sample, TrainingOutcome,
};
use hotswap_foundation::{HotswapConfig, JsonStore, SlotStore, SqliteSlotStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Keyword model files live here, under the data directory
pub const MODELS_DIR: &str = "models";

pub struct App {
    factory: ClassifierFactory,
    store: Arc<dyn SlotStore>,
}

impl App {
    pub fn open(config: &HotswapConfig) -> Result<Self> {
        let data_dir = config.resolve_data_dir()?;
        let store: Arc<dyn SlotStore> = Arc::new(
            SqliteSlotStore::open(&data_dir)
                .with_context(|| format!("opening slot store in {}", data_dir.display()))?,
        );
        let models = JsonStore::new(data_dir.join(MODELS_DIR));
        let registry = Arc::new(BackendRegistry::with_keyword(Some(models)));

        let ctx = ClassifierContext::from_config(config, store.clone(), registry)?;
        info!(data_dir = %data_dir.display(), "Hotswap ready");
        Ok(Self {
            factory: ClassifierFactory::new(ctx, config.default_backend.clone()),
            store,
        })
    }

    pub fn init(&self, job: u64, backend: Option<&str>) -> Result<()> {
        let classifier = self.factory.initialize_classifier(job, backend)?;
        let slot = classifier.slot()?;
        println!(
            "Initialized {} ({}): reader {}, writer {}",
            slot.id, slot.kind, slot.reader_ref, slot.writer_ref
        );
        Ok(())
    }

    pub fn show(&self, job: u64) -> Result<()> {
        let slot = self.store.get(&ClassifierFactory::slot_id(job))?;
        println!("{}", serde_json::to_string_pretty(&slot)?);
        Ok(())
    }

    pub fn list(&self) -> Result<()> {
        let slots = self.store.list()?;
        println!("{}", serde_json::to_string_pretty(&slots)?);
        Ok(())
    }

    pub async fn train(&self, job: u64, samples: &Path, update: bool) -> Result<()> {
        let samples = load_samples(samples)?;
        let classifier = self.factory.create_classifier(job)?;

        let outcome = if update {
            classifier.update(&samples).await?
        } else {
            classifier.train(&samples).await?
        };

        match outcome {
            TrainingOutcome::Success => {
                let slot = classifier.slot()?;
                println!("Trained on {} samples, now serving {}", samples.len(), slot.reader_ref);
                Ok(())
            }
            TrainingOutcome::RetryableError(msg) => bail!("training failed (retryable): {}", msg),
            TrainingOutcome::FatalError(msg) => bail!("training failed (fatal): {}", msg),
            TrainingOutcome::DeadlineExceeded => bail!("training did not finish before the deadline"),
        }
    }

    pub async fn classify(&self, job: u64, text: &str, with_info: bool) -> Result<()> {
        let classifier = self.factory.create_classifier(job)?;
        let sample = Sample::new(text);

        if with_info {
            match classifier.classify_with_info(&sample).await? {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => println!("null"),
            }
        } else {
            match classifier.classify(&sample).await? {
                Some(label) => println!("{}", label),
                None => println!("(unclassified)"),
            }
        }
        Ok(())
    }

    pub async fn analyze(&self, job: u64) -> Result<()> {
        let report = self.factory.create_classifier(job)?.analyze().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    pub async fn switch(&self, job: u64) -> Result<()> {
        let slot = self.factory.create_classifier(job)?.switch().await?;
        println!("Switched {}: now serving {}", slot.id, slot.reader_ref);
        Ok(())
    }
}

/// JSON array of samples
fn load_samples(path: &Path) -> Result<Vec<Sample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples from {}", path.display()))?;
    let samples: Vec<Sample> = serde_json::from_str(&content)
        .with_context(|| format!("parsing samples in {}", path.display()))?;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.json");
        std::fs::write(
            &path,
            r#"[{ "text": "cheap hotel", "label": "Yes" }, { "text": "no label" }]"#,
        )
        .unwrap();

        let samples = load_samples(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label.as_ref().map(|l| l.as_str()), Some("Yes"));
        assert!(samples[1].label.is_none());
    }

    #[test]
    fn test_load_samples_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_samples(&path).is_err());
    }
}
