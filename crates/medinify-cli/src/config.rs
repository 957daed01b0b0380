use std::path::Path;

use anyhow::{Context, Result};

use medinify_sentiment::config::{ClassifierConfig, ClassifierFamily, ModelType};
use medinify_sentiment::cross_validation::VocabularyFit;

/// Load a classifier configuration from a JSON file.
pub fn load_classifier_config<P: AsRef<Path>>(path: P) -> Result<ClassifierConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: ClassifierConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub family: Option<ClassifierFamily>,
    pub pos_threshold: Option<f64>,
    pub neg_threshold: Option<f64>,
    pub folds: Option<usize>,
    pub seed: Option<u64>,
    pub per_fold_vocabulary: bool,
}

impl ConfigOverrides {
    /// Apply the overrides. A family that differs from the configured one
    /// resets the model to that family's defaults.
    pub fn apply(&self, mut config: ClassifierConfig) -> ClassifierConfig {
        if let Some(family) = self.family {
            if family != config.family() {
                config.model_type = ModelType::for_family(family);
            }
        }
        if let Some(positive) = self.pos_threshold {
            config.thresholds.positive = positive;
        }
        if let Some(negative) = self.neg_threshold {
            config.thresholds.negative = negative;
        }
        if let Some(folds) = self.folds {
            config.cross_validation.folds = folds;
        }
        if self.seed.is_some() {
            config.cross_validation.seed = self.seed;
        }
        if self.per_fold_vocabulary {
            config.cross_validation.vocabulary_fit = VocabularyFit::PerFold;
        }
        config
    }
}

/// Resolve the effective configuration from an optional JSON file and overrides.
pub fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ClassifierConfig> {
    let base = match path {
        Some(path) => {
            log::info!("[Medinify] Using config: {:?}", path);
            load_classifier_config(path)?
        }
        None => ClassifierConfig::default(),
    };
    let config = overrides.apply(base);
    config.validate().context("Invalid classifier configuration")?;
    Ok(config)
}
