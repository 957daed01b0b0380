use std::path::{Path, PathBuf};

use crate::config::{ClassifierConfig, ClassifierFamily};
use crate::cross_validation::{CrossValidationReport, CrossValidator};
use crate::data_handling::{read_reviews, BuiltDataset, DatasetBuilder, DatasetSummary, Label, Review};
use crate::error::{Result, SentimentError};
use crate::models::factory::train_model;
use crate::models::TrainedModel;
use crate::persistence;

/// Lifecycle stage of the model held by a [`ReviewClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Untrained,
    Trained,
    Persisted,
    Loaded,
}

/// The single model owned by a [`ReviewClassifier`].
#[derive(Debug, Default)]
pub enum ModelSlot {
    #[default]
    Untrained,
    Trained(TrainedModel),
    /// Trained in this session and written to `path`.
    Persisted { model: TrainedModel, path: PathBuf },
    /// Read back from `path`. Predicts like a trained model.
    Loaded { model: TrainedModel, path: PathBuf },
}

impl ModelSlot {
    pub fn state(&self) -> ModelState {
        match self {
            ModelSlot::Untrained => ModelState::Untrained,
            ModelSlot::Trained(_) => ModelState::Trained,
            ModelSlot::Persisted { .. } => ModelState::Persisted,
            ModelSlot::Loaded { .. } => ModelState::Loaded,
        }
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        match self {
            ModelSlot::Untrained => None,
            ModelSlot::Trained(model)
            | ModelSlot::Persisted { model, .. }
            | ModelSlot::Loaded { model, .. } => Some(model),
        }
    }

    /// Artifact location once the model has been saved or loaded.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ModelSlot::Persisted { path, .. } | ModelSlot::Loaded { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Trains, evaluates, persists and applies a sentiment model of one family.
#[derive(Debug)]
pub struct ReviewClassifier {
    config: ClassifierConfig,
    builder: DatasetBuilder,
    slot: ModelSlot,
}

impl ReviewClassifier {
    /// Create a classifier with an empty model slot.
    ///
    /// # Arguments
    ///
    /// * `config` - Family, hyper-parameters, rating thresholds and fold settings
    ///
    /// # Returns
    ///
    /// The classifier, or `InvalidConfig` if the configuration is inconsistent
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let builder = DatasetBuilder::new(config.thresholds)?;
        Ok(Self {
            config,
            builder,
            slot: ModelSlot::Untrained,
        })
    }

    pub fn for_family(family: ClassifierFamily) -> Result<Self> {
        Self::new(ClassifierConfig::for_family(family))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn family(&self) -> ClassifierFamily {
        self.config.family()
    }

    pub fn state(&self) -> ModelState {
        self.slot.state()
    }

    pub fn slot(&self) -> &ModelSlot {
        &self.slot
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.slot.model()
    }

    fn require_model(&self) -> Result<&TrainedModel> {
        self.slot
            .model()
            .ok_or(SentimentError::ModelUnavailable(self.family()))
    }

    /// Labeled dataset in the representation of the configured family.
    pub fn build_dataset(&self, reviews: &[Review]) -> Result<BuiltDataset> {
        self.builder.build(reviews, self.family())
    }

    /// Fit a model on `reviews` and hold it in the slot.
    ///
    /// # Returns
    ///
    /// Instance counts of the training dataset
    pub fn train(&mut self, reviews: &[Review]) -> Result<DatasetSummary> {
        let built = self.build_dataset(reviews)?;
        let model = train_model(&self.config.model_type, &built.dataset)?;
        self.slot = ModelSlot::Trained(TrainedModel::new(model, built.encoder)?);
        Ok(built.summary)
    }

    pub fn train_from_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<DatasetSummary> {
        let reviews = read_reviews(path)?;
        self.train(&reviews)
    }

    /// Stratified k-fold accuracy of the configured family on `reviews`.
    ///
    /// Leaves the model slot untouched.
    pub fn evaluate_average_accuracy(&self, reviews: &[Review]) -> Result<CrossValidationReport> {
        let (dataset, _) = self.builder.build_symbolic(reviews)?;
        CrossValidator::new(self.config.cross_validation.clone())
            .evaluate(&self.config.model_type, &dataset)
    }

    /// Accuracy of the held model on labeled `reviews`, in [0, 1].
    pub fn evaluate_accuracy(&self, reviews: &[Review]) -> Result<f64> {
        let model = self.require_model()?;
        let (dataset, _) = self.builder.build_symbolic(reviews)?;
        let accuracy = model.evaluate_symbolic(&dataset)?;
        log::info!("{} accuracy: {:.2}%", self.family(), accuracy * 100.0);
        Ok(accuracy)
    }

    /// Write the held model to `dir` and mark it persisted.
    pub fn save_model<P: AsRef<Path>>(&mut self, dir: P) -> Result<PathBuf> {
        let path = persistence::save_model(self.require_model()?, dir)?;
        self.slot = match std::mem::take(&mut self.slot) {
            ModelSlot::Trained(model) | ModelSlot::Persisted { model, .. } => ModelSlot::Persisted {
                model,
                path: path.clone(),
            },
            ModelSlot::Loaded { model, .. } => ModelSlot::Loaded {
                model,
                path: path.clone(),
            },
            ModelSlot::Untrained => ModelSlot::Untrained,
        };
        Ok(path)
    }

    /// Replace the held model with the configured family's artifact in `dir`.
    pub fn load_model<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let family = self.family();
        let model = persistence::load_model(family, dir.as_ref())?;
        self.slot = ModelSlot::Loaded {
            model,
            path: persistence::artifact_path(family, dir),
        };
        Ok(())
    }

    /// Label free-text comments with the held model.
    pub fn classify<S: AsRef<str>>(&self, comments: &[S]) -> Result<Vec<Label>> {
        self.require_model()?.classify_comments(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use tempfile::tempdir;

    fn reviews() -> Vec<Review> {
        vec![
            Review::new("Worked great, real relief", 5.0),
            Review::new("Great relief within days", 4.0),
            Review::new("Fast relief and no problems", 5.0),
            Review::new("Awful rash everywhere", 1.0),
            Review::new("Awful nausea, stopped taking it", 2.0),
            Review::new("Made me feel worse, rash", 1.0),
            Review::new("It was okay", 3.0),
        ]
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let dir = tempdir().unwrap();
        let mut classifier = ReviewClassifier::for_family(ClassifierFamily::NaiveBayes).unwrap();
        assert_eq!(classifier.state(), ModelState::Untrained);

        let summary = classifier.train(&reviews()).unwrap();
        assert_eq!(summary.excluded, 1);
        assert_eq!(classifier.state(), ModelState::Trained);

        let path = classifier.save_model(dir.path()).unwrap();
        assert_eq!(classifier.state(), ModelState::Persisted);
        assert_eq!(classifier.slot().path(), Some(path.as_path()));

        let mut fresh = ReviewClassifier::for_family(ClassifierFamily::NaiveBayes).unwrap();
        fresh.load_model(dir.path()).unwrap();
        assert_eq!(fresh.state(), ModelState::Loaded);
        assert_eq!(
            fresh.classify(&["awful rash", "great relief"]).unwrap(),
            classifier.classify(&["awful rash", "great relief"]).unwrap()
        );
    }

    #[test]
    fn untrained_classifier_cannot_save_or_classify() {
        let dir = tempdir().unwrap();
        let mut classifier = ReviewClassifier::for_family(ClassifierFamily::DecisionTree).unwrap();
        assert!(matches!(
            classifier.save_model(dir.path()),
            Err(SentimentError::ModelUnavailable(ClassifierFamily::DecisionTree))
        ));
        assert!(matches!(
            classifier.classify(&["anything"]),
            Err(SentimentError::ModelUnavailable(_))
        ));
        assert_eq!(classifier.state(), ModelState::Untrained);
    }

    #[test]
    fn symbolic_families_refuse_stopword_only_reviews() {
        let reviews = vec![
            Review::new("it was the", 5.0),
            Review::new("and so on", 5.0),
            Review::new("not for me", 1.0),
        ];
        for family in [ClassifierFamily::NaiveBayes, ClassifierFamily::DecisionTree] {
            let mut classifier = ReviewClassifier::for_family(family).unwrap();
            assert!(matches!(
                classifier.train(&reviews),
                Err(SentimentError::EmptyDataset(_))
            ));
            assert_eq!(classifier.state(), ModelState::Untrained);
        }
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = ClassifierConfig::for_family(ClassifierFamily::NaiveBayes);
        config.thresholds = Thresholds {
            negative: 4.0,
            positive: 4.0,
        };
        assert!(matches!(
            ReviewClassifier::new(config),
            Err(SentimentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn numeric_family_classifies_raw_text() {
        let mut config = ClassifierConfig::for_family(ClassifierFamily::RandomForest);
        config.model_type = crate::config::ModelType::RandomForest { n_trees: 15, seed: 0 };
        let mut classifier = ReviewClassifier::new(config).unwrap();
        classifier.train(&reviews()).unwrap();
        assert!(classifier.model().and_then(|m| m.encoder()).is_some());
        let labels = classifier.classify(&["relief", "never seen words"]).unwrap();
        assert_eq!(labels.len(), 2);
    }
}
