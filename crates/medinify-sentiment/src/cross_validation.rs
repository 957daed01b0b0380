//! Stratified k-fold evaluation.
//!
//! With [`VocabularyFit::Global`] (the default) numeric families are encoded
//! once with a vocabulary fitted on the whole corpus, held-out folds included.
//! Tokens that only occur in a test fold therefore still get a column, which
//! makes the estimate optimistic. [`VocabularyFit::PerFold`] refits the encoder
//! on every training partition instead.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierFamily, ModelType, Representation};
use crate::data_handling::{Dataset, Label, SymbolicDataset};
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::train_model;
use crate::models::Model;
use crate::preprocessing::FeatureEncoder;
use crate::stats::mean_std;

/// Where numeric families get their vocabulary from during cross-validation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyFit {
    /// Fit once on the full corpus before splitting.
    #[default]
    Global,
    /// Fit on each training partition.
    PerFold,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub folds: usize,
    /// Shuffle seed. `None` draws from OS entropy, so splits differ run to run.
    pub seed: Option<u64>,
    pub vocabulary_fit: VocabularyFit,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: 10,
            seed: None,
            vocabulary_fit: VocabularyFit::Global,
        }
    }
}

/// Train/test indices of one fold, both ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled stratified k-fold splitter.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    folds: usize,
    seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(folds: usize, seed: Option<u64>) -> Self {
        Self { folds, seed }
    }

    /// Each class is shuffled and dealt round-robin over the folds; the
    /// rotation carries on from one class to the next so fold sizes differ by
    /// at most one.
    pub fn split(&self, labels: &[Label]) -> Result<Vec<FoldSplit>> {
        let n = labels.len();
        if self.folds < 2 || self.folds > n {
            return Err(SentimentError::InvalidConfig(format!(
                "cannot split {} instances into {} folds",
                n, self.folds
            )));
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut fold_of = vec![0usize; n];
        let mut next = 0;
        for class in [Label::Positive, Label::Negative] {
            let mut members: Vec<usize> = (0..n).filter(|&i| labels[i] == class).collect();
            members.shuffle(&mut rng);
            for idx in members {
                fold_of[idx] = next % self.folds;
                next += 1;
            }
        }

        Ok((0..self.folds)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n).partition(|&i| fold_of[i] == fold);
                FoldSplit { train, test }
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldScore {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Percentage of held-out labels predicted correctly.
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    pub family: ClassifierFamily,
    pub fold_scores: Vec<FoldScore>,
    /// Arithmetic mean of the fold accuracies, in percent.
    pub mean: f64,
    /// Population standard deviation of the fold accuracies.
    pub std: f64,
}

impl CrossValidationReport {
    pub fn accuracies(&self) -> Vec<f64> {
        self.fold_scores.iter().map(|s| s.accuracy).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    config: CrossValidationConfig,
}

impl CrossValidator {
    pub fn new(config: CrossValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrossValidationConfig {
        &self.config
    }

    /// Train/test datasets of every fold, in the representation `family`
    /// trains on. Numeric folds are encoded according to `vocabulary_fit`.
    pub fn partitions<'a>(
        &'a self,
        family: ClassifierFamily,
        dataset: &'a SymbolicDataset,
    ) -> Result<impl Iterator<Item = Result<(FoldSplit, Dataset, Dataset)>> + 'a> {
        if dataset.is_empty() {
            return Err(SentimentError::EmptyDataset(
                "cannot cross-validate an empty dataset".to_string(),
            ));
        }

        let splits =
            StratifiedKFold::new(self.config.folds, self.config.seed).split(&dataset.labels())?;

        let global = match (family.representation(), self.config.vocabulary_fit) {
            (Representation::Numeric, VocabularyFit::Global) => {
                let encoder = FeatureEncoder::fit(dataset)?;
                Some(Dataset::Numeric(encoder.transform(dataset)))
            }
            _ => None,
        };

        Ok(splits.into_iter().map(move |split| {
            let (train, test) = self.partition(family, dataset, global.as_ref(), &split)?;
            Ok((split, train, test))
        }))
    }

    /// Train a fresh model per fold and score it on the held-out partition.
    pub fn evaluate(
        &self,
        model_type: &ModelType,
        dataset: &SymbolicDataset,
    ) -> Result<CrossValidationReport> {
        let family = model_type.family();
        let folds = self.config.folds;
        let partitions = self.partitions(family, dataset)?;

        log::info!(
            "Cross-validating {} over {} folds ({} instances)",
            family,
            folds,
            dataset.len()
        );

        let mut fold_scores = Vec::with_capacity(folds);
        for (fold, partition) in partitions.enumerate() {
            let (split, train, test) = partition?;
            let model = train_model(model_type, &train)?;
            let accuracy = model.evaluate(&test)? * 100.0;

            if let Model::NaiveBayes(nb) = &model {
                for feature in nb.most_informative_features(10) {
                    log::debug!("{}", feature);
                }
            }

            fold_scores.push(FoldScore {
                fold,
                train_size: split.train.len(),
                test_size: split.test.len(),
                accuracy,
            });
            let accuracies: Vec<f64> = fold_scores.iter().map(|s| s.accuracy).collect();
            let (mean, std) = mean_std(&accuracies);
            log::info!(
                "Fold {}/{}: accuracy {:.2}% (running mean {:.2}%, std {:.2})",
                fold + 1,
                folds,
                accuracy,
                mean,
                std
            );
        }

        let accuracies: Vec<f64> = fold_scores.iter().map(|s| s.accuracy).collect();
        let (mean, std) = mean_std(&accuracies);
        log::info!("Average accuracy: {:.2}%", mean);

        Ok(CrossValidationReport {
            family,
            fold_scores,
            mean,
            std,
        })
    }

    fn partition(
        &self,
        family: ClassifierFamily,
        dataset: &SymbolicDataset,
        global: Option<&Dataset>,
        split: &FoldSplit,
    ) -> Result<(Dataset, Dataset)> {
        if let Some(full) = global {
            return Ok((full.subset(&split.train), full.subset(&split.test)));
        }
        let train = dataset.subset(&split.train);
        let test = dataset.subset(&split.test);
        match family.representation() {
            Representation::Symbolic => Ok((Dataset::Symbolic(train), Dataset::Symbolic(test))),
            Representation::Numeric => {
                let encoder = FeatureEncoder::fit(&train)?;
                Ok((
                    Dataset::Numeric(encoder.transform(&train)),
                    Dataset::Numeric(encoder.transform(&test)),
                ))
            }
        }
    }
}
