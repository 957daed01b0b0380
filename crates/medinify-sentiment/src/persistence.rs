//! One bincode artifact per classifier family.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::error::{Result, SentimentError};
use crate::models::decision_tree::DecisionTreeClassifier;
use crate::models::naive_bayes::NaiveBayesClassifier;
use crate::models::neural_net::{NeuralNetClassifier, NeuralNetState};
use crate::models::random_forest::RandomForestClassifier;
use crate::models::{Model, TrainedModel};
use crate::preprocessing::FeatureEncoder;

#[derive(Serialize, Deserialize)]
enum PersistedModel {
    NaiveBayes(NaiveBayesClassifier),
    DecisionTree(DecisionTreeClassifier),
    RandomForest {
        model: RandomForestClassifier,
        encoder: FeatureEncoder,
    },
    NeuralNet {
        state: NeuralNetState,
        encoder: FeatureEncoder,
    },
}

impl PersistedModel {
    fn family(&self) -> ClassifierFamily {
        match self {
            PersistedModel::NaiveBayes(_) => ClassifierFamily::NaiveBayes,
            PersistedModel::DecisionTree(_) => ClassifierFamily::DecisionTree,
            PersistedModel::RandomForest { .. } => ClassifierFamily::RandomForest,
            PersistedModel::NeuralNet { .. } => ClassifierFamily::NeuralNet,
        }
    }

    fn from_trained(trained: &TrainedModel) -> Result<Self> {
        let family = trained.family();
        let encoder = || {
            trained
                .encoder()
                .cloned()
                .ok_or(SentimentError::ModelUnavailable(family))
        };
        Ok(match trained.model() {
            Model::NaiveBayes(m) => PersistedModel::NaiveBayes(m.clone()),
            Model::DecisionTree(m) => PersistedModel::DecisionTree(m.clone()),
            Model::RandomForest(m) => PersistedModel::RandomForest {
                model: m.clone(),
                encoder: encoder()?,
            },
            Model::NeuralNet(m) => PersistedModel::NeuralNet {
                state: m.to_state()?,
                encoder: encoder()?,
            },
        })
    }

    fn into_trained(self) -> Result<TrainedModel> {
        match self {
            PersistedModel::NaiveBayes(m) => TrainedModel::new(Model::NaiveBayes(m), None),
            PersistedModel::DecisionTree(m) => TrainedModel::new(Model::DecisionTree(m), None),
            PersistedModel::RandomForest { model, encoder } => {
                TrainedModel::new(Model::RandomForest(model), Some(encoder))
            }
            PersistedModel::NeuralNet { state, encoder } => TrainedModel::new(
                Model::NeuralNet(NeuralNetClassifier::from_state(state)?),
                Some(encoder),
            ),
        }
    }
}

/// Fixed file name of a family's artifact, e.g. `trained_nb_model.bin`.
pub fn artifact_name(family: ClassifierFamily) -> String {
    format!("trained_{}_model.bin", family.short_name())
}

pub fn artifact_path<P: AsRef<Path>>(family: ClassifierFamily, dir: P) -> PathBuf {
    dir.as_ref().join(artifact_name(family))
}

/// Write `trained` into `dir`, replacing any previous artifact of its family.
pub fn save_model<P: AsRef<Path>>(trained: &TrainedModel, dir: P) -> Result<PathBuf> {
    let persisted = PersistedModel::from_trained(trained)?;
    fs::create_dir_all(dir.as_ref())?;
    let path = artifact_path(trained.family(), dir);

    let writer = BufWriter::new(File::create(&path)?);
    bincode::serialize_into(writer, &persisted)?;
    log::info!("Saved {} model to {:?}", trained.family(), path);
    Ok(path)
}

/// Read the artifact of `family` from `dir`.
pub fn load_model<P: AsRef<Path>>(family: ClassifierFamily, dir: P) -> Result<TrainedModel> {
    let path = artifact_path(family, dir);
    if !path.is_file() {
        log::warn!("No {} model found at {:?}", family, path);
        return Err(SentimentError::ModelUnavailable(family));
    }

    let reader = BufReader::new(File::open(&path)?);
    let persisted: PersistedModel = bincode::deserialize_from(reader)?;
    if persisted.family() != family {
        log::warn!(
            "{:?} holds a {} model, expected {}",
            path,
            persisted.family(),
            family
        );
        return Err(SentimentError::ModelUnavailable(family));
    }

    log::info!("Loaded {} model from {:?}", family, path);
    persisted.into_trained()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;
    use crate::data_handling::{Dataset, Label, LabeledInstance, SymbolicDataset, TokenPresenceSet};
    use crate::models::factory::train_model;
    use tempfile::tempdir;

    fn trained_nb() -> TrainedModel {
        let dataset = Dataset::Symbolic(SymbolicDataset::new(vec![
            LabeledInstance {
                tokens: ["relief", "fast"].into_iter().collect(),
                label: Label::Positive,
            },
            LabeledInstance {
                tokens: ["rash"].into_iter().collect(),
                label: Label::Negative,
            },
        ]));
        let model = train_model(&ModelType::NaiveBayes, &dataset).unwrap();
        TrainedModel::new(model, None).unwrap()
    }

    #[test]
    fn artifact_names_are_fixed() {
        assert_eq!(artifact_name(ClassifierFamily::NaiveBayes), "trained_nb_model.bin");
        assert_eq!(artifact_name(ClassifierFamily::DecisionTree), "trained_dt_model.bin");
        assert_eq!(artifact_name(ClassifierFamily::RandomForest), "trained_rf_model.bin");
        assert_eq!(artifact_name(ClassifierFamily::NeuralNet), "trained_nn_model.bin");
    }

    #[test]
    fn naive_bayes_round_trip() {
        let dir = tempdir().unwrap();
        let trained = trained_nb();
        let path = save_model(&trained, dir.path()).unwrap();
        assert!(path.ends_with("trained_nb_model.bin"));

        let loaded = load_model(ClassifierFamily::NaiveBayes, dir.path()).unwrap();
        let probes: Vec<TokenPresenceSet> = vec![
            ["relief"].into_iter().collect(),
            ["rash", "fast"].into_iter().collect(),
        ];
        assert_eq!(
            trained.predict_proba_tokens(&probes).unwrap(),
            loaded.predict_proba_tokens(&probes).unwrap()
        );
    }

    #[test]
    fn missing_artifact_is_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_model(ClassifierFamily::DecisionTree, dir.path()).unwrap_err();
        assert!(matches!(err, SentimentError::ModelUnavailable(ClassifierFamily::DecisionTree)));
    }

    #[test]
    fn mislabelled_artifact_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = save_model(&trained_nb(), dir.path()).unwrap();
        fs::rename(&path, artifact_path(ClassifierFamily::DecisionTree, dir.path())).unwrap();
        let err = load_model(ClassifierFamily::DecisionTree, dir.path()).unwrap_err();
        assert!(matches!(err, SentimentError::ModelUnavailable(ClassifierFamily::DecisionTree)));
    }

    #[test]
    fn corrupt_artifact_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        fs::write(artifact_path(ClassifierFamily::NaiveBayes, dir.path()), b"\xff\xff\xff").unwrap();
        let err = load_model(ClassifierFamily::NaiveBayes, dir.path()).unwrap_err();
        assert!(matches!(err, SentimentError::Persistence(_)));
    }
}
