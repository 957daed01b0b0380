use crate::config::ModelType;
use crate::data_handling::Dataset;
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::{DecisionTreeClassifier, TreeParams};
use crate::models::naive_bayes::NaiveBayesClassifier;
use crate::models::neural_net::{NeuralNetClassifier, NeuralNetParams};
use crate::models::random_forest::{ForestParams, RandomForestClassifier};
use crate::models::Model;

/// Build an untrained model from a `ModelType`.
pub fn build_model(model_type: &ModelType) -> Model {
    match model_type {
        ModelType::NaiveBayes => Model::NaiveBayes(NaiveBayesClassifier::new()),
        ModelType::DecisionTree {
            entropy_cutoff,
            depth_cutoff,
            support_cutoff,
        } => Model::DecisionTree(DecisionTreeClassifier::new(TreeParams {
            entropy_cutoff: *entropy_cutoff,
            depth_cutoff: *depth_cutoff,
            support_cutoff: *support_cutoff,
        })),
        ModelType::RandomForest { n_trees, seed } => {
            Model::RandomForest(RandomForestClassifier::new(ForestParams {
                n_trees: *n_trees,
                seed: *seed,
            }))
        }
        ModelType::NeuralNet {
            hidden_layers,
            dropout,
            epochs,
            batch_size,
            learning_rate,
            class_weights,
        } => Model::NeuralNet(NeuralNetClassifier::new(NeuralNetParams {
            hidden_layers: hidden_layers.clone(),
            dropout: *dropout,
            epochs: *epochs,
            batch_size: *batch_size,
            learning_rate: *learning_rate,
            class_weights: *class_weights,
        })),
    }
}

/// Build and fit a fresh model on `dataset`.
pub fn train_model(model_type: &ModelType, dataset: &Dataset) -> Result<Model> {
    let family = model_type.family();
    if dataset.is_empty() {
        return Err(SentimentError::EmptyDataset(format!(
            "cannot train a {} model on zero instances",
            family
        )));
    }
    if dataset.representation() != family.representation() {
        return Err(SentimentError::RepresentationMismatch {
            family,
            expected: family.representation(),
        });
    }

    log::info!("Training {} model on {} instances", family, dataset.len());
    let mut model = build_model(model_type);
    model.fit(dataset)?;
    log::info!("{} model trained", family);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierFamily, Representation};
    use crate::data_handling::{Label, LabeledInstance, SymbolicDataset};

    fn symbolic() -> Dataset {
        Dataset::Symbolic(SymbolicDataset::new(vec![
            LabeledInstance {
                tokens: ["relief"].into_iter().collect(),
                label: Label::Positive,
            },
            LabeledInstance {
                tokens: ["rash"].into_iter().collect(),
                label: Label::Negative,
            },
        ]))
    }

    #[test]
    fn builds_every_family_untrained() {
        for family in ClassifierFamily::ALL {
            let model = build_model(&ModelType::for_family(family));
            assert_eq!(model.family(), family);
            assert!(!model.is_trained());
        }
    }

    #[test]
    fn trains_symbolic_family() {
        let model = train_model(&ModelType::NaiveBayes, &symbolic()).unwrap();
        assert!(model.is_trained());
        assert_eq!(model.name(), "naive_bayes");
    }

    #[test]
    fn numeric_family_rejects_symbolic_data() {
        let err = train_model(
            &ModelType::for_family(ClassifierFamily::RandomForest),
            &symbolic(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SentimentError::RepresentationMismatch {
                family: ClassifierFamily::RandomForest,
                expected: Representation::Numeric,
            }
        ));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let err = train_model(
            &ModelType::for_family(ClassifierFamily::DecisionTree),
            &Dataset::Symbolic(SymbolicDataset::default()),
        )
        .unwrap_err();
        assert!(matches!(err, SentimentError::EmptyDataset(_)));
    }
}
