use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cross_validation::CrossValidationConfig;
use crate::error::{Result, SentimentError};

/// The closed set of classifier families.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierFamily {
    #[serde(rename = "nb")]
    NaiveBayes,
    #[serde(rename = "dt")]
    DecisionTree,
    #[serde(rename = "rf")]
    RandomForest,
    #[serde(rename = "nn")]
    NeuralNet,
}

/// Feature representation a family trains on.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Token-presence sets.
    Symbolic,
    /// Dense vectors indexed by a fitted vocabulary.
    Numeric,
}

impl ClassifierFamily {
    pub const ALL: [ClassifierFamily; 4] = [
        ClassifierFamily::NaiveBayes,
        ClassifierFamily::DecisionTree,
        ClassifierFamily::RandomForest,
        ClassifierFamily::NeuralNet,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            ClassifierFamily::NaiveBayes => "nb",
            ClassifierFamily::DecisionTree => "dt",
            ClassifierFamily::RandomForest => "rf",
            ClassifierFamily::NeuralNet => "nn",
        }
    }

    pub fn representation(&self) -> Representation {
        match self {
            ClassifierFamily::NaiveBayes | ClassifierFamily::DecisionTree => {
                Representation::Symbolic
            }
            ClassifierFamily::RandomForest | ClassifierFamily::NeuralNet => {
                Representation::Numeric
            }
        }
    }
}

impl fmt::Display for ClassifierFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ClassifierFamily::NaiveBayes => "NaiveBayes",
            ClassifierFamily::DecisionTree => "DecisionTree",
            ClassifierFamily::RandomForest => "RandomForest",
            ClassifierFamily::NeuralNet => "NeuralNet",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Representation::Symbolic => write!(f, "symbolic"),
            Representation::Numeric => write!(f, "numeric"),
        }
    }
}

impl FromStr for ClassifierFamily {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nb" | "naive_bayes" | "naivebayes" => Ok(ClassifierFamily::NaiveBayes),
            "dt" | "decision_tree" | "decisiontree" => Ok(ClassifierFamily::DecisionTree),
            "rf" | "random_forest" | "randomforest" => Ok(ClassifierFamily::RandomForest),
            "nn" | "neural_net" | "neuralnet" => Ok(ClassifierFamily::NeuralNet),
            _ => Err(SentimentError::UnknownFamily(s.to_string())),
        }
    }
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    NaiveBayes,
    DecisionTree {
        /// Nodes whose label entropy is at or below this value become leaves.
        entropy_cutoff: f64,
        depth_cutoff: usize,
        /// Nodes with fewer instances than this become leaves.
        support_cutoff: usize,
    },
    RandomForest {
        n_trees: usize,
        seed: u64,
    },
    NeuralNet {
        hidden_layers: Vec<usize>,
        dropout: f32,
        epochs: usize,
        batch_size: usize,
        learning_rate: f64,
        /// Loss weights as (negative, positive).
        class_weights: (f32, f32),
    },
}

impl ModelType {
    /// Default hyper-parameters for a family.
    pub fn for_family(family: ClassifierFamily) -> Self {
        match family {
            ClassifierFamily::NaiveBayes => ModelType::NaiveBayes,
            ClassifierFamily::DecisionTree => ModelType::DecisionTree {
                entropy_cutoff: 0.05,
                depth_cutoff: 100,
                support_cutoff: 10,
            },
            ClassifierFamily::RandomForest => ModelType::RandomForest {
                n_trees: 100,
                seed: 0,
            },
            ClassifierFamily::NeuralNet => ModelType::NeuralNet {
                hidden_layers: vec![20, 30, 20],
                dropout: 0.5,
                epochs: 50,
                batch_size: 32,
                learning_rate: 0.001,
                class_weights: (3.0, 1.0),
            },
        }
    }

    pub fn family(&self) -> ClassifierFamily {
        match self {
            ModelType::NaiveBayes => ClassifierFamily::NaiveBayes,
            ModelType::DecisionTree { .. } => ClassifierFamily::DecisionTree,
            ModelType::RandomForest { .. } => ClassifierFamily::RandomForest,
            ModelType::NeuralNet { .. } => ClassifierFamily::NeuralNet,
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::NaiveBayes
    }
}

impl FromStr for ModelType {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(ModelType::for_family(ClassifierFamily::from_str(s)?))
    }
}

/// Rating cut-offs used to derive binary labels.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// Ratings at or below this value are negative.
    pub negative: f64,
    /// Ratings at or above this value are positive.
    pub positive: f64,
}

impl Thresholds {
    /// Ratings between the two thresholds are excluded, so `negative` must be
    /// strictly below `positive`.
    pub fn validate(&self) -> Result<()> {
        if !(self.negative < self.positive) {
            return Err(SentimentError::InvalidConfig(format!(
                "negative threshold ({}) must be below positive threshold ({})",
                self.negative, self.positive
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            negative: 2.0,
            positive: 4.0,
        }
    }
}

/// Immutable configuration of a `ReviewClassifier`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_type: ModelType,
    pub thresholds: Thresholds,
    pub cross_validation: CrossValidationConfig,
}

impl ClassifierConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            ..Default::default()
        }
    }

    pub fn for_family(family: ClassifierFamily) -> Self {
        Self::new(ModelType::for_family(family))
    }

    pub fn family(&self) -> ClassifierFamily {
        self.model_type.family()
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.cross_validation.folds < 2 {
            return Err(SentimentError::InvalidConfig(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.cross_validation.folds
            )));
        }
        match &self.model_type {
            ModelType::RandomForest { n_trees, .. } if *n_trees == 0 => Err(
                SentimentError::InvalidConfig("random forest needs at least one tree".to_string()),
            ),
            ModelType::NeuralNet {
                dropout,
                batch_size,
                ..
            } if !(0.0..1.0).contains(dropout) || *batch_size == 0 => {
                Err(SentimentError::InvalidConfig(format!(
                    "neural net needs dropout in [0, 1) and a non-zero batch size, got {} and {}",
                    dropout, batch_size
                )))
            }
            _ => Ok(()),
        }
    }
}
