pub mod classifier_trait;
pub mod decision_tree;
pub mod factory;
pub mod naive_bayes;
pub mod neural_net;
pub mod random_forest;

use crate::config::{ClassifierFamily, Representation};
use crate::data_handling::{Dataset, Label, SymbolicDataset, TokenPresenceSet};
use crate::error::{Result, SentimentError};
use crate::preprocessing::FeatureEncoder;

use self::classifier_trait::{ClassifierModel, Features};
use self::decision_tree::DecisionTreeClassifier;
use self::naive_bayes::NaiveBayesClassifier;
use self::neural_net::NeuralNetClassifier;
use self::random_forest::RandomForestClassifier;

/// A model of one of the four families.
#[derive(Debug)]
pub enum Model {
    NaiveBayes(NaiveBayesClassifier),
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    NeuralNet(NeuralNetClassifier),
}

impl Model {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Model::NaiveBayes(m) => m,
            Model::DecisionTree(m) => m,
            Model::RandomForest(m) => m,
            Model::NeuralNet(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Model::NaiveBayes(m) => m,
            Model::DecisionTree(m) => m,
            Model::RandomForest(m) => m,
            Model::NeuralNet(m) => m,
        }
    }
}

impl ClassifierModel for Model {
    fn family(&self) -> ClassifierFamily {
        self.inner().family()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.inner_mut().fit(dataset)
    }

    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>> {
        self.inner().predict_proba(features)
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// A fitted model plus the encoder its numeric input was built with.
#[derive(Debug)]
pub struct TrainedModel {
    model: Model,
    encoder: Option<FeatureEncoder>,
}

impl TrainedModel {
    /// Pair a trained model with its encoder. Numeric families require one,
    /// symbolic families must not carry one.
    pub fn new(model: Model, encoder: Option<FeatureEncoder>) -> Result<Self> {
        let family = model.family();
        if !model.is_trained() {
            return Err(SentimentError::ModelUnavailable(family));
        }
        match (family.representation(), encoder.is_some()) {
            (Representation::Symbolic, false) | (Representation::Numeric, true) => {
                Ok(Self { model, encoder })
            }
            (Representation::Symbolic, true) => Err(SentimentError::InvalidConfig(format!(
                "{} models do not use a feature encoder",
                family
            ))),
            (Representation::Numeric, false) => Err(SentimentError::InvalidConfig(format!(
                "{} models need a fitted feature encoder",
                family
            ))),
        }
    }

    pub fn family(&self) -> ClassifierFamily {
        self.model.family()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn encoder(&self) -> Option<&FeatureEncoder> {
        self.encoder.as_ref()
    }

    pub fn into_parts(self) -> (Model, Option<FeatureEncoder>) {
        (self.model, self.encoder)
    }

    /// P(Positive) for raw presence sets, encoding them first when needed.
    pub fn predict_proba_tokens(&self, sets: &[TokenPresenceSet]) -> Result<Vec<f32>> {
        match &self.encoder {
            None => self.model.predict_proba(&Features::Symbolic(sets.iter().collect())),
            Some(encoder) => {
                let matrix = encoder.encode_all(sets);
                self.model.predict_proba(&Features::Numeric(matrix.view()))
            }
        }
    }

    pub fn predict_tokens(&self, sets: &[TokenPresenceSet]) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba_tokens(sets)?
            .into_iter()
            .map(Label::from_probability)
            .collect())
    }

    /// Tokenize and label free-text comments.
    pub fn classify_comments<S: AsRef<str>>(&self, comments: &[S]) -> Result<Vec<Label>> {
        let sets: Vec<TokenPresenceSet> = comments
            .iter()
            .map(|c| TokenPresenceSet::from_comment(c.as_ref()))
            .collect();
        self.predict_tokens(&sets)
    }

    /// Accuracy on a labeled symbolic dataset, in [0, 1].
    pub fn evaluate_symbolic(&self, dataset: &SymbolicDataset) -> Result<f64> {
        match &self.encoder {
            None => self.model.evaluate(&Dataset::Symbolic(dataset.clone())),
            Some(encoder) => self.model.evaluate(&Dataset::Numeric(encoder.transform(dataset))),
        }
    }
}
