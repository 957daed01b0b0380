use ndarray::ArrayView2;

use crate::config::{ClassifierFamily, Representation};
use crate::data_handling::{Dataset, Label, NumericDataset, SymbolicDataset, TokenPresenceSet};
use crate::error::{Result, SentimentError};
use crate::stats::accuracy;

/// Borrowed, unlabeled model input of one representation kind.
#[derive(Debug, Clone)]
pub enum Features<'a> {
    Symbolic(Vec<&'a TokenPresenceSet>),
    Numeric(ArrayView2<'a, f32>),
}

impl<'a> Features<'a> {
    pub fn representation(&self) -> Representation {
        match self {
            Features::Symbolic(_) => Representation::Symbolic,
            Features::Numeric(_) => Representation::Numeric,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Features::Symbolic(rows) => rows.len(),
            Features::Numeric(rows) => rows.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Dataset {
    /// Unlabeled view over the instances.
    pub fn features(&self) -> Features<'_> {
        match self {
            Dataset::Symbolic(d) => Features::Symbolic(d.instances.iter().map(|i| &i.tokens).collect()),
            Dataset::Numeric(d) => Features::Numeric(d.features.view()),
        }
    }
}

/// Uniform contract implemented by every classifier family.
pub trait ClassifierModel {
    fn family(&self) -> ClassifierFamily;

    /// Fit on a labeled dataset of the family's representation.
    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// Probability of the positive label for each row.
    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>>;

    fn predict(&self, features: &Features) -> Result<Vec<Label>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(Label::from_probability)
            .collect())
    }

    /// Fraction of correctly predicted labels, in [0, 1].
    fn evaluate(&self, dataset: &Dataset) -> Result<f64> {
        let predicted = self.predict(&dataset.features())?;
        Ok(accuracy(&predicted, &dataset.labels()))
    }

    fn is_trained(&self) -> bool;

    fn name(&self) -> &str {
        "classifier"
    }
}

pub(crate) fn symbolic_dataset<'a>(
    family: ClassifierFamily,
    dataset: &'a Dataset,
) -> Result<&'a SymbolicDataset> {
    match dataset {
        Dataset::Symbolic(d) if !d.is_empty() => Ok(d),
        Dataset::Symbolic(_) => Err(empty_training_set(family)),
        Dataset::Numeric(_) => Err(SentimentError::RepresentationMismatch {
            family,
            expected: Representation::Symbolic,
        }),
    }
}

pub(crate) fn numeric_dataset<'a>(
    family: ClassifierFamily,
    dataset: &'a Dataset,
) -> Result<&'a NumericDataset> {
    match dataset {
        Dataset::Numeric(d) if !d.is_empty() => Ok(d),
        Dataset::Numeric(_) => Err(empty_training_set(family)),
        Dataset::Symbolic(_) => Err(SentimentError::RepresentationMismatch {
            family,
            expected: Representation::Numeric,
        }),
    }
}

pub(crate) fn symbolic_features<'a, 'b>(
    family: ClassifierFamily,
    features: &'b Features<'a>,
) -> Result<&'b [&'a TokenPresenceSet]> {
    match features {
        Features::Symbolic(rows) => Ok(rows.as_slice()),
        Features::Numeric(_) => Err(SentimentError::RepresentationMismatch {
            family,
            expected: Representation::Symbolic,
        }),
    }
}

pub(crate) fn numeric_features<'a, 'b>(
    family: ClassifierFamily,
    features: &'b Features<'a>,
) -> Result<&'b ArrayView2<'a, f32>> {
    match features {
        Features::Numeric(rows) => Ok(rows),
        Features::Symbolic(_) => Err(SentimentError::RepresentationMismatch {
            family,
            expected: Representation::Numeric,
        }),
    }
}

fn empty_training_set(family: ClassifierFamily) -> SentimentError {
    SentimentError::EmptyDataset(format!("cannot train a {} model on zero instances", family))
}
