use thiserror::Error;

use crate::config::{ClassifierFamily, Representation};

/// Errors raised while building datasets, training, evaluating or persisting models.
#[derive(Error, Debug)]
pub enum SentimentError {
    /// Malformed review record or non-numeric rating. `record` is 1-based.
    #[error("Failed to parse review record {record}: {message}")]
    InputParse { record: usize, message: String },

    /// No instance survived threshold filtering, or the vocabulary is empty.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Unknown classifier family: {0}. Valid options are: nb, dt, rf, nn")]
    UnknownFamily(String),

    #[error("No trained {0} model is available")]
    ModelUnavailable(ClassifierFamily),

    #[error("{family} models expect a {expected} dataset")]
    RepresentationMismatch {
        family: ClassifierFamily,
        expected: Representation,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure inside the numeric fit/predict routines, passed through untouched.
    #[error(transparent)]
    Training(#[from] candle_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization error: {0}")]
    Persistence(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, SentimentError>;
