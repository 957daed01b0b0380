//! Vocabulary fitting and dense encoding of token-presence sets.
//!
//! The vocabulary orders tokens lexicographically so that identical corpora
//! always produce identical column layouts. Labels are encoded with
//! [`Label::encode`](crate::data_handling::Label::encode) (Negative -> 0,
//! Positive -> 1).

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data_handling::{NumericDataset, SymbolicDataset, TokenPresenceSet};
use crate::error::{Result, SentimentError};

/// Token -> column index mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    index: BTreeMap<String, usize>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Tokens in column order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}

/// Fitted vocabulary used to turn presence sets into dense vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    vocabulary: Vocabulary,
}

impl FeatureEncoder {
    /// Union every token of the corpus into a vocabulary.
    pub fn fit(dataset: &SymbolicDataset) -> Result<Self> {
        let mut tokens: Vec<&str> = dataset
            .instances
            .iter()
            .flat_map(|instance| instance.tokens.iter())
            .collect();
        tokens.sort_unstable();
        tokens.dedup();

        if tokens.is_empty() {
            return Err(SentimentError::EmptyDataset(format!(
                "vocabulary is empty after stopword removal ({} instances)",
                dataset.len()
            )));
        }

        let index = tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| (token.to_string(), i))
            .collect();
        let vocabulary = Vocabulary { index };
        log::debug!("Fitted vocabulary of {} tokens", vocabulary.len());

        Ok(Self { vocabulary })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Dense presence vector for one instance. Unknown tokens are ignored.
    pub fn encode_tokens(&self, tokens: &TokenPresenceSet) -> Vec<f32> {
        let mut row = vec![0.0f32; self.n_features()];
        for token in tokens.iter() {
            if let Some(col) = self.vocabulary.index_of(token) {
                row[col] = 1.0;
            }
        }
        row
    }

    pub fn transform(&self, dataset: &SymbolicDataset) -> NumericDataset {
        NumericDataset {
            features: self.encode_rows(dataset.instances.iter().map(|i| &i.tokens)),
            labels: dataset.labels(),
        }
    }

    /// Encode a batch of presence sets into a feature matrix.
    pub fn encode_all(&self, sets: &[TokenPresenceSet]) -> Array2<f32> {
        self.encode_rows(sets.iter())
    }

    fn encode_rows<'a, I>(&self, rows: I) -> Array2<f32>
    where
        I: ExactSizeIterator<Item = &'a TokenPresenceSet>,
    {
        let mut features = Array2::<f32>::zeros((rows.len(), self.n_features()));
        for (row, tokens) in rows.enumerate() {
            for token in tokens.iter() {
                if let Some(col) = self.vocabulary.index_of(token) {
                    features[[row, col]] = 1.0;
                }
            }
        }
        features
    }
}
