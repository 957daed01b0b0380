use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::data_handling::{Dataset, Label, TokenPresenceSet};
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::{symbolic_dataset, symbolic_features, ClassifierModel, Features};

/// Add-half smoothing used by the expected likelihood estimate.
const ELE_GAMMA: f64 = 0.5;

/// Per-label counts, indexed by `Label::encode`.
type LabelCounts = [usize; 2];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct NaiveBayesModel {
    label_counts: LabelCounts,
    token_counts: BTreeMap<String, LabelCounts>,
}

impl NaiveBayesModel {
    fn total(&self) -> usize {
        self.label_counts[0] + self.label_counts[1]
    }

    /// Expected likelihood estimate of the label prior over the two labels.
    fn log_prior(&self, label: Label) -> f64 {
        let count = self.label_counts[label.encode() as usize];
        ((count as f64 + ELE_GAMMA) / (self.total() as f64 + 2.0 * ELE_GAMMA)).ln()
    }

    /// P(token present | label). Each token has two observable values
    /// (present / absent), so the estimate is (c + 0.5) / (n + 1.0).
    fn presence_probability(&self, counts: &LabelCounts, label: Label) -> f64 {
        let idx = label.encode() as usize;
        (counts[idx] as f64 + ELE_GAMMA) / (self.label_counts[idx] as f64 + 2.0 * ELE_GAMMA)
    }

    fn log_posterior(&self, tokens: &TokenPresenceSet, label: Label) -> f64 {
        let mut logp = self.log_prior(label);
        for token in tokens.iter() {
            if let Some(counts) = self.token_counts.get(token) {
                logp += self.presence_probability(counts, label).ln();
            }
        }
        logp
    }

    fn positive_probability(&self, tokens: &TokenPresenceSet) -> f32 {
        let pos = self.log_posterior(tokens, Label::Positive);
        let neg = self.log_posterior(tokens, Label::Negative);
        (1.0 / (1.0 + (neg - pos).exp())) as f32
    }
}

/// A token whose presence strongly favors one label.
#[derive(Debug, Clone, PartialEq)]
pub struct InformativeFeature {
    pub token: String,
    pub favored: Label,
    /// P(present | favored) / P(present | other).
    pub ratio: f64,
}

impl fmt::Display for InformativeFeature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let other = match self.favored {
            Label::Positive => Label::Negative,
            Label::Negative => Label::Positive,
        };
        write!(
            f,
            "{:>24} = True    {} : {} = {:8.1} : 1.0",
            self.token, self.favored, other, self.ratio
        )
    }
}

/// Naive Bayes over token presence.
///
/// Only tokens present in an instance and seen during training contribute to
/// the posterior; ties between labels resolve to `Positive`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NaiveBayesClassifier {
    model: Option<NaiveBayesModel>,
}

impl NaiveBayesClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n` tokens with the largest likelihood ratio between labels.
    pub fn most_informative_features(&self, n: usize) -> Vec<InformativeFeature> {
        let Some(model) = &self.model else {
            return Vec::new();
        };

        let mut features: Vec<InformativeFeature> = model
            .token_counts
            .iter()
            .map(|(token, counts)| {
                let p_pos = model.presence_probability(counts, Label::Positive);
                let p_neg = model.presence_probability(counts, Label::Negative);
                let (favored, ratio) = if p_pos >= p_neg {
                    (Label::Positive, p_pos / p_neg)
                } else {
                    (Label::Negative, p_neg / p_pos)
                };
                InformativeFeature {
                    token: token.clone(),
                    favored,
                    ratio,
                }
            })
            .collect();

        features.sort_by(|a, b| {
            b.ratio
                .total_cmp(&a.ratio)
                .then_with(|| a.token.cmp(&b.token))
        });
        features.truncate(n);
        features
    }
}

impl ClassifierModel for NaiveBayesClassifier {
    fn family(&self) -> ClassifierFamily {
        ClassifierFamily::NaiveBayes
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let data = symbolic_dataset(self.family(), dataset)?;

        let mut label_counts: LabelCounts = [0, 0];
        let mut token_counts: BTreeMap<String, LabelCounts> = BTreeMap::new();
        for instance in &data.instances {
            let idx = instance.label.encode() as usize;
            label_counts[idx] += 1;
            for token in instance.tokens.iter() {
                token_counts.entry(token.to_string()).or_insert([0, 0])[idx] += 1;
            }
        }

        log::debug!(
            "Naive Bayes fitted on {} instances, {} distinct tokens",
            data.len(),
            token_counts.len()
        );
        self.model = Some(NaiveBayesModel {
            label_counts,
            token_counts,
        });
        Ok(())
    }

    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>> {
        let rows = symbolic_features(self.family(), features)?;
        let model = self
            .model
            .as_ref()
            .ok_or(SentimentError::ModelUnavailable(self.family()))?;
        Ok(rows.iter().map(|tokens| model.positive_probability(tokens)).collect())
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn name(&self) -> &str {
        "naive_bayes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::{LabeledInstance, SymbolicDataset};

    fn dataset(rows: &[(&[&str], Label)]) -> Dataset {
        Dataset::Symbolic(SymbolicDataset::new(
            rows.iter()
                .map(|(tokens, label)| LabeledInstance {
                    tokens: tokens.iter().copied().collect(),
                    label: *label,
                })
                .collect(),
        ))
    }

    fn training_set() -> Dataset {
        dataset(&[
            (&["great", "relief"], Label::Positive),
            (&["great", "works"], Label::Positive),
            (&["relief", "fast"], Label::Positive),
            (&["awful", "rash"], Label::Negative),
            (&["awful", "nausea"], Label::Negative),
        ])
    }

    #[test]
    fn predicts_training_labels() {
        let train = training_set();
        let mut nb = NaiveBayesClassifier::new();
        nb.fit(&train).unwrap();
        assert_eq!(nb.predict(&train.features()).unwrap(), train.labels());
        assert_eq!(nb.evaluate(&train).unwrap(), 1.0);
    }

    #[test]
    fn unknown_tokens_fall_back_to_prior() {
        let mut nb = NaiveBayesClassifier::new();
        nb.fit(&training_set()).unwrap();
        let unseen: TokenPresenceSet = ["zebra"].into_iter().collect();
        let proba = nb.predict_proba(&Features::Symbolic(vec![&unseen])).unwrap();
        assert!((proba[0] - 3.5 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn prior_is_smoothed_for_a_single_label_corpus() {
        let mut nb = NaiveBayesClassifier::new();
        nb.fit(&dataset(&[
            (&["relief"], Label::Positive),
            (&["works"], Label::Positive),
        ]))
        .unwrap();
        let unseen: TokenPresenceSet = ["zebra"].into_iter().collect();
        let proba = nb.predict_proba(&Features::Symbolic(vec![&unseen])).unwrap();
        // (2 + 0.5) / 3 against (0 + 0.5) / 3
        assert!((proba[0] - 2.5 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn most_informative_features_are_ranked() {
        let mut nb = NaiveBayesClassifier::new();
        nb.fit(&training_set()).unwrap();
        let top = nb.most_informative_features(2);
        assert_eq!(top.len(), 2);
        assert!(top[0].ratio >= top[1].ratio);
        assert_eq!(top[0].token, "awful");
        assert_eq!(top[0].favored, Label::Negative);
    }

    #[test]
    fn untrained_model_is_unavailable() {
        let nb = NaiveBayesClassifier::new();
        let tokens = TokenPresenceSet::default();
        let err = nb.predict(&Features::Symbolic(vec![&tokens])).unwrap_err();
        assert!(matches!(err, SentimentError::ModelUnavailable(ClassifierFamily::NaiveBayes)));
    }

    #[test]
    fn rejects_numeric_input() {
        let mut nb = NaiveBayesClassifier::new();
        nb.fit(&training_set()).unwrap();
        let matrix = ndarray::Array2::<f32>::zeros((1, 3));
        let err = nb.predict(&Features::Numeric(matrix.view())).unwrap_err();
        assert!(matches!(err, SentimentError::RepresentationMismatch { .. }));
    }
}
