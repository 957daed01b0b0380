//! Bagged CART ensemble over dense presence vectors.

use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::data_handling::Dataset;
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::{numeric_dataset, numeric_features, ClassifierModel, Features};

/// Random forest configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Base seed; tree `i` draws from `seed + i`
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum CartNode {
    Leaf {
        /// Fraction of positive training rows that reached this leaf.
        positive_fraction: f32,
    },
    Split {
        feature: usize,
        present: Box<CartNode>,
        absent: Box<CartNode>,
    },
}

impl CartNode {
    fn positive_fraction(&self, row: &[f32]) -> f32 {
        let mut node = self;
        loop {
            match node {
                CartNode::Leaf { positive_fraction } => return *positive_fraction,
                CartNode::Split {
                    feature,
                    present,
                    absent,
                } => {
                    node = if row[*feature] > 0.5 { present } else { absent };
                }
            }
        }
    }
}

fn gini(negative: usize, positive: usize) -> f64 {
    let total = (negative + positive) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p = positive as f64 / total;
    2.0 * p * (1.0 - p)
}

/// Grows one tree on a bootstrap sample.
struct TreeBuilder<'a> {
    features: ArrayView2<'a, f32>,
    targets: &'a [u8],
    max_features: usize,
    rng: ChaCha8Rng,
}

impl<'a> TreeBuilder<'a> {
    fn is_present(&self, row: usize, feature: usize) -> bool {
        self.features[[row, feature]] > 0.5
    }

    fn counts(&self, rows: &[usize]) -> (usize, usize) {
        let positive = rows.iter().filter(|&&r| self.targets[r] == 1).count();
        (rows.len() - positive, positive)
    }

    fn grow(&mut self, rows: &[usize]) -> CartNode {
        let (negative, positive) = self.counts(rows);
        let leaf = CartNode::Leaf {
            positive_fraction: positive as f32 / rows.len() as f32,
        };
        if negative == 0 || positive == 0 {
            return leaf;
        }

        let Some(feature) = self.best_split(rows) else {
            return leaf;
        };
        let (with, without): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| self.is_present(r, feature));

        CartNode::Split {
            feature,
            present: Box::new(self.grow(&with)),
            absent: Box::new(self.grow(&without)),
        }
    }

    /// Visits features in random order until `max_features` non-constant
    /// candidates have been scored, and returns the lowest weighted Gini.
    fn best_split(&mut self, rows: &[usize]) -> Option<usize> {
        let mut order: Vec<usize> = (0..self.features.ncols()).collect();
        order.shuffle(&mut self.rng);

        let (negative, positive) = self.counts(rows);
        let total = rows.len() as f64;
        let mut best: Option<(usize, f64)> = None;
        let mut scored = 0;

        for feature in order {
            if scored >= self.max_features {
                break;
            }
            let (mut neg_with, mut pos_with) = (0, 0);
            for &r in rows {
                if self.is_present(r, feature) {
                    if self.targets[r] == 1 {
                        pos_with += 1;
                    } else {
                        neg_with += 1;
                    }
                }
            }
            let with = neg_with + pos_with;
            if with == 0 || with == rows.len() {
                continue;
            }
            scored += 1;

            let impurity = (with as f64 / total) * gini(neg_with, pos_with)
                + ((rows.len() - with) as f64 / total)
                    * gini(negative - neg_with, positive - pos_with);
            if best.map_or(true, |(_, b)| impurity < b) {
                best = Some((feature, impurity));
            }
        }

        best.map(|(feature, _)| feature)
    }
}

/// Random forest model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    n_features: usize,
    trees: Vec<CartNode>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn family(&self) -> ClassifierFamily {
        ClassifierFamily::RandomForest
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let data = numeric_dataset(self.family(), dataset)?;
        if self.params.n_trees == 0 {
            return Err(SentimentError::InvalidConfig(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let n_samples = data.len();
        let n_features = data.n_features();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let targets = data.targets();
        let features = data.features.view();
        let seed = self.params.seed;

        // Build trees in parallel
        let trees: Vec<CartNode> = (0..self.params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                let mut builder = TreeBuilder {
                    features,
                    targets: &targets,
                    max_features,
                    rng,
                };
                builder.grow(&sample)
            })
            .collect();

        log::debug!(
            "Random forest fitted: {} trees on {} rows x {} features (max_features {})",
            trees.len(),
            n_samples,
            n_features,
            max_features
        );
        self.n_features = n_features;
        self.trees = trees;
        Ok(())
    }

    /// Share of trees voting positive; a tied vote counts as positive.
    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>> {
        let rows = numeric_features(self.family(), features)?;
        if !self.is_trained() {
            return Err(SentimentError::ModelUnavailable(self.family()));
        }
        if rows.ncols() != self.n_features {
            return Err(SentimentError::InvalidConfig(format!(
                "expected {} features, got {}",
                self.n_features,
                rows.ncols()
            )));
        }

        let n_trees = self.trees.len() as f32;
        Ok(rows
            .outer_iter()
            .map(|row| {
                let row = row.to_vec();
                let votes = self
                    .trees
                    .iter()
                    .filter(|tree| tree.positive_fraction(&row) >= 0.5)
                    .count();
                votes as f32 / n_trees
            })
            .collect())
    }

    fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}
