use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ClassifierFamily;
use crate::data_handling::{Dataset, Label, LabeledInstance, TokenPresenceSet};
use crate::error::{Result, SentimentError};
use crate::models::classifier_trait::{symbolic_dataset, symbolic_features, ClassifierModel, Features};
use crate::stats::binary_entropy;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub entropy_cutoff: f64,
    pub depth_cutoff: usize,
    pub support_cutoff: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            entropy_cutoff: 0.05,
            depth_cutoff: 100,
            support_cutoff: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
enum TreeNode {
    Leaf {
        label: Label,
    },
    Split {
        token: String,
        present: Box<TreeNode>,
        absent: Box<TreeNode>,
    },
}

impl TreeNode {
    fn classify(&self, tokens: &TokenPresenceSet) -> Label {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { label } => return *label,
                TreeNode::Split {
                    token,
                    present,
                    absent,
                } => {
                    node = if tokens.contains(token) { present } else { absent };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { present, absent, .. } => 1 + present.depth().max(absent.depth()),
        }
    }
}

fn label_counts(instances: &[&LabeledInstance]) -> (usize, usize) {
    let positive = instances.iter().filter(|i| i.label == Label::Positive).count();
    (instances.len() - positive, positive)
}

fn majority(negative: usize, positive: usize) -> Label {
    if positive >= negative {
        Label::Positive
    } else {
        Label::Negative
    }
}

/// Entropy-driven decision tree over token presence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    root: Option<TreeNode>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        Self { params, root: None }
    }

    pub fn depth(&self) -> Option<usize> {
        self.root.as_ref().map(TreeNode::depth)
    }

    /// Split `instances` on their best token, then refine each branch.
    ///
    /// Every node reached gets its best stump. A branch is grown further only
    /// when this node holds more than `support_cutoff` instances, the branch is
    /// above `entropy_cutoff` and `depth_cutoff` still leaves room for a level.
    /// Otherwise the branch is a majority leaf.
    fn grow(&self, instances: &[&LabeledInstance], depth: usize) -> TreeNode {
        let (negative, positive) = label_counts(instances);
        let entropy = binary_entropy(negative, positive);

        let Some(token) = self.best_split(instances, entropy) else {
            return TreeNode::Leaf {
                label: majority(negative, positive),
            };
        };

        let (with, without): (Vec<&LabeledInstance>, Vec<&LabeledInstance>) =
            instances.iter().copied().partition(|i| i.tokens.contains(&token));

        let refine = instances.len() > self.params.support_cutoff
            && depth + 1 < self.params.depth_cutoff;

        TreeNode::Split {
            present: Box::new(self.branch(&with, depth + 1, refine)),
            absent: Box::new(self.branch(&without, depth + 1, refine)),
            token,
        }
    }

    fn branch(&self, instances: &[&LabeledInstance], depth: usize, refine: bool) -> TreeNode {
        let (negative, positive) = label_counts(instances);
        if refine && binary_entropy(negative, positive) > self.params.entropy_cutoff {
            self.grow(instances, depth)
        } else {
            TreeNode::Leaf {
                label: majority(negative, positive),
            }
        }
    }

    /// Token with the highest information gain, or `None` when no split helps.
    fn best_split(&self, instances: &[&LabeledInstance], entropy: f64) -> Option<String> {
        let mut present_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for instance in instances {
            for token in instance.tokens.iter() {
                let entry = present_counts.entry(token).or_insert((0, 0));
                match instance.label {
                    Label::Negative => entry.0 += 1,
                    Label::Positive => entry.1 += 1,
                }
            }
        }

        let (negative, positive) = label_counts(instances);
        let total = instances.len() as f64;
        let mut best: Option<(&str, f64)> = None;

        for (token, &(neg_with, pos_with)) in &present_counts {
            let with = neg_with + pos_with;
            if with == instances.len() {
                continue;
            }
            let (neg_without, pos_without) = (negative - neg_with, positive - pos_with);
            let remainder = (with as f64 / total) * binary_entropy(neg_with, pos_with)
                + ((instances.len() - with) as f64 / total) * binary_entropy(neg_without, pos_without);
            let gain = entropy - remainder;
            if gain > best.map_or(0.0, |(_, g)| g) {
                best = Some((token, gain));
            }
        }

        best.map(|(token, _)| token.to_string())
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeParams::default())
    }
}

impl ClassifierModel for DecisionTreeClassifier {
    fn family(&self) -> ClassifierFamily {
        ClassifierFamily::DecisionTree
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let data = symbolic_dataset(self.family(), dataset)?;
        let instances: Vec<&LabeledInstance> = data.instances.iter().collect();
        let root = self.grow(&instances, 0);
        log::debug!(
            "Decision tree fitted on {} instances, depth {}",
            data.len(),
            root.depth()
        );
        self.root = Some(root);
        Ok(())
    }

    fn predict_proba(&self, features: &Features) -> Result<Vec<f32>> {
        let rows = symbolic_features(self.family(), features)?;
        let root = self
            .root
            .as_ref()
            .ok_or(SentimentError::ModelUnavailable(self.family()))?;
        Ok(rows
            .iter()
            .map(|tokens| match root.classify(tokens) {
                Label::Positive => 1.0,
                Label::Negative => 0.0,
            })
            .collect())
    }

    fn is_trained(&self) -> bool {
        self.root.is_some()
    }

    fn name(&self) -> &str {
        "decision_tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::SymbolicDataset;

    fn instance(tokens: &[&str], label: Label) -> LabeledInstance {
        LabeledInstance {
            tokens: tokens.iter().copied().collect(),
            label,
        }
    }

    fn separable(n: usize) -> Dataset {
        let mut instances = Vec::new();
        for i in 0..n {
            let filler = format!("word{}", i % 3);
            instances.push(instance(&["helped", filler.as_str()], Label::Positive));
            instances.push(instance(&["worse", filler.as_str()], Label::Negative));
        }
        Dataset::Symbolic(SymbolicDataset::new(instances))
    }

    #[test]
    fn splits_on_the_informative_token() {
        let train = separable(10);
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&train).unwrap();
        assert_eq!(tree.evaluate(&train).unwrap(), 1.0);
        assert_eq!(tree.depth(), Some(1));
    }

    #[test]
    fn small_training_sets_still_split_at_the_root() {
        let mut instances = Vec::new();
        for i in 0..5 {
            let patient = format!("patient{}", i);
            instances.push(instance(&["relief", patient.as_str()], Label::Positive));
        }
        for i in 5..9 {
            let patient = format!("patient{}", i);
            instances.push(instance(&["rash", patient.as_str()], Label::Negative));
        }
        let train = Dataset::Symbolic(SymbolicDataset::new(instances));

        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&train).unwrap();
        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.evaluate(&train).unwrap(), 1.0);
        let rash: TokenPresenceSet = ["rash"].into_iter().collect();
        assert_eq!(
            tree.predict(&Features::Symbolic(vec![&rash])).unwrap(),
            vec![Label::Negative]
        );
    }

    /// No single token separates the labels; `z` is the best stump and leaves
    /// an impure absent branch of three instances.
    fn xor_like() -> Dataset {
        Dataset::Symbolic(SymbolicDataset::new(vec![
            instance(&["a", "b"], Label::Positive),
            instance(&["a"], Label::Negative),
            instance(&["b"], Label::Negative),
            instance(&["z"], Label::Positive),
        ]))
    }

    #[test]
    fn branches_of_small_nodes_become_majority_leaves() {
        let train = xor_like();
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&train).unwrap();
        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.evaluate(&train).unwrap(), 0.75);
    }

    #[test]
    fn lower_support_cutoff_refines_branches() {
        let train = xor_like();
        let mut tree = DecisionTreeClassifier::new(TreeParams {
            support_cutoff: 2,
            ..TreeParams::default()
        });
        tree.fit(&train).unwrap();
        assert_eq!(tree.depth(), Some(3));
        assert_eq!(tree.evaluate(&train).unwrap(), 1.0);
    }

    #[test]
    fn depth_cutoff_limits_levels() {
        let mut tree = DecisionTreeClassifier::new(TreeParams {
            support_cutoff: 2,
            depth_cutoff: 1,
            ..TreeParams::default()
        });
        tree.fit(&xor_like()).unwrap();
        assert_eq!(tree.depth(), Some(1));
    }

    #[test]
    fn pure_training_set_is_a_leaf() {
        let train = Dataset::Symbolic(SymbolicDataset::new(vec![
            instance(&["helped"], Label::Negative),
            instance(&["worse"], Label::Negative),
        ]));
        let mut tree = DecisionTreeClassifier::default();
        tree.fit(&train).unwrap();
        assert_eq!(tree.depth(), Some(0));
        let unseen: TokenPresenceSet = ["anything"].into_iter().collect();
        assert_eq!(
            tree.predict(&Features::Symbolic(vec![&unseen])).unwrap(),
            vec![Label::Negative]
        );
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let mut tree = DecisionTreeClassifier::default();
        let err = tree
            .fit(&Dataset::Symbolic(SymbolicDataset::default()))
            .unwrap_err();
        assert!(matches!(err, SentimentError::EmptyDataset(_)));
    }
}
