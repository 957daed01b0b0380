use statrs::statistics::Statistics;

use crate::data_handling::Label;

/// Fraction of positions where `predicted` matches `truth`.
///
/// Returns 0.0 for empty input.
pub fn accuracy(predicted: &[Label], truth: &[Label]) -> f64 {
    assert_eq!(
        predicted.len(),
        truth.len(),
        "predictions and labels must have equal lengths"
    );
    if truth.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / truth.len() as f64
}

/// Arithmetic mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    (values.iter().mean(), values.iter().population_std_dev())
}

/// Shannon entropy (bits) of a two-class count pair.
pub fn binary_entropy(negative: usize, positive: usize) -> f64 {
    let total = (negative + positive) as f64;
    if total == 0.0 {
        return 0.0;
    }
    [negative, positive]
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
