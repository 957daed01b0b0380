use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use medinify_sentiment::classifier::ReviewClassifier;
use medinify_sentiment::config::ClassifierConfig;
use medinify_sentiment::cross_validation::CrossValidationReport;
use medinify_sentiment::data_handling::{read_comments, read_reviews, Label};

/// Train on a reviews CSV and write the artifact into `output_dir`.
pub fn run_train(config: ClassifierConfig, reviews: &Path, output_dir: &Path) -> Result<PathBuf> {
    let mut classifier = ReviewClassifier::new(config)?;
    let summary = classifier
        .train_from_csv(reviews)
        .with_context(|| format!("Failed to train on {}", reviews.display()))?;
    log::info!(
        "[Medinify] Trained {} on {} instances ({} excluded)",
        classifier.family(),
        summary.total(),
        summary.excluded
    );
    let path = classifier
        .save_model(output_dir)
        .with_context(|| format!("Failed to save model to {}", output_dir.display()))?;
    Ok(path)
}

/// Stratified cross-validation of the configured family on a reviews CSV.
pub fn run_validate(config: ClassifierConfig, reviews: &Path) -> Result<CrossValidationReport> {
    let classifier = ReviewClassifier::new(config)?;
    let reviews = read_reviews(reviews)
        .with_context(|| format!("Failed to read reviews: {}", reviews.display()))?;
    Ok(classifier.evaluate_average_accuracy(&reviews)?)
}

/// Accuracy of a saved model on a labeled reviews CSV, in [0, 1].
pub fn run_evaluate(config: ClassifierConfig, reviews: &Path, model_dir: &Path) -> Result<f64> {
    let mut classifier = ReviewClassifier::new(config)?;
    classifier
        .load_model(model_dir)
        .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
    let reviews = read_reviews(reviews)
        .with_context(|| format!("Failed to read reviews: {}", reviews.display()))?;
    Ok(classifier.evaluate_accuracy(&reviews)?)
}

/// Label every comment of a CSV with a saved model.
pub fn run_classify(
    config: ClassifierConfig,
    comments: &Path,
    model_dir: &Path,
) -> Result<Vec<(Label, String)>> {
    let mut classifier = ReviewClassifier::new(config)?;
    classifier
        .load_model(model_dir)
        .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;
    let comments = read_comments(comments)
        .with_context(|| format!("Failed to read comments: {}", comments.display()))?;
    let labels = classifier.classify(&comments)?;
    Ok(labels.into_iter().zip(comments).collect())
}

/// Write `label<TAB>comment` lines to `output`, or stdout when `None`.
pub fn write_classifications(rows: &[(Label, String)], output: Option<&Path>) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for (label, comment) in rows {
        writeln!(writer, "{}\t{}", label, comment.replace(['\t', '\n'], " "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-fold accuracies followed by the mean, one tab-separated line each.
pub fn write_report(report: &CrossValidationReport) -> Result<()> {
    let mut out = io::stdout().lock();
    for score in &report.fold_scores {
        writeln!(out, "fold {}\t{:.2}", score.fold + 1, score.accuracy)?;
    }
    writeln!(out, "mean\t{:.2}\t+/- {:.2}", report.mean, report.std)?;
    Ok(())
}
