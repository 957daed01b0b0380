//! Review records, labeled datasets and the dataset builder.
//!
//! Reviews are turned into token-presence sets and labeled from their rating
//! with fixed thresholds. Symbolic families consume the presence sets directly;
//! numeric families get them encoded into dense vectors by the
//! [`FeatureEncoder`](crate::preprocessing::FeatureEncoder).
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use ndarray::{Array2, Axis};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierFamily, Representation, Thresholds};
use crate::error::{Result, SentimentError};
use crate::preprocessing::FeatureEncoder;
use crate::stopwords::is_stopword;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// A raw review with its star rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub comment: String,
    pub rating: f64,
}

/// An unparsed review row, deserialized by header name. Either field may be
/// missing or empty; other columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewRecord {
    pub comment: Option<String>,
    pub rating: Option<String>,
}

impl Review {
    pub fn new(comment: impl Into<String>, rating: f64) -> Self {
        Self {
            comment: comment.into(),
            rating,
        }
    }

    /// Validate a raw record. `record` is the 1-based row number used in errors.
    pub fn from_record(raw: &ReviewRecord, record: usize) -> Result<Self> {
        let comment = raw.comment.as_ref().ok_or_else(|| SentimentError::InputParse {
            record,
            message: "missing field `comment`".to_string(),
        })?;
        let rating = raw.rating.as_ref().ok_or_else(|| SentimentError::InputParse {
            record,
            message: "missing field `rating`".to_string(),
        })?;
        let rating = parse_rating(rating, record)?;
        Ok(Review::new(comment.clone(), rating))
    }
}

fn parse_rating(raw: &str, record: usize) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SentimentError::InputParse {
            record,
            message: format!("rating {:?} is not a number", raw),
        }),
    }
}

/// Read reviews from a CSV file with `comment` and `rating` header columns.
pub fn read_reviews<P: AsRef<Path>>(path: P) -> Result<Vec<Review>> {
    let file = File::open(&path)?;
    log::debug!("Reading reviews from {:?}", path.as_ref());
    read_reviews_from_reader(file)
}

fn require_column(headers: &csv::StringRecord, name: &str) -> Result<()> {
    if headers.iter().any(|h| h == name) {
        Ok(())
    } else {
        Err(SentimentError::InputParse {
            record: 0,
            message: format!("missing column `{}`", name),
        })
    }
}

/// CSV reader with trimmed, lowercased headers so rows deserialize by name.
fn csv_reader<R: Read>(reader: R) -> Result<(csv::Reader<R>, csv::StringRecord)> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: csv::StringRecord = rdr
        .headers()
        .map_err(|e| SentimentError::InputParse {
            record: 0,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    rdr.set_headers(headers.clone());
    Ok((rdr, headers))
}

/// Read reviews from any CSV source. Fails on the first malformed row.
pub fn read_reviews_from_reader<R: Read>(reader: R) -> Result<Vec<Review>> {
    let (mut rdr, headers) = csv_reader(reader)?;
    require_column(&headers, "comment")?;
    require_column(&headers, "rating")?;

    let mut reviews = Vec::new();
    for (i, result) in rdr.deserialize::<ReviewRecord>().enumerate() {
        let record_no = i + 1;
        let raw = result.map_err(|e| SentimentError::InputParse {
            record: record_no,
            message: e.to_string(),
        })?;
        reviews.push(Review::from_record(&raw, record_no)?);
    }
    Ok(reviews)
}

/// Read only the `comment` column, for unlabeled input.
pub fn read_comments<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(&path)?;
    read_comments_from_reader(file)
}

pub fn read_comments_from_reader<R: Read>(reader: R) -> Result<Vec<String>> {
    let (mut rdr, headers) = csv_reader(reader)?;
    require_column(&headers, "comment")?;

    let mut comments = Vec::new();
    for (i, result) in rdr.deserialize::<ReviewRecord>().enumerate() {
        let record = result.map_err(|e| SentimentError::InputParse {
            record: i + 1,
            message: e.to_string(),
        })?;
        // an empty field deserializes to `None`; unlabeled comments may be blank
        comments.push(record.comment.unwrap_or_default());
    }
    Ok(comments)
}

/// Binary sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    /// Numeric label encoding: Negative -> 0, Positive -> 1.
    pub fn encode(&self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }

    pub fn decode(value: u8) -> Self {
        if value == 0 {
            Label::Negative
        } else {
            Label::Positive
        }
    }

    pub fn from_probability(p_positive: f32) -> Self {
        if p_positive >= 0.5 {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Label::Negative => write!(f, "neg"),
            Label::Positive => write!(f, "pos"),
        }
    }
}

/// Normalized tokens of one comment, presence only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPresenceSet(BTreeSet<String>);

impl TokenPresenceSet {
    /// Lowercase, extract `\w+` words and drop stopwords.
    pub fn from_comment(comment: &str) -> Self {
        let lowered = comment.to_lowercase();
        WORD.find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !is_stopword(token))
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for TokenPresenceSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        TokenPresenceSet(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for TokenPresenceSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        TokenPresenceSet(iter.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledInstance {
    pub tokens: TokenPresenceSet,
    pub label: Label,
}

/// Token-presence instances for the symbolic families.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolicDataset {
    pub instances: Vec<LabeledInstance>,
}

impl SymbolicDataset {
    pub fn new(instances: Vec<LabeledInstance>) -> Self {
        Self { instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.instances.iter().map(|i| i.label).collect()
    }

    pub fn subset(&self, indices: &[usize]) -> SymbolicDataset {
        SymbolicDataset {
            instances: indices.iter().map(|&i| self.instances[i].clone()).collect(),
        }
    }
}

/// Dense presence vectors (one row per instance) and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericDataset {
    pub features: Array2<f32>,
    pub labels: Vec<Label>,
}

impl NumericDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Labels encoded as 0/1 targets.
    pub fn targets(&self) -> Vec<u8> {
        self.labels.iter().map(Label::encode).collect()
    }

    pub fn subset(&self, indices: &[usize]) -> NumericDataset {
        NumericDataset {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// A dataset of a single representation kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Symbolic(SymbolicDataset),
    Numeric(NumericDataset),
}

impl Dataset {
    pub fn representation(&self) -> Representation {
        match self {
            Dataset::Symbolic(_) => Representation::Symbolic,
            Dataset::Numeric(_) => Representation::Numeric,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Symbolic(d) => d.len(),
            Dataset::Numeric(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn labels(&self) -> Vec<Label> {
        match self {
            Dataset::Symbolic(d) => d.labels(),
            Dataset::Numeric(d) => d.labels.clone(),
        }
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        match self {
            Dataset::Symbolic(d) => Dataset::Symbolic(d.subset(indices)),
            Dataset::Numeric(d) => Dataset::Numeric(d.subset(indices)),
        }
    }
}

/// Corpus-level instance counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub positive: usize,
    pub negative: usize,
    /// Reviews whose rating fell strictly between the thresholds.
    pub excluded: usize,
}

impl DatasetSummary {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

/// Output of [`DatasetBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltDataset {
    pub dataset: Dataset,
    /// Fitted encoder for numeric families, `None` for symbolic ones.
    pub encoder: Option<FeatureEncoder>,
    pub summary: DatasetSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetBuilder {
    thresholds: Thresholds,
}

impl DatasetBuilder {
    /// Fails with `InvalidConfig` unless `thresholds.negative < thresholds.positive`.
    pub fn new(thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Label for a rating, or `None` when it falls strictly between the thresholds.
    pub fn label_for(&self, rating: f64) -> Option<Label> {
        if rating <= self.thresholds.negative {
            Some(Label::Negative)
        } else if rating >= self.thresholds.positive {
            Some(Label::Positive)
        } else {
            None
        }
    }

    /// Build the token-presence dataset: positive instances first, then negative,
    /// each in input order.
    pub fn build_symbolic(&self, reviews: &[Review]) -> Result<(SymbolicDataset, DatasetSummary)> {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        let mut excluded = 0;

        for review in reviews {
            match self.label_for(review.rating) {
                Some(label) => {
                    let instance = LabeledInstance {
                        tokens: TokenPresenceSet::from_comment(&review.comment),
                        label,
                    };
                    match label {
                        Label::Positive => positive.push(instance),
                        Label::Negative => negative.push(instance),
                    }
                }
                None => excluded += 1,
            }
        }

        let summary = DatasetSummary {
            positive: positive.len(),
            negative: negative.len(),
            excluded,
        };
        log::info!("Total Negative Instances: {}", summary.negative);
        log::info!("Total Positive Instances: {}", summary.positive);
        if excluded > 0 {
            log::debug!("Excluded {} reviews rated between the thresholds", excluded);
        }

        if summary.total() == 0 {
            return Err(SentimentError::EmptyDataset(format!(
                "no review rated <= {} or >= {}",
                self.thresholds.negative, self.thresholds.positive
            )));
        }

        if positive.iter().chain(&negative).all(|i| i.tokens.is_empty()) {
            return Err(SentimentError::EmptyDataset(format!(
                "vocabulary is empty after stopword removal ({} instances)",
                summary.total()
            )));
        }

        positive.extend(negative);
        Ok((SymbolicDataset::new(positive), summary))
    }

    /// Build the dataset in the representation `family` trains on.
    pub fn build(&self, reviews: &[Review], family: ClassifierFamily) -> Result<BuiltDataset> {
        let (symbolic, summary) = self.build_symbolic(reviews)?;
        match family.representation() {
            Representation::Symbolic => Ok(BuiltDataset {
                dataset: Dataset::Symbolic(symbolic),
                encoder: None,
                summary,
            }),
            Representation::Numeric => {
                let encoder = FeatureEncoder::fit(&symbolic)?;
                let numeric = encoder.transform(&symbolic);
                Ok(BuiltDataset {
                    dataset: Dataset::Numeric(numeric),
                    encoder: Some(encoder),
                    summary,
                })
            }
        }
    }

    /// Validate raw records first, then build. No partial dataset on failure.
    pub fn build_from_records(
        &self,
        records: &[ReviewRecord],
        family: ClassifierFamily,
    ) -> Result<BuiltDataset> {
        let reviews = records
            .iter()
            .enumerate()
            .map(|(i, raw)| Review::from_record(raw, i + 1))
            .collect::<Result<Vec<_>>>()?;
        self.build(&reviews, family)
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
        }
    }
}
