//! medinify-sentiment: binary sentiment classifiers for rated free-text reviews.
//!
//! Reviews are labeled from their star rating, tokenized into presence sets and
//! fed to one of four classifier families (naive Bayes, decision tree, random
//! forest, feed-forward network). The crate also provides stratified k-fold
//! cross-validation and one-file-per-family model persistence.
//!
//! [`classifier::ReviewClassifier`] ties the pieces together; the individual
//! modules can be used on their own.
pub mod classifier;
pub mod config;
pub mod cross_validation;
pub mod data_handling;
pub mod error;
pub mod models;
pub mod persistence;
pub mod preprocessing;
pub mod stats;
pub mod stopwords;
