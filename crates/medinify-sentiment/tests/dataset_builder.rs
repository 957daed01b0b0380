//! Integration tests for rating thresholds and dataset construction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use medinify_sentiment::config::{ClassifierFamily, Thresholds};
use medinify_sentiment::data_handling::{
    read_reviews_from_reader, Dataset, DatasetBuilder, Label, Review,
};
use medinify_sentiment::error::SentimentError;

fn scenario_reviews() -> Vec<Review> {
    vec![
        Review::new("This medication cleared my headaches completely", 5.0),
        Review::new("Wonderful results and barely any side effects", 5.0),
        Review::new("I finally sleep through the night", 5.0),
        Review::new("Best prescription my doctor ever gave me", 5.0),
        Review::new("Energy is back and mood is great", 5.0),
        Review::new("Terrible nausea from the first dose", 1.0),
        Review::new("Gave me a painful rash on both arms", 1.0),
        Review::new("Dizzy all day and could not work", 1.0),
        Review::new("Did nothing except upset my stomach", 1.0),
        Review::new("Worst insomnia I have ever had", 1.0),
    ]
}

// ---------------------------------------------------------------------------
// Threshold labelling
// ---------------------------------------------------------------------------

#[test]
fn random_ratings_follow_thresholds() {
    let builder = DatasetBuilder::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..2000 {
        // mix half-star steps (to hit the boundaries) with arbitrary values
        let rating: f64 = if rng.gen_bool(0.5) {
            rng.gen_range(0..=10) as f64 / 2.0
        } else {
            rng.gen_range(0.0..=5.0)
        };
        let label = builder.label_for(rating);
        if rating <= 2.0 {
            assert_eq!(label, Some(Label::Negative), "rating {}", rating);
        } else if rating >= 4.0 {
            assert_eq!(label, Some(Label::Positive), "rating {}", rating);
        } else {
            assert_eq!(label, None, "rating {}", rating);
        }
    }
}

#[test]
fn boundary_ratings() {
    let reviews = vec![
        Review::new("borderline bad", 2.0),
        Review::new("borderline good", 4.0),
        Review::new("middling", 3.0),
    ];
    let (dataset, summary) = DatasetBuilder::default().build_symbolic(&reviews).unwrap();
    assert_eq!(dataset.labels(), vec![Label::Positive, Label::Negative]);
    assert_eq!(summary.positive, 1);
    assert_eq!(summary.negative, 1);
    assert_eq!(summary.excluded, 1);
}

#[test]
fn custom_thresholds_shift_labels() {
    let builder = DatasetBuilder::new(Thresholds {
        negative: 1.0,
        positive: 5.0,
    })
    .unwrap();
    assert_eq!(builder.label_for(2.0), None);
    assert_eq!(builder.label_for(1.0), Some(Label::Negative));
    assert_eq!(builder.label_for(5.0), Some(Label::Positive));
}

#[test]
fn inverted_thresholds_are_rejected_by_the_builder() {
    for (negative, positive) in [(4.0, 2.0), (3.0, 3.0)] {
        let err = DatasetBuilder::new(Thresholds { negative, positive }).unwrap_err();
        assert!(matches!(err, SentimentError::InvalidConfig(_)));
    }
}

// ---------------------------------------------------------------------------
// Scenario corpus
// ---------------------------------------------------------------------------

#[test]
fn scenario_yields_ten_instances() {
    let (dataset, summary) = DatasetBuilder::default()
        .build_symbolic(&scenario_reviews())
        .unwrap();
    assert_eq!(dataset.len(), 10);
    assert_eq!(summary.positive, 5);
    assert_eq!(summary.negative, 5);
    assert_eq!(summary.excluded, 0);
}

#[test]
fn numeric_build_shares_vocabulary_width() {
    let built = DatasetBuilder::default()
        .build(&scenario_reviews(), ClassifierFamily::NeuralNet)
        .unwrap();
    let width = built.encoder.as_ref().map(|e| e.n_features()).unwrap();
    match &built.dataset {
        Dataset::Numeric(numeric) => {
            assert_eq!(numeric.n_features(), width);
            assert!(numeric.features.iter().all(|&v| v == 0.0 || v == 1.0));
        }
        Dataset::Symbolic(_) => panic!("neural nets train on numeric data"),
    }
}

#[test]
fn stopword_only_corpus_is_empty_for_every_family() {
    let reviews = vec![
        Review::new("it was the", 5.0),
        Review::new("and so on", 5.0),
        Review::new("not for me", 1.0),
    ];
    for family in ClassifierFamily::ALL {
        let err = DatasetBuilder::default().build(&reviews, family).unwrap_err();
        assert!(
            matches!(err, SentimentError::EmptyDataset(_)),
            "{} accepted a zero-width vocabulary",
            family
        );
    }
}

#[test]
fn some_empty_comments_are_kept() {
    let reviews = vec![Review::new("it was the", 5.0), Review::new("awful rash", 1.0)];
    let (dataset, _) = DatasetBuilder::default().build_symbolic(&reviews).unwrap();
    assert_eq!(dataset.len(), 2);
    assert!(dataset.instances[0].tokens.is_empty());
}

// ---------------------------------------------------------------------------
// CSV input
// ---------------------------------------------------------------------------

#[test]
fn csv_with_bad_rating_fails_without_partial_output() {
    let csv = "comment,rating\ngreat,5\nawful,1\nhmm,three\n";
    let err = read_reviews_from_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, SentimentError::InputParse { record: 3, .. }));
}

#[test]
fn csv_ignores_extra_columns() {
    let csv = "url,rating,comment,date\nx,4.5,\"fine, really\",2019\n";
    let reviews = read_reviews_from_reader(csv.as_bytes()).unwrap();
    assert_eq!(reviews, vec![Review::new("fine, really", 4.5)]);
}
