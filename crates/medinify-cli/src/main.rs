use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

use medinify_cli::commands::{
    run_classify, run_evaluate, run_train, run_validate, write_classifications, write_report,
};
use medinify_cli::config::{resolve_config, ConfigOverrides};
use medinify_sentiment::config::{ClassifierConfig, ClassifierFamily};

fn reviews_arg() -> Arg {
    Arg::new("reviews")
        .short('r')
        .long("reviews")
        .help("Path to the reviews CSV (columns `comment` and `rating`)")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn classifier_arg() -> Arg {
    Arg::new("classifier")
        .short('c')
        .long("classifier")
        .help("Classifier family. Overrides the model type from the JSON config.")
        .value_parser(["nb", "dt", "rf", "nn"])
        .value_hint(ValueHint::Other)
}

fn model_dir_arg() -> Arg {
    Arg::new("model_dir")
        .short('m')
        .long("model")
        .help("Directory holding the trained_<family>_model.bin artifact")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("MEDINIFY_LOG", "error,medinify=info"))
        .init();

    let matches = Command::new("medinify")
        .version(clap::crate_version!())
        .about("Drug review sentiment analysis tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Path to a classifier JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("pos_threshold")
                .long("pos-threshold")
                .global(true)
                .help("Ratings at or above this value are positive [default: 4.0]")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("neg_threshold")
                .long("neg-threshold")
                .global(true)
                .help("Ratings at or below this value are negative [default: 2.0]")
                .value_parser(clap::value_parser!(f64)),
        )
        .subcommand(
            Command::new("train")
                .about("Train a model and save it to a directory")
                .arg(reviews_arg())
                .arg(classifier_arg())
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output")
                        .help("Directory the trained model is written to")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Estimate accuracy with stratified k-fold cross-validation")
                .arg(reviews_arg())
                .arg(classifier_arg())
                .arg(
                    Arg::new("folds")
                        .short('f')
                        .long("folds")
                        .help("Number of folds [default: 10]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for fold shuffling. Unseeded runs differ from run to run.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("per_fold_vocabulary")
                        .long("per-fold-vocabulary")
                        .help("Refit the vocabulary on every training partition (numeric families)")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("evaluate")
                .about("Report the accuracy of a saved model on labeled reviews")
                .arg(reviews_arg())
                .arg(classifier_arg())
                .arg(model_dir_arg()),
        )
        .subcommand(
            Command::new("classify")
                .about("Label every comment of a CSV with a saved model")
                .arg(
                    Arg::new("reviews")
                        .short('r')
                        .long("reviews")
                        .help("Path to a CSV with a `comment` column")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(classifier_arg())
                .arg(model_dir_arg())
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write `label<TAB>comment` lines. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => {
            let config = config_from(sub_m)?;
            let reviews: &PathBuf = sub_m.get_one("reviews").unwrap();
            let output_dir: &PathBuf = sub_m.get_one("output_dir").unwrap();
            let path = run_train(config, reviews, output_dir)?;
            eprintln!("[Medinify] Model saved to {:?}", path);
            Ok(())
        }
        Some(("validate", sub_m)) => {
            let config = config_from(sub_m)?;
            let reviews: &PathBuf = sub_m.get_one("reviews").unwrap();
            let report = run_validate(config, reviews)?;
            write_report(&report)
        }
        Some(("evaluate", sub_m)) => {
            let config = config_from(sub_m)?;
            let reviews: &PathBuf = sub_m.get_one("reviews").unwrap();
            let model_dir: &PathBuf = sub_m.get_one("model_dir").unwrap();
            let accuracy = run_evaluate(config, reviews, model_dir)?;
            println!("accuracy\t{:.2}", accuracy * 100.0);
            Ok(())
        }
        Some(("classify", sub_m)) => {
            let config = config_from(sub_m)?;
            let reviews: &PathBuf = sub_m.get_one("reviews").unwrap();
            let model_dir: &PathBuf = sub_m.get_one("model_dir").unwrap();
            let output: Option<&PathBuf> = sub_m.get_one("output_file");
            let rows = run_classify(config, reviews, model_dir)?;
            write_classifications(&rows, output.map(|p| p.as_path()))
        }
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn config_from(matches: &ArgMatches) -> Result<ClassifierConfig> {
    let family = matches
        .get_one::<String>("classifier")
        .map(|name| ClassifierFamily::from_str(name))
        .transpose()?;
    let overrides = ConfigOverrides {
        family,
        pos_threshold: matches.get_one::<f64>("pos_threshold").copied(),
        neg_threshold: matches.get_one::<f64>("neg_threshold").copied(),
        folds: matches.try_get_one::<usize>("folds").ok().flatten().copied(),
        seed: matches.try_get_one::<u64>("seed").ok().flatten().copied(),
        per_fold_vocabulary: matches
            .try_get_one::<bool>("per_fold_vocabulary")
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false),
    };
    let config_path: Option<&PathBuf> = matches.get_one("config");
    let config = resolve_config(config_path.map(|p| p.as_path()), &overrides)?;
    log::info!(
        "[Medinify] {} classifier, thresholds <= {} / >= {}",
        config.family(),
        config.thresholds.negative,
        config.thresholds.positive
    );
    Ok(config)
}
