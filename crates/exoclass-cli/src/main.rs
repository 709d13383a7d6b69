use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use exoclass_classifier::{ArtifactKind, PredictorConfig};
use exoclass_cli::classify::predict::{
    inspect, load_predictor, predict_file, resolve_config, sample_file, ConfigOverrides,
    DEFAULT_SAMPLE_HEAD,
};
use exoclass_cli::classify::util::{validate_tsv_or_csv_file, write_json_output};

/// Per-artifact file name flags: (argument id, long flag, artifact).
const FILE_FLAGS: [(&str, &str, ArtifactKind); 5] = [
    ("classifier_file", "classifier-file", ArtifactKind::Classifier),
    ("imputer_file", "imputer-file", ArtifactKind::Imputer),
    ("scaler_file", "scaler-file", ArtifactKind::Scaler),
    ("label_encoder_file", "label-encoder-file", ArtifactKind::LabelEncoder),
    ("feature_columns_file", "feature-columns-file", ArtifactKind::FeatureColumns),
];

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("EXOCLASS_LOG", "error,exoclass=info"))
        .init();

    let matches = Command::new("exoclass")
        .version(clap::crate_version!())
        .about("Classify transit-signal candidates as Confirmed, Candidate or False Positive")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            artifact_args(
                Command::new("predict")
                    .about("Classify every row of a candidate table")
                    .arg(
                        Arg::new("input")
                            .help("Path to the candidate table (*.csv or *.tsv)")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf))
                            .value_hint(ValueHint::FilePath),
                    ),
            )
            .arg(output_arg()),
        )
        .subcommand(
            artifact_args(
                Command::new("sample")
                    .about("Classify one random row from the head of a catalog table")
                    .arg(
                        Arg::new("input")
                            .help("Path to the catalog table (*.csv or *.tsv)")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf))
                            .value_hint(ValueHint::FilePath),
                    )
                    .arg(
                        Arg::new("head")
                            .long("head")
                            .help("Draw from the first N rows of the table.")
                            .default_value("100")
                            .value_parser(clap::value_parser!(usize)),
                    )
                    .arg(
                        Arg::new("seed")
                            .long("seed")
                            .help("Seed for the row choice. Random when omitted.")
                            .value_parser(clap::value_parser!(u64)),
                    ),
            )
            .arg(output_arg()),
        )
        .subcommand(artifact_args(
            Command::new("inspect").about("Load the artifact bundle and print a summary"),
        ))
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("sample", sub_m)) => handle_sample(sub_m),
        Some(("inspect", sub_m)) => handle_inspect(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn artifact_args(cmd: Command) -> Command {
    let cmd = cmd
        .arg(
            Arg::new("artifacts")
                .short('a')
                .long("artifacts")
                .help(
                    "Directory holding the model artifacts. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to predictor JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        );
    FILE_FLAGS.iter().fold(cmd, |cmd, (id, long, kind)| {
        cmd.arg(
            Arg::new(*id)
                .long(*long)
                .help(format!(
                    "File name of the {} artifact inside the artifact directory. \
                     Overrides the name in the configuration file.",
                    kind
                ))
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .value_hint(ValueHint::Other),
        )
    })
}

fn output_arg() -> Arg {
    Arg::new("output_file")
        .short('o')
        .long("output")
        .help("Path to write the JSON predictions. Defaults to stdout.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn config_from_matches(matches: &ArgMatches) -> Result<PredictorConfig> {
    let overrides = ConfigOverrides {
        artifacts_dir: matches.get_one::<PathBuf>("artifacts").cloned(),
        files: FILE_FLAGS
            .iter()
            .filter_map(|(id, _, kind)| {
                matches
                    .get_one::<String>(id)
                    .map(|name| (*kind, name.clone()))
            })
            .collect(),
    };

    let config_path = matches.get_one::<PathBuf>("config");
    if let Some(path) = config_path {
        log::info!("[exoclass] Using config: {:?}", path);
    }
    let config = resolve_config(config_path, &overrides)?;

    if config_path.is_none() {
        let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
        eprintln!("[exoclass] No config provided; using:\n{}", default_json);
    }
    Ok(config)
}

fn loaded_predictor_or_exit(matches: &ArgMatches) -> Result<exoclass_classifier::Predictor> {
    let config = config_from_matches(matches)?;
    match load_predictor(&config) {
        Ok(predictor) => Ok(predictor),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1)
        }
    }
}

fn input_path(matches: &ArgMatches) -> Result<&PathBuf> {
    let input = matches
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow::anyhow!("Missing input file"))?;
    validate_tsv_or_csv_file(input)?;
    Ok(input)
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let input = input_path(matches)?;
    let predictor = loaded_predictor_or_exit(matches)?;

    let rows = predict_file(&predictor, input)?;
    write_json_output(&rows, matches.get_one::<PathBuf>("output_file"))?;
    log::info!("[exoclass] Completed {} predictions.", rows.len());
    Ok(())
}

fn handle_sample(matches: &ArgMatches) -> Result<()> {
    let input = input_path(matches)?;
    let head = matches
        .get_one::<usize>("head")
        .copied()
        .unwrap_or(DEFAULT_SAMPLE_HEAD);
    let seed = matches.get_one::<u64>("seed").copied();
    let predictor = loaded_predictor_or_exit(matches)?;

    let row = sample_file(&predictor, input, head, seed)?;
    write_json_output(&row, matches.get_one::<PathBuf>("output_file"))
}

fn handle_inspect(matches: &ArgMatches) -> Result<()> {
    let predictor = loaded_predictor_or_exit(matches)?;
    write_json_output(&inspect(&predictor)?, None)
}
