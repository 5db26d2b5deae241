//! Reads one JSON feature object from stdin and prints the predicted yield.
//!
//! Success: `{"predicted_yield": <number>}` on stdout, exit 0.
//! Failure: `{"error": "<message>"}` on stderr, exit 1.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::{json, Map, Value};

use crop_service_rs::logging::init_tracing;
use crop_service_rs::model::YieldPredictor;

#[derive(Debug, Parser)]
#[command(name = "yield-predict", version, about = "Predict crop yield from features on stdin")]
struct Args {
    /// Trained model file
    #[arg(long, env = "YIELD_MODEL_PATH", default_value = "./model/yield_model.json")]
    model: PathBuf,

    /// Feature names, one per line, in training order
    #[arg(long, env = "YIELD_FEATURES_PATH", default_value = "./model/feature_list.txt")]
    features: PathBuf,

    /// Fitted scaler (JSON with `mean` and `scale`)
    #[arg(long, env = "YIELD_SCALER_PATH")]
    scaler: Option<PathBuf>,

    /// Log to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_features(input: &str) -> anyhow::Result<Map<String, Value>> {
    if input.trim().is_empty() {
        bail!("No input data received from stdin.");
    }
    match serde_json::from_str::<Value>(input).context("invalid JSON input")? {
        Value::Object(features) => Ok(features),
        _ => bail!("Input must be a JSON object of feature values."),
    }
}

fn run(args: &Args) -> anyhow::Result<f64> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    let features = parse_features(&input)?;

    let predictor = YieldPredictor::load(&args.model, &args.features, args.scaler.as_deref())?;
    Ok(predictor.predict_single(&features)?)
}

/// Returns a warning when the subscriber could not be installed.
fn enable_logging() -> Option<String> {
    init_tracing()
        .err()
        .map(|err| format!("logging disabled: {err:#}"))
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    if args.verbose {
        if let Some(warning) = enable_logging() {
            eprintln!("{warning}");
        }
    }

    match run(&args) {
        Ok(predicted_yield) => {
            println!("{}", json!({ "predicted_yield": predicted_yield }));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", json!({ "error": format!("{err:#}") }));
            ExitCode::FAILURE
        }
    }
}
