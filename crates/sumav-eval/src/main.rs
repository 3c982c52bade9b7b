//! CLI for computing precision/recall/F-measure against a ground-truth
//! clustering, reading both mappings as `{element: cluster_id}` JSON files.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sumav-eval", version, about = "Evaluate predicted AV-verdict clusters against ground truth")]
struct Args {
    /// JSON file mapping element -> ground-truth cluster id
    #[arg(long)]
    ground_truth: PathBuf,

    /// JSON file mapping element -> predicted cluster id
    #[arg(long)]
    predicted: PathBuf,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let ground_truth = load_mapping(&args.ground_truth).unwrap_or_else(|e| {
        error!("failed to read {}: {e}", args.ground_truth.display());
        std::process::exit(1);
    });
    let predicted = load_mapping(&args.predicted).unwrap_or_else(|e| {
        error!("failed to read {}: {e}", args.predicted.display());
        std::process::exit(1);
    });

    let metrics = sumav_eval::evaluate(&ground_truth, &predicted);
    info!(
        precision = metrics.precision,
        recall = metrics.recall,
        f_measure = metrics.f_measure,
        skipped = metrics.skipped,
        "evaluation complete"
    );
    println!(
        "precision={:.2}% recall={:.2}% f_measure={:.2}% skipped={}",
        metrics.precision, metrics.recall, metrics.f_measure, metrics.skipped
    );
}

fn load_mapping(path: &PathBuf) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
