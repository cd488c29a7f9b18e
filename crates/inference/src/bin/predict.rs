use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use moodlens_inference::{get_motivation_message, EmotionEngine, EngineConfig, PredictionOutcome};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Predict the emotion in a face image, text or audio clip",
    long_about = None
)]
struct Cli {
    /// Image or audio path, or the text itself
    input: String,
    /// One of face, text or audio
    #[arg(short, long)]
    modality: String,
    /// YAML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the trained artifacts
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// Exit with an error instead of printing the neutral fallback
    #[arg(long)]
    strict: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    modality: &'a str,
    emotion: String,
    confidence: f32,
    motivation: String,
    status: &'static str,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    let engine = EmotionEngine::from_config(config).context("building emotion engine")?;

    let outcome = engine.try_predict(&cli.input, &cli.modality);
    if let PredictionOutcome::Failed { modality, reason } = &outcome {
        if cli.strict {
            bail!("{modality} prediction failed: {reason}");
        }
        warn!(%modality, %reason, "prediction failed, returning neutral fallback");
    }
    let status = outcome.status();
    let prediction = outcome.into_prediction();
    let report = Report {
        modality: &cli.modality,
        emotion: prediction.emotion.to_string(),
        confidence: prediction.confidence,
        motivation: get_motivation_message(prediction.emotion.as_str()),
        status,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
