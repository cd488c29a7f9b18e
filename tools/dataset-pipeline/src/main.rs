use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod audio;
mod fer;
mod text;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Prepare emotion datasets and artifacts for the classifiers"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the text tokenizer and label encoder from a `text,label` CSV
    FitText {
        #[arg(long, default_value = "datasets/text.csv")]
        csv: PathBuf,
        /// Directory receiving text_tokenizer.json and text_label_encoder.json
        #[arg(long, default_value = "static/models")]
        out: PathBuf,
        #[arg(long, default_value_t = 10_000)]
        num_words: usize,
    },
    /// Extract pooled MFCC features from a `file_path,emotion` CSV
    AudioFeatures {
        #[arg(long, default_value = "datasets/emotion.csv")]
        csv: PathBuf,
        #[arg(long, default_value = "features.csv")]
        out: PathBuf,
        /// Directory receiving audio_label_encoder.json; defaults to the
        /// directory of `out`
        #[arg(long)]
        labels: Option<PathBuf>,
    },
    /// Validate a FER2013 `pixels,emotion` CSV and count rows per class
    Fer2013 {
        #[arg(long, default_value = "datasets/fer2013.csv")]
        csv: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::FitText {
            csv,
            out,
            num_words,
        } => {
            let summary = text::fit_text(&csv, &out, num_words)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::AudioFeatures { csv, out, labels } => {
            let summary = audio::extract_features(&csv, &out, labels.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Fer2013 { csv } => {
            let counts = fer::class_counts(&csv)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}
