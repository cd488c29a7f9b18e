use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use moodlens_audio::{AudioFeatureExtractor, FeatureConfig};
use moodlens_inference::LabelEncoder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Deserialize)]
struct AudioRecord {
    file_path: PathBuf,
    emotion: String,
}

#[derive(Debug, Serialize)]
pub struct AudioSummary {
    pub rows: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub classes: Vec<String>,
}

pub fn extract_features(
    csv_path: &Path,
    out_path: &Path,
    labels_dir: Option<&Path>,
) -> Result<AudioSummary> {
    let extractor = AudioFeatureExtractor::new(FeatureConfig::default())?;
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("opening {}", csv_path.display()))?;

    let mut rows = 0;
    let mut samples = Vec::new();
    for (index, record) in reader.deserialize::<AudioRecord>().enumerate() {
        let record =
            record.with_context(|| format!("row {} of {}", index + 1, csv_path.display()))?;
        rows += 1;
        match extractor.extract_path(&record.file_path) {
            Ok(features) => samples.push((record.emotion, features)),
            Err(err) => warn!(path = %record.file_path.display(), %err, "skipping audio file"),
        }
        if index % PROGRESS_EVERY == 0 {
            info!(processed = index, "extracting audio features");
        }
    }
    if samples.is_empty() {
        bail!("no usable audio files in {}", csv_path.display());
    }

    let n_mfcc = extractor.config().n_mfcc;
    let mut writer = csv::Writer::from_path(out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;
    let header = std::iter::once("emotion".to_string()).chain((0..n_mfcc).map(|i| format!("f{i}")));
    writer.write_record(header)?;
    for (emotion, features) in &samples {
        let fields = std::iter::once(emotion.clone()).chain(features.iter().map(|v| v.to_string()));
        writer.write_record(fields)?;
    }
    writer.flush()?;

    let encoder = LabelEncoder::fit(samples.iter().map(|(emotion, _)| emotion));
    let labels_dir = match labels_dir {
        Some(dir) => dir.to_path_buf(),
        None => out_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };
    fs::create_dir_all(&labels_dir)
        .with_context(|| format!("creating {}", labels_dir.display()))?;
    encoder
        .save(labels_dir.join("audio_label_encoder.json"))
        .context("writing audio label encoder")?;
    info!(extracted = samples.len(), skipped = rows - samples.len(), "wrote audio features");

    Ok(AudioSummary {
        rows,
        extracted: samples.len(),
        skipped: rows - samples.len(),
        classes: encoder.classes,
    })
}
