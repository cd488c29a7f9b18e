use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use moodlens_domain::EmotionLabel;
use serde::Deserialize;
use tracing::info;

pub const FACE_SIDE: usize = 48;

#[derive(Debug, Deserialize)]
struct FerRecord {
    emotion: usize,
    pixels: String,
}

fn check_pixels(pixels: &str) -> Result<()> {
    let mut count = 0;
    for value in pixels.split_whitespace() {
        value
            .parse::<u8>()
            .with_context(|| format!("pixel value {value:?} is not in 0..=255"))?;
        count += 1;
    }
    if count != FACE_SIDE * FACE_SIDE {
        bail!("expected {} pixels, found {count}", FACE_SIDE * FACE_SIDE);
    }
    Ok(())
}

/// Validates every row and counts them per canonical label.
pub fn class_counts(csv_path: &Path) -> Result<BTreeMap<String, usize>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("opening {}", csv_path.display()))?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut rows = 0;
    for (index, record) in reader.deserialize::<FerRecord>().enumerate() {
        let row = index + 1;
        let record = record.with_context(|| format!("row {row}"))?;
        let label = EmotionLabel::from_index(record.emotion).with_context(|| {
            format!("row {row}: emotion class {} is not in 0..=6", record.emotion)
        })?;
        check_pixels(&record.pixels).with_context(|| format!("row {row}"))?;
        *counts.entry(label.to_string()).or_default() += 1;
        rows += 1;
    }
    info!(rows, classes = counts.len(), "validated fer2013 dataset");
    Ok(counts)
}
