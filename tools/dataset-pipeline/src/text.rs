use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use moodlens_inference::LabelEncoder;
use moodlens_text::{TextTokenizer, TokenizerOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const OOV_TOKEN: &str = "<OOV>";

#[derive(Debug, Deserialize)]
struct TextRecord {
    text: String,
    label: String,
}

#[derive(Debug, Serialize)]
pub struct TextSummary {
    pub rows: usize,
    pub vocabulary: usize,
    pub classes: Vec<String>,
}

pub fn fit_text(csv_path: &Path, out_dir: &Path, num_words: usize) -> Result<TextSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("opening {}", csv_path.display()))?;
    let mut texts = Vec::new();
    let mut labels = Vec::new();
    for (index, record) in reader.deserialize::<TextRecord>().enumerate() {
        let record =
            record.with_context(|| format!("row {} of {}", index + 1, csv_path.display()))?;
        texts.push(record.text);
        labels.push(record.label);
    }
    if texts.is_empty() {
        bail!("{} has no rows", csv_path.display());
    }
    info!(rows = texts.len(), "loaded text dataset");

    let options = TokenizerOptions {
        num_words: Some(num_words),
        oov_token: Some(OOV_TOKEN.to_string()),
        ..Default::default()
    };
    let tokenizer = TextTokenizer::fit(options, &texts)?;
    let encoder = LabelEncoder::fit(&labels);

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    tokenizer.save(out_dir.join("text_tokenizer.json"))?;
    encoder
        .save(out_dir.join("text_label_encoder.json"))
        .context("writing text label encoder")?;
    info!(
        out = %out_dir.display(),
        vocabulary = tokenizer.vocabulary_len(),
        "wrote text artifacts"
    );

    Ok(TextSummary {
        rows: texts.len(),
        vocabulary: tokenizer.vocabulary_len(),
        classes: encoder.classes,
    })
}
