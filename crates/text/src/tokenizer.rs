//! Word-index tokenizer interchangeable with the Keras `Tokenizer` JSON
//! document (`Tokenizer.to_json()` / `tokenizer_from_json`).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::padding::{pad_sequence, Padding};
use crate::TokenizerError;

pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Only indices below this bound are emitted; `None` or 0 keeps all.
    pub num_words: Option<usize>,
    pub filters: String,
    pub lower: bool,
    pub split: String,
    pub char_level: bool,
    pub oov_token: Option<String>,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            num_words: None,
            filters: DEFAULT_FILTERS.to_string(),
            lower: true,
            split: " ".to_string(),
            char_level: false,
            oov_token: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextTokenizer {
    options: TokenizerOptions,
    word_index: HashMap<String, u32>,
    word_counts: Vec<(String, u64)>,
    word_docs: Vec<(String, u64)>,
    document_count: u64,
}

/// Keras stores the vocabulary maps as JSON documents embedded in strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Embedded<T> {
    Encoded(String),
    Inline(T),
}

impl<T: for<'de> Deserialize<'de>> Embedded<T> {
    fn decode(self) -> Result<T, TokenizerError> {
        match self {
            Embedded::Encoded(raw) => Ok(serde_json::from_str(&raw)?),
            Embedded::Inline(value) => Ok(value),
        }
    }
}

#[derive(Deserialize)]
struct KerasConfig {
    num_words: Option<usize>,
    #[serde(default = "default_filters")]
    filters: String,
    #[serde(default = "default_true")]
    lower: bool,
    #[serde(default = "default_split")]
    split: String,
    #[serde(default)]
    char_level: bool,
    oov_token: Option<String>,
    #[serde(default)]
    document_count: u64,
    word_counts: Option<Embedded<HashMap<String, u64>>>,
    word_docs: Option<Embedded<HashMap<String, u64>>>,
    word_index: Embedded<HashMap<String, u32>>,
}

#[derive(Deserialize)]
struct KerasDocument {
    class_name: Option<String>,
    config: KerasConfig,
}

fn default_filters() -> String {
    DEFAULT_FILTERS.to_string()
}

fn default_true() -> bool {
    true
}

fn default_split() -> String {
    " ".to_string()
}

fn sorted_pairs(map: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut pairs: Vec<_> = map.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

impl TextTokenizer {
    pub fn from_json_str(source: &str) -> Result<Self, TokenizerError> {
        let document: KerasDocument = serde_json::from_str(source)?;
        if let Some(name) = &document.class_name {
            if name != "Tokenizer" {
                return Err(TokenizerError::Invalid(format!(
                    "expected a Tokenizer document, found {name}"
                )));
            }
        }
        let config = document.config;
        if config.split.is_empty() && !config.char_level {
            return Err(TokenizerError::Invalid("split string is empty".into()));
        }
        let word_index = config.word_index.decode()?;
        let word_counts = match config.word_counts {
            Some(embedded) => sorted_pairs(embedded.decode()?),
            None => Vec::new(),
        };
        let word_docs = match config.word_docs {
            Some(embedded) => sorted_pairs(embedded.decode()?),
            None => Vec::new(),
        };
        Ok(Self {
            options: TokenizerOptions {
                num_words: config.num_words,
                filters: config.filters,
                lower: config.lower,
                split: config.split,
                char_level: config.char_level,
                oov_token: config.oov_token,
            },
            word_index,
            word_counts,
            word_docs,
            document_count: config.document_count,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        let tokenizer = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!(path = ?path, vocabulary = tokenizer.word_index.len(), "loaded tokenizer");
        Ok(tokenizer)
    }

    /// Builds the vocabulary: words ranked by frequency (ties keep first
    /// appearance), indices from 1, the OOV token first when configured.
    pub fn fit<I, S>(options: TokenizerOptions, texts: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if options.split.is_empty() && !options.char_level {
            return Err(TokenizerError::Invalid("split string is empty".into()));
        }
        let mut tokenizer = Self {
            options,
            word_index: HashMap::new(),
            word_counts: Vec::new(),
            word_docs: Vec::new(),
            document_count: 0,
        };

        let mut counts: Vec<(String, u64)> = Vec::new();
        let mut count_slot: HashMap<String, usize> = HashMap::new();
        let mut docs: Vec<(String, u64)> = Vec::new();
        let mut doc_slot: HashMap<String, usize> = HashMap::new();
        for text in texts {
            tokenizer.document_count += 1;
            let words = tokenizer.words(text.as_ref());
            for word in &words {
                let slot = *count_slot.entry(word.clone()).or_insert_with(|| {
                    counts.push((word.clone(), 0));
                    counts.len() - 1
                });
                counts[slot].1 += 1;
            }
            let mut seen = HashSet::new();
            for word in words {
                if seen.insert(word.clone()) {
                    let slot = *doc_slot.entry(word.clone()).or_insert_with(|| {
                        docs.push((word, 0));
                        docs.len() - 1
                    });
                    docs[slot].1 += 1;
                }
            }
        }

        let mut ranked = counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let vocabulary = tokenizer
            .options
            .oov_token
            .iter()
            .cloned()
            .chain(ranked.into_iter().map(|(word, _)| word));
        for (index, word) in vocabulary.enumerate() {
            tokenizer.word_index.insert(word, index as u32 + 1);
        }
        tokenizer.word_counts = counts;
        tokenizer.word_docs = docs;
        debug!(
            documents = tokenizer.document_count,
            vocabulary = tokenizer.word_index.len(),
            "fitted tokenizer"
        );
        Ok(tokenizer)
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    pub fn vocabulary_len(&self) -> usize {
        self.word_index.len()
    }

    pub fn index_of(&self, word: &str) -> Option<u32> {
        self.word_index.get(word).copied()
    }

    pub fn oov_index(&self) -> Option<u32> {
        self.options
            .oov_token
            .as_deref()
            .and_then(|token| self.index_of(token))
    }

    pub fn words(&self, text: &str) -> Vec<String> {
        let text = if self.options.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        if self.options.char_level {
            return text.chars().map(String::from).collect();
        }
        let split = self.options.split.as_str();
        let translated: String = text
            .chars()
            .map(|c| {
                if self.options.filters.contains(c) {
                    split.to_string()
                } else {
                    c.to_string()
                }
            })
            .collect();
        translated
            .split(split)
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn text_to_sequence(&self, text: &str) -> Vec<u32> {
        let limit = self.options.num_words.filter(|n| *n > 0);
        let oov = self.oov_index();
        self.words(text)
            .iter()
            .filter_map(|word| match self.index_of(word) {
                Some(index) if limit.map_or(true, |n| (index as usize) < n) => Some(index),
                Some(_) => oov,
                None if self.options.oov_token.is_some() => oov,
                None => None,
            })
            .collect()
    }

    /// Token ids padded and truncated at the end to exactly `max_len`.
    pub fn encode(&self, text: &str, max_len: usize) -> Vec<u32> {
        pad_sequence(
            &self.text_to_sequence(text),
            max_len,
            Padding::Post,
            Padding::Post,
            0,
        )
    }

    pub fn to_json_string(&self) -> Result<String, TokenizerError> {
        let counts: Map<String, Value> = self
            .word_counts
            .iter()
            .map(|(w, c)| (w.clone(), json!(c)))
            .collect();
        let docs: Map<String, Value> = self
            .word_docs
            .iter()
            .map(|(w, c)| (w.clone(), json!(c)))
            .collect();
        let index: Map<String, Value> = self
            .word_index
            .iter()
            .map(|(w, i)| (w.clone(), json!(i)))
            .collect();
        let index_word: Map<String, Value> = self
            .word_index
            .iter()
            .map(|(w, i)| (i.to_string(), json!(w)))
            .collect();
        let index_docs: Map<String, Value> = self
            .word_docs
            .iter()
            .filter_map(|(w, c)| self.index_of(w).map(|i| (i.to_string(), json!(c))))
            .collect();

        let document = json!({
            "class_name": "Tokenizer",
            "config": {
                "num_words": self.options.num_words,
                "filters": self.options.filters,
                "lower": self.options.lower,
                "split": self.options.split,
                "char_level": self.options.char_level,
                "oov_token": self.options.oov_token,
                "document_count": self.document_count,
                "word_counts": serde_json::to_string(&counts)?,
                "word_docs": serde_json::to_string(&docs)?,
                "index_docs": serde_json::to_string(&index_docs)?,
                "index_word": serde_json::to_string(&index_word)?,
                "word_index": serde_json::to_string(&index)?,
            }
        });
        Ok(serde_json::to_string(&document)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TokenizerError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
