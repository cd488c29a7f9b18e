pub mod error;
pub mod padding;
pub mod tokenizer;

pub use error::TokenizerError;
pub use padding::{pad_sequence, Padding};
pub use tokenizer::{TextTokenizer, TokenizerOptions, DEFAULT_FILTERS};
