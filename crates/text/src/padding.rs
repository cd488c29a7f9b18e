use serde::{Deserialize, Serialize};

/// Which end of a sequence padding or truncation applies to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Pre,
    #[default]
    Post,
}

/// Fits `sequence` to exactly `max_len` entries filled with `value`.
pub fn pad_sequence(
    sequence: &[u32],
    max_len: usize,
    padding: Padding,
    truncating: Padding,
    value: u32,
) -> Vec<u32> {
    let kept = if sequence.len() > max_len {
        match truncating {
            Padding::Pre => &sequence[sequence.len() - max_len..],
            Padding::Post => &sequence[..max_len],
        }
    } else {
        sequence
    };
    let fill = max_len - kept.len();
    let mut out = Vec::with_capacity(max_len);
    if padding == Padding::Pre {
        out.extend(std::iter::repeat(value).take(fill));
    }
    out.extend_from_slice(kept);
    if padding == Padding::Post {
        out.extend(std::iter::repeat(value).take(fill));
    }
    out
}
