use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Text,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Face, Modality::Text, Modality::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Text => "text",
            Modality::Audio => "audio",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" => Ok(Modality::Face),
            "text" => Ok(Modality::Text),
            "audio" => Ok(Modality::Audio),
            other => Err(DomainError::UnknownModality(other.to_string())),
        }
    }
}
