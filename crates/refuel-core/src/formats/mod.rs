//! # Shuffle History Formats
//!
//! Two on-disk renditions of a `ShuffleSequence`:
//! - `legacy`: line-oriented text, `<caseTitle>-SHUFFLES.txt`
//! - `yaml`: structured cascade / misloadSwap / extraRotations actions
//!
//! Both readers validate cycle numbering before returning. The file helpers
//! here are the only file I/O in the crate.

pub mod legacy;
pub mod yaml;

pub use legacy::{legacy_file_name, parse_legacy, write_legacy};
pub use yaml::{parse_yaml, write_yaml};

use crate::{RefuelError, ShuffleSequence};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Which codec a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleFormat {
    Legacy,
    Yaml,
}

impl ShuffleFormat {
    /// `.yaml`/`.yml` is YAML; anything else is legacy text.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Legacy,
        }
    }

    /// Parse text in this format.
    pub fn parse(self, text: &str) -> Result<ShuffleSequence, RefuelError> {
        match self {
            Self::Legacy => parse_legacy(text),
            Self::Yaml => parse_yaml(text),
        }
    }

    /// Render a sequence in this format.
    pub fn render(self, sequence: &ShuffleSequence) -> Result<String, RefuelError> {
        match self {
            Self::Legacy => write_legacy(sequence),
            Self::Yaml => write_yaml(sequence),
        }
    }
}

fn io_error(path: &Path, err: std::io::Error) -> RefuelError {
    RefuelError::IoError(format!("{}: {}", path.display(), err))
}

/// Read a shuffle file, choosing the codec from its extension.
pub fn read_path(path: &Path) -> Result<ShuffleSequence, RefuelError> {
    let format = ShuffleFormat::from_path(path);
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    debug!(path = %path.display(), ?format, "reading shuffle history");
    format.parse(&text)
}

/// Write a sequence as legacy text.
pub fn write_legacy_file(path: &Path, sequence: &ShuffleSequence) -> Result<(), RefuelError> {
    let text = write_legacy(sequence)?;
    std::fs::write(path, text).map_err(|e| io_error(path, e))
}

/// Write a sequence as YAML.
pub fn write_yaml_file(path: &Path, sequence: &ShuffleSequence) -> Result<(), RefuelError> {
    let text = write_yaml(sequence)?;
    std::fs::write(path, text).map_err(|e| io_error(path, e))
}
