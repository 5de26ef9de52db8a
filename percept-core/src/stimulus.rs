use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a stimulus reaches the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Video,
    Image,
}

impl Modality {
    pub fn extension(&self) -> &'static str {
        match self {
            Modality::Video => "mp4",
            Modality::Image => "png",
        }
    }
}

/// A media file on disk plus the way it is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stimulus {
    pub path: PathBuf,
    pub modality: Modality,
}

impl Stimulus {
    /// Stimulus number `index` of a sequentially numbered directory
    /// (`1.mp4 .. N.mp4` or `1.png .. N.png`).
    pub fn numbered(dir: &Path, index: usize, modality: Modality) -> Self {
        Self {
            path: dir.join(format!("{index}.{}", modality.extension())),
            modality,
        }
    }
}
