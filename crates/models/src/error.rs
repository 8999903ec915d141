use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("file not found: `{}`", path.display())]
    NotFound { path: PathBuf },

    #[error("reading `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding JSON from `{}`: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoding JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot `{}` already exists", path.display())]
    SnapshotExists { path: PathBuf },
}

impl ModelError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ModelError::Decode { .. })
    }
}
