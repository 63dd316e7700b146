use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while turning a chapter file into paragraphs.
#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid chapter JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Document { path: PathBuf, message: String },

    /// The file parsed but held no readable text.
    #[error("{path} contains no text")]
    Empty { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store at {path} is not a JSON object of strings")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a gloss could not be fetched. Shown to the reader, so messages stay short.
#[derive(Debug, Error)]
pub enum GlossError {
    #[error("gloss request failed: {0}")]
    Transport(String),

    #[error("gloss service answered {0}")]
    Status(u16),

    #[error("malformed gloss response: {0}")]
    Malformed(String),

    #[error("gloss worker stopped")]
    Disconnected,
}

impl From<reqwest::Error> for GlossError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GlossError::Status(status.as_u16())
        } else if err.is_decode() {
            GlossError::Malformed(err.to_string())
        } else {
            GlossError::Transport(err.to_string())
        }
    }
}
