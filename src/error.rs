use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading geometry or talking to the backend.
///
/// None of these are fatal to the map: the panel stays in `Loading` and the
/// feed shows a waiting state.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("topology has no object named `{0}`")]
    MissingObject(String),

    #[error("arc index {index} out of range ({len} arcs)")]
    ArcOutOfRange { index: i64, len: usize },

    #[error("geometry loader is no longer available")]
    LoaderGone,
}

impl From<simd_json::Error> for MapError {
    fn from(e: simd_json::Error) -> Self {
        MapError::Json(e.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(e: serde_json::Error) -> Self {
        MapError::Json(e.to_string())
    }
}

/// Configuration problems, reported before the terminal is touched
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
