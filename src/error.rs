//! Error types for the spawn pipeline.
//!
//! Upstream dataset failures are fatal for the run and surface as
//! [`PipelineError`]. Geometry failures are scoped to one map block and are
//! reported as [`GeometryError`] so the driver can log and move on.

use std::path::PathBuf;

/// Fatal pipeline error
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("RON error in {path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("RON encode error for {path}: {source}")]
    RonEncode {
        path: PathBuf,
        #[source]
        source: ron::Error,
    },
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Structural failure while reading one map block's geometry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("block {xblock} unavailable: {reason}")]
    BlockUnavailable { xblock: String, reason: String },
    #[error("block {xblock}: malformed entity #{index}: {reason}")]
    MalformedEntity {
        xblock: String,
        index: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
