//! Error types shared by the bucket and geometry cores and the media collaborators.

use std::io;
use thiserror::Error;

/// Result type for the pure planning functions.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Errors raised by the planning cores.
///
/// `InvalidConfiguration` is raised while setting up a run (bad bucket list,
/// bad target ratio, conflicting fixed dimensions) and should abort it.
/// `InvalidInput` concerns a single file and should only skip that file.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrepError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PrepError {
    pub fn config(message: impl Into<String>) -> Self {
        PrepError::InvalidConfiguration(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        PrepError::InvalidInput(message.into())
    }

    /// True when the whole run should stop rather than just the current file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PrepError::InvalidConfiguration(_))
    }
}

/// Failures reading metadata from the external prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse prober output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("video stream reports no {0}")]
    MissingField(&'static str),
}

/// Failures running the external transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}
