//! Error types for metric sampling.

use std::path::PathBuf;

/// Failure to read or interpret an OS counter source.
///
/// Sampling never propagates these past the sampler: a failed query turns
/// the affected metric into the unavailable sentinel for that tick.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {file} format: {reason}")]
    Parse { file: &'static str, reason: String },

    #[error("{0} failed")]
    Query(&'static str),
}

impl SampleError {
    pub(crate) fn parse(file: &'static str, reason: impl Into<String>) -> Self {
        SampleError::Parse {
            file,
            reason: reason.into(),
        }
    }
}
