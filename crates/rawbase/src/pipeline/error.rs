use std::path::PathBuf;

use thiserror::Error;

use crate::error::{StorageError, ToolError};
use crate::profile::{SamplerError, SerializeError};

/// Why a job stopped. Each variant belongs to exactly one stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Profile sampling failed: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Neither the engine nor the fallback could read '{path}': {detail}")]
    RawUnreadable { path: PathBuf, detail: String },

    #[error("Subsampling failed: {0}")]
    SubsamplingFailed(String),

    #[error("Profile claim failed: {0}")]
    Serialize(#[from] SerializeError),

    #[error("Final development produced no output: {detail}")]
    FinalDevelopFailed { detail: String },

    #[error("JPEG compression of '{path}' failed: {detail}")]
    CompressionFailed { path: PathBuf, detail: String },

    #[error("{stage} timed out: {source}")]
    TimedOut {
        stage: &'static str,
        #[source]
        source: ToolError,
    },

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Sampler(_) => "sample",
            PipelineError::RawUnreadable { .. } => "demosaic",
            PipelineError::SubsamplingFailed(_) => "subsample",
            PipelineError::Serialize(_) => "serialize",
            PipelineError::FinalDevelopFailed { .. } => "develop",
            PipelineError::CompressionFailed { .. } => "compress",
            PipelineError::TimedOut { stage, .. } => *stage,
            PipelineError::Storage(_) => "storage",
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum PipelineWarning {
    #[error("Tile '{}' failed: {error}", .tile.display())]
    TileWriteFailed { tile: PathBuf, error: String },

    #[error("Could not remove '{}': {error}", .path.display())]
    CleanupFailed { path: PathBuf, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stage_names() {
        let timed_out = PipelineError::TimedOut {
            stage: "develop",
            source: ToolError::TimedOut {
                program: "rawtherapee-cli".to_string(),
                timeout: Duration::from_secs(5),
            },
        };
        assert_eq!(timed_out.stage(), "develop");
        assert!(timed_out.to_string().contains("timed out"));

        let unreadable = PipelineError::RawUnreadable {
            path: PathBuf::from("a.ARW"),
            detail: "no output".to_string(),
        };
        assert_eq!(unreadable.stage(), "demosaic");
        assert_eq!(
            PipelineError::SubsamplingFailed("x".to_string()).stage(),
            "subsample"
        );
    }

    #[test]
    fn test_warning_display() {
        let w = PipelineWarning::TileWriteFailed {
            tile: PathBuf::from("/t/img_3.tif"),
            error: "disk full".to_string(),
        };
        assert_eq!(w.to_string(), "Tile '/t/img_3.tif' failed: disk full");
    }
}
