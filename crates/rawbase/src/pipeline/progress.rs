use std::path::PathBuf;

use tracing::{debug, info, warn};

/// Stages a job moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Sampling,
    Demosaicing,
    Subsampling,
    Serializing,
    Developing,
    Tiling,
    Compressing,
    CleaningUp,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Sampling => "sample",
            JobPhase::Demosaicing => "demosaic",
            JobPhase::Subsampling => "subsample",
            JobPhase::Serializing => "serialize",
            JobPhase::Developing => "develop",
            JobPhase::Tiling => "tile",
            JobPhase::Compressing => "compress",
            JobPhase::CleaningUp => "cleanup",
        }
    }
}

/// Events emitted by the pipeline during processing.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Phase {
        phase: JobPhase,
        message: String,
    },
    Completed {
        jpeg: PathBuf,
        tiles: usize,
    },
    Skipped,
    Failed {
        stage: &'static str,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events to the tracing subscriber. Runs inside the job's span, so
/// the image name is already attached.
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                debug!(phase = phase.as_str(), "{}", message);
            }
            ProgressEvent::Completed { jpeg, tiles } => {
                info!(tiles, "Converted -> {}", jpeg.display());
            }
            ProgressEvent::Skipped => {
                info!("Already processed, skipped");
            }
            ProgressEvent::Failed { stage, error } => {
                warn!(stage, "{}", error);
            }
        }
    }
}
