use std::path::PathBuf;

use crate::profile::{DevelopmentProfile, RealizedProfile};
use crate::storage::{JobArtifacts, Layout};
use crate::worker::job::ConversionJob;

use super::error::PipelineWarning;

pub struct PipelineContext {
    // Input
    pub job: ConversionJob,
    pub artifacts: JobArtifacts,

    // Set once sampling succeeded
    pub profile: Option<DevelopmentProfile>,

    // Set once the profile was claimed
    pub realized: Option<RealizedProfile>,

    // Tile JPEGs written
    pub tiles: Vec<PathBuf>,

    // Size of the tile grid, once split
    pub planned_tiles: Option<usize>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: ConversionJob, layout: &Layout) -> Self {
        let artifacts = layout.artifacts(&job.collection, &job.base_name, job.tag());
        Self {
            job,
            artifacts,
            profile: None,
            realized: None,
            tiles: Vec::new(),
            planned_tiles: None,
            warnings: Vec::new(),
        }
    }
}
