use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// One RAW file to develop into one output variant.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: String,
    pub raw_path: PathBuf,
    /// Extension as found on disk, without the dot.
    pub extension: String,
    pub collection: String,
    pub variant: usize,
    /// `<stem>` for variant 0, `<stem>_<variant>` afterwards, unless the
    /// scheduler had to disambiguate. Names every artifact of the job and
    /// seeds its random profile.
    pub base_name: String,
}

impl ConversionJob {
    pub fn new(raw_path: PathBuf, collection: impl Into<String>, variant: usize) -> Self {
        let base_name = Self::base_name_for(&Self::stem_of(&raw_path), variant);
        Self::named(raw_path, collection, variant, base_name)
    }

    /// A job whose base name was assigned by the caller.
    pub fn named(
        raw_path: PathBuf,
        collection: impl Into<String>,
        variant: usize,
        base_name: String,
    ) -> Self {
        let extension = raw_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            raw_path,
            extension,
            collection: collection.into(),
            variant,
            base_name,
        }
    }

    pub fn stem_of(raw_path: &Path) -> String {
        raw_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }

    pub fn base_name_for(stem: &str, variant: usize) -> String {
        if variant == 0 {
            stem.to_string()
        } else {
            format!("{}_{}", stem, variant)
        }
    }

    /// Short id suffix for the job's private temporaries.
    pub fn tag(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    /// Sigma/Foveon captures, which may need the fallback extractor.
    pub fn is_x3f(&self) -> bool {
        self.extension.eq_ignore_ascii_case("x3f")
    }

    pub fn file_name(&self) -> String {
        self.raw_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.base_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Converted { jpeg: PathBuf, tiles: usize },
    /// The profile artifact already existed, or another worker claimed it
    /// first.
    Skipped,
    Failed { stage: &'static str, error: String },
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub raw_path: PathBuf,
    pub collection: String,
    pub base_name: String,
    pub outcome: JobOutcome,
    pub warnings: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    fn new(job: &ConversionJob, outcome: JobOutcome) -> Self {
        Self {
            job_id: job.id.clone(),
            raw_path: job.raw_path.clone(),
            collection: job.collection.clone(),
            base_name: job.base_name.clone(),
            outcome,
            warnings: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    pub fn success(job: &ConversionJob, jpeg: &Path, tiles: usize) -> Self {
        Self::new(
            job,
            JobOutcome::Converted {
                jpeg: jpeg.to_path_buf(),
                tiles,
            },
        )
    }

    pub fn skipped(job: &ConversionJob) -> Self {
        Self::new(job, JobOutcome::Skipped)
    }

    pub fn failure(job: &ConversionJob, stage: &'static str, error: String) -> Self {
        Self::new(job, JobOutcome::Failed { stage, error })
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Converted { .. })
    }
}
