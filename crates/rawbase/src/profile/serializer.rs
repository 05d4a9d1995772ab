use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::types::{DevelopmentProfile, RealizedProfile, Stage, SubsamplingMode};

/// Header expected by the RawTherapee profile parser.
const PP3_HEADER: &str = "[Version]\nAppVersion=5.4\nVersion=331\n\n";

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Failed to write profile '{path}': {source}")]
    WriteProfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to audit log '{path}': {source}")]
    AppendAudit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of trying to persist a profile artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This call created the artifact; the job belongs to us.
    Won,
    /// The artifact already existed; another run or worker owns the job.
    Lost,
}

/// Renders the `.pp3` body for a profile.
pub fn render_pp3(profile: &DevelopmentProfile) -> String {
    let mut out = String::from(PP3_HEADER);
    // Writing to a String cannot fail.
    for stage in profile.stages() {
        match stage {
            Stage::Sharpen(p) => {
                let _ = write!(
                    out,
                    "[Sharpening]\nEnabled=true\nMethod=usm\nRadius={:.2}\nAmount={}\nThreshold=20;80;2000;1200;\n\n",
                    p.radius, p.amount
                );
            }
            Stage::Denoise(p) => {
                let _ = write!(
                    out,
                    "[Directional Pyramid Denoising]\nEnabled=true\nEnhance=false\nMedian=false\nLuma={}\nLdetail={}\n\n",
                    p.luminance, p.detail
                );
            }
        }
    }
    out
}

/// One fixed-width audit record, newline included.
pub fn audit_line(realized: &RealizedProfile) -> String {
    let p = &realized.profile;
    let (usm_set, radius, amount) = match p.sharpening {
        Some(s) => ("ON", s.radius, s.amount as f64),
        None => ("OFF", 0.0, 0.0),
    };
    let (denoise_set, luminance, detail) = match p.denoising {
        Some(d) => ("ON", d.luminance as f64, d.detail as f64),
        None => ("OFF", 0.0, 0.0),
    };
    let kernel = match p.subsampling {
        SubsamplingMode::CropOnly => "NONE",
        _ => p.kernel.audit_label(),
    };

    format!(
        "{:>30} | DEM {:>20} | {} | USM {:>3} , {:5.2} , {:6.2} | DENOISE {:>3} , {:5.2} , {:5.2} | RESIZE {} , {} , {:5.5} | {:4} x {:4} | {:3} \n",
        p.image_id,
        p.demosaicer,
        p.order.audit_flag(),
        usm_set,
        radius,
        amount,
        denoise_set,
        luminance,
        detail,
        p.subsampling.audit_label(),
        kernel,
        realized.subsampling_factor,
        p.crop.width,
        p.crop.height,
        p.quality,
    )
}

/// Persists profiles and keeps the shared audit log.
#[derive(Debug, Clone)]
pub struct ProfileSerializer {
    audit_log: PathBuf,
}

impl ProfileSerializer {
    pub fn new<P: AsRef<Path>>(audit_log: P) -> Self {
        Self {
            audit_log: audit_log.as_ref().to_path_buf(),
        }
    }

    pub fn audit_log(&self) -> &Path {
        &self.audit_log
    }

    /// Claims the profile artifact, then appends the audit line.
    ///
    /// The body is staged in a temporary file next to the artifact and linked
    /// into place without clobbering, so of two workers racing on the same
    /// image exactly one gets [`Claim::Won`] and the artifact is never seen
    /// half written. If the audit line cannot be appended the artifact is
    /// removed again, so the image is not taken as done.
    pub fn persist(
        &self,
        realized: &RealizedProfile,
        profile_path: &Path,
    ) -> Result<Claim, SerializeError> {
        let write_error = |source| SerializeError::WriteProfile {
            path: profile_path.to_path_buf(),
            source,
        };

        let dir = profile_path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
        staged
            .write_all(render_pp3(&realized.profile).as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(write_error)?;

        match staged.persist_noclobber(profile_path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("Profile {} already claimed", profile_path.display());
                return Ok(Claim::Lost);
            }
            Err(e) => return Err(write_error(e.error)),
        }

        if let Err(e) = self.append_audit(&audit_line(realized)) {
            if let Err(remove) = std::fs::remove_file(profile_path) {
                warn!(
                    "Cannot release claim {}: {}",
                    profile_path.display(),
                    remove
                );
            }
            return Err(e);
        }
        Ok(Claim::Won)
    }

    /// Appends one whole line with a single write so concurrent writers
    /// cannot interleave inside it.
    fn append_audit(&self, line: &str) -> Result<(), SerializeError> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log)
            .map_err(|e| SerializeError::AppendAudit {
                path: self.audit_log.clone(),
                source: e,
            })?;
        log.write_all(line.as_bytes())
            .map_err(|e| SerializeError::AppendAudit {
                path: self.audit_log.clone(),
                source: e,
            })
    }
}
