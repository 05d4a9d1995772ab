use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::error::ToolError;
use crate::imaging::{ImageOps, ImageToolkit};
use crate::profile::{Claim, DevelopmentProfile, ParameterSampler, ProfileSerializer, SamplerError};
use crate::storage::{
    count_entries, ensure_directory, move_file, remove_dir_if_exists, remove_file_if_exists,
    JobArtifacts,
};
use crate::tools::{
    log_tail, BitDepth, DevelopRequest, FallbackExtractor, RawEngine, RawTherapeeCli, X3fExtract,
};
use crate::worker::job::{ConversionJob, JobResult};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::progress::{JobPhase, ProgressEvent, ProgressReporter};

const LOG_TAIL_LINES: usize = 5;

/// How a job ended when nothing went wrong.
enum Flow {
    Converted,
    Skipped,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    sampler: ParameterSampler,
    serializer: ProfileSerializer,
    engine: Arc<dyn RawEngine>,
    fallback: Arc<dyn FallbackExtractor>,
    images: Arc<dyn ImageOps>,
}

impl Pipeline {
    /// Production constructor: external tools from config, pixels via `image`.
    pub fn from_config(config: Arc<PipelineConfig>) -> Result<Self, SamplerError> {
        let timeout = config.tool_timeout();
        let engine = Arc::new(RawTherapeeCli::new(&config.tools.rawtherapee, timeout));
        let fallback = Arc::new(X3fExtract::new(&config.tools.x3f_extract, timeout));
        Self::with_components(config, engine, fallback, Arc::new(ImageToolkit))
    }

    /// Inject specific converters, e.g. fakes in tests.
    pub fn with_components(
        config: Arc<PipelineConfig>,
        engine: Arc<dyn RawEngine>,
        fallback: Arc<dyn FallbackExtractor>,
        images: Arc<dyn ImageOps>,
    ) -> Result<Self, SamplerError> {
        let sampler = ParameterSampler::new(&config.development)?;
        let serializer = ProfileSerializer::new(&config.layout.audit_log);
        Ok(Self {
            config,
            sampler,
            serializer,
            engine,
            fallback,
            images,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn context(&self, job: ConversionJob) -> PipelineContext {
        PipelineContext::new(job, &self.config.layout)
    }

    /// Run the full pipeline for a single job.
    /// Failures stay inside the returned [`JobResult`].
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            image = %ctx.job.base_name,
            collection = %ctx.job.collection,
        )
        .entered();

        let result = match self.execute(&mut ctx, progress) {
            Ok(Flow::Converted) => {
                progress.report(ProgressEvent::Completed {
                    jpeg: ctx.artifacts.jpeg.clone(),
                    tiles: ctx.tiles.len(),
                });
                JobResult::success(&ctx.job, &ctx.artifacts.jpeg, ctx.tiles.len())
            }
            Ok(Flow::Skipped) => {
                progress.report(ProgressEvent::Skipped);
                JobResult::skipped(&ctx.job)
            }
            Err(e) => {
                let error = e.to_string();
                progress.report(ProgressEvent::Failed {
                    stage: e.stage(),
                    error: error.clone(),
                });
                JobResult::failure(&ctx.job, e.stage(), error)
            }
        };

        let warnings = ctx.warnings.iter().map(ToString::to_string).collect();
        (result.with_warnings(warnings), ctx)
    }

    fn execute(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<Flow, PipelineError> {
        let artifacts = ctx.artifacts.clone();

        // Step 0: An existing profile means the job was done (or is being done)
        if artifacts.profile.exists() {
            debug!("{} exists", artifacts.profile.display());
            return Ok(Flow::Skipped);
        }

        // Step 1: Sample the development profile
        let profile = {
            let _step = info_span!("sample").entered();
            phase(progress, JobPhase::Sampling, "Sampling development profile");
            self.sampler.sample(&ctx.job.base_name)?
        };
        ctx.profile = Some(profile.clone());

        // Step 2: Demosaic to a 16-bit TIFF
        {
            let _step = info_span!("demosaic", demosaicer = %profile.demosaicer).entered();
            phase(progress, JobPhase::Demosaicing, "Demosaicing RAW file");
            self.step_demosaic(&ctx.job, &artifacts, &profile)?;
        }

        // Step 3: Resize and crop
        let factor = {
            let _step = info_span!("subsample").entered();
            phase(progress, JobPhase::Subsampling, "Resizing and cropping");
            self.step_subsample(&artifacts, &profile)?
        };
        let realized = profile.realize(factor);

        // Step 4: Persist the profile; this is the claim
        {
            let _step = info_span!("serialize").entered();
            phase(progress, JobPhase::Serializing, "Writing development profile");
            ensure_directory(parent_of(&artifacts.profile))?;
            let claim = self.serializer.persist(&realized, &artifacts.profile)?;
            ctx.realized = Some(realized.clone());
            if claim == Claim::Lost {
                debug!("Claim lost to another worker");
                self.remove_all(
                    ctx,
                    &[
                        &artifacts.demosaiced,
                        &artifacts.subsampled,
                        &artifacts.tool_log,
                    ],
                );
                return Ok(Flow::Skipped);
            }
        }

        // Step 5: Final development with the persisted profile
        {
            let _step = info_span!("develop").entered();
            phase(progress, JobPhase::Developing, "Applying development profile");
            self.step_develop(&artifacts)?;
        }

        // Step 6: Multi-crop tiles (non-fatal)
        if self.config.tiling_active() {
            let _step = info_span!("tile").entered();
            phase(progress, JobPhase::Tiling, "Splitting into tiles");
            self.step_tile(ctx, &artifacts, realized.profile.quality);
        }

        // Step 7: JPEG compression
        {
            let _step = info_span!("compress", quality = realized.profile.quality).entered();
            phase(progress, JobPhase::Compressing, "Compressing to JPEG");
            self.step_compress(&artifacts, realized.profile.quality)?;
        }

        // Step 8: Remove intermediates
        {
            let _step = info_span!("cleanup").entered();
            phase(progress, JobPhase::CleaningUp, "Removing intermediates");
            self.step_cleanup(ctx, &artifacts);
        }

        Ok(Flow::Converted)
    }

    fn step_demosaic(
        &self,
        job: &ConversionJob,
        artifacts: &JobArtifacts,
        profile: &DevelopmentProfile,
    ) -> Result<(), PipelineError> {
        ensure_directory(parent_of(&artifacts.demosaiced))?;
        remove_file_if_exists(&artifacts.demosaiced)?;

        let demosaic_profile = self.config.layout.demosaic_profile(&profile.demosaicer);
        let request = DevelopRequest {
            input: &job.raw_path,
            output: &artifacts.demosaiced,
            profile: &demosaic_profile,
            depth: BitDepth::Sixteen,
            log: &artifacts.tool_log,
        };

        let mut notes = Vec::new();
        check_tool("demosaic", self.engine.develop(&request), &mut notes)?;

        if !artifacts.demosaiced.exists() && job.is_x3f() {
            warn!("Engine could not read {}, trying extractor", job.file_name());
            let extracted = self.fallback.extract(&job.raw_path, &artifacts.tool_log);
            match extracted {
                Ok(path) if path.exists() => move_file(&path, &artifacts.demosaiced)?,
                Ok(path) => notes.push(format!("extractor wrote no {}", path.display())),
                Err(e) => check_tool("demosaic", Err(e), &mut notes)?,
            }
        }

        if !artifacts.demosaiced.exists() {
            return Err(PipelineError::RawUnreadable {
                path: job.raw_path.clone(),
                detail: self.failure_detail(notes, &artifacts.tool_log),
            });
        }
        Ok(())
    }

    fn step_subsample(
        &self,
        artifacts: &JobArtifacts,
        profile: &DevelopmentProfile,
    ) -> Result<f64, PipelineError> {
        remove_file_if_exists(&artifacts.subsampled)?;
        let factor = self
            .images
            .subsample(
                &artifacts.demosaiced,
                &artifacts.subsampled,
                profile,
                &self.config.subsample_settings(),
            )
            .map_err(|e| PipelineError::SubsamplingFailed(e.to_string()))?;

        if !artifacts.subsampled.exists() {
            return Err(PipelineError::SubsamplingFailed(format!(
                "{} was not written",
                artifacts.subsampled.display()
            )));
        }
        debug!("Subsampling factor {:.5}", factor);
        Ok(factor)
    }

    fn step_develop(&self, artifacts: &JobArtifacts) -> Result<(), PipelineError> {
        ensure_directory(parent_of(&artifacts.final_tiff))?;
        remove_file_if_exists(&artifacts.final_tiff)?;

        let request = DevelopRequest {
            input: &artifacts.subsampled,
            output: &artifacts.final_tiff,
            profile: &artifacts.profile,
            depth: BitDepth::Eight,
            log: &artifacts.tool_log,
        };
        let mut notes = Vec::new();
        check_tool("develop", self.engine.develop(&request), &mut notes)?;

        if !artifacts.final_tiff.exists() {
            return Err(PipelineError::FinalDevelopFailed {
                detail: self.failure_detail(notes, &artifacts.tool_log),
            });
        }
        Ok(())
    }

    fn step_tile(&self, ctx: &mut PipelineContext, artifacts: &JobArtifacts, quality: u8) {
        let dirs = ensure_directory(&artifacts.tile_tiff_dir)
            .and_then(|_| ensure_directory(&artifacts.tile_jpeg_dir));
        if let Err(e) = dirs {
            warn!("Cannot prepare tile directories: {}", e);
            ctx.warnings.push(PipelineWarning::TileWriteFailed {
                tile: artifacts.tile_tiff_dir.clone(),
                error: e.to_string(),
            });
            return;
        }

        let report = match self.images.split_tiles(
            &artifacts.final_tiff,
            &artifacts.tile_tiff_dir,
            &ctx.job.base_name,
            self.config.tile_count(),
        ) {
            Ok(report) => report,
            Err(e) => {
                warn!("Tiling failed: {}", e);
                ctx.warnings.push(PipelineWarning::TileWriteFailed {
                    tile: artifacts.tile_tiff_dir.clone(),
                    error: e.to_string(),
                });
                return;
            }
        };

        ctx.planned_tiles = Some(report.planned());
        for (tile, error) in report.failed {
            ctx.warnings
                .push(PipelineWarning::TileWriteFailed { tile, error });
        }

        for tile in report.written {
            let Some(jpeg) = artifacts.tile_jpeg(&tile) else {
                continue;
            };
            let error = match self.images.compress_jpeg(&tile, &jpeg, quality) {
                Ok(()) if jpeg.exists() => {
                    ctx.tiles.push(jpeg);
                    continue;
                }
                Ok(()) => "no JPEG written".to_string(),
                Err(e) => e.to_string(),
            };
            warn!("Tile {} not compressed: {}", tile.display(), error);
            ctx.warnings
                .push(PipelineWarning::TileWriteFailed { tile, error });
        }
        debug!("{} tiles written", ctx.tiles.len());
    }

    fn step_compress(&self, artifacts: &JobArtifacts, quality: u8) -> Result<(), PipelineError> {
        ensure_directory(parent_of(&artifacts.jpeg))?;
        let compressed = self
            .images
            .compress_jpeg(&artifacts.final_tiff, &artifacts.jpeg, quality);

        let detail = match compressed {
            Ok(()) if artifacts.jpeg.exists() => return Ok(()),
            Ok(()) => "no JPEG written".to_string(),
            Err(e) => e.to_string(),
        };
        // A truncated JPEG must not pass for a result.
        if let Err(e) = remove_file_if_exists(&artifacts.jpeg) {
            warn!("{}", e);
        }
        Err(PipelineError::CompressionFailed {
            path: artifacts.final_tiff.clone(),
            detail,
        })
    }

    /// Only reached once the JPEG exists.
    fn step_cleanup(&self, ctx: &mut PipelineContext, artifacts: &JobArtifacts) {
        if self.config.development.keep_uncompressed {
            self.remove_all(ctx, &[&artifacts.demosaiced, &artifacts.subsampled]);
            return;
        }

        self.remove_all(
            ctx,
            &[
                &artifacts.demosaiced,
                &artifacts.subsampled,
                &artifacts.final_tiff,
                &artifacts.tool_log,
            ],
        );

        // A partial tile set stays behind for inspection. The grid may hold
        // more tiles than configured when the count is not a square.
        let full_set = ctx
            .planned_tiles
            .is_some_and(|planned| count_entries(&artifacts.tile_tiff_dir) == Some(planned));
        if self.config.tiling_active() && full_set {
            if let Err(e) = remove_dir_if_exists(&artifacts.tile_tiff_dir) {
                ctx.warnings.push(PipelineWarning::CleanupFailed {
                    path: artifacts.tile_tiff_dir.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn remove_all(&self, ctx: &mut PipelineContext, paths: &[&PathBuf]) {
        for path in paths {
            if let Err(e) = remove_file_if_exists(path) {
                warn!("{}", e);
                ctx.warnings.push(PipelineWarning::CleanupFailed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn failure_detail(&self, mut notes: Vec<String>, log: &Path) -> String {
        if let Some(tail) = log_tail(log, LOG_TAIL_LINES) {
            notes.push(format!("tool output:\n{}", tail));
        }
        if notes.is_empty() {
            "no output written".to_string()
        } else {
            notes.join("; ")
        }
    }
}

fn phase(progress: &dyn ProgressReporter, phase: JobPhase, message: &str) {
    progress.report(ProgressEvent::Phase {
        phase,
        message: message.to_string(),
    });
}

/// Timeouts end the job; any other tool error is only noted, since the
/// output file decides success.
fn check_tool(
    stage: &'static str,
    result: Result<(), ToolError>,
    notes: &mut Vec<String>,
) -> Result<(), PipelineError> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ ToolError::TimedOut { .. }) => Err(PipelineError::TimedOut { stage, source: e }),
        Err(e) => {
            warn!("{}", e);
            notes.push(e.to_string());
            Ok(())
        }
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}
