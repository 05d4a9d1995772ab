use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::{BatchConfig, Config};
use crate::error::{RawbaseError, WorkerError};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::worker::job::{ConversionJob, JobOutcome, JobResult};
use crate::worker::pool::WorkerPool;
use crate::worker::scanner::RawScanner;

/// Shuffled candidate indices in `0..file_count * jobs_per_raw`, truncated to
/// `max_outputs`.
pub fn select_indices<R: Rng + ?Sized>(
    file_count: usize,
    jobs_per_raw: usize,
    max_outputs: Option<usize>,
    rng: &mut R,
) -> Vec<usize> {
    let total = file_count * jobs_per_raw;
    let mut indices: Vec<usize> = (0..total).collect();
    indices.shuffle(rng);
    indices.truncate(max_outputs.map_or(total, |max| max.min(total)));
    indices
}

/// Base names for every candidate index of a collection.
///
/// Indices are visited in order, so all variant-0 names are settled before any
/// `<stem>_<n>`. A name already taken, by a file whose own stem ends in `_<n>`
/// or by two files sharing a stem, gets a `-<k>` suffix. Names only depend on
/// the sorted file list, which keeps them stable across runs.
pub fn job_names(files: &[PathBuf], jobs_per_raw: usize) -> Vec<String> {
    let stems: Vec<String> = files.iter().map(|f| ConversionJob::stem_of(f)).collect();
    let total = files.len() * jobs_per_raw;
    let mut taken = HashSet::with_capacity(total);
    let mut names = Vec::with_capacity(total);

    for index in 0..total {
        let stem = &stems[index % files.len()];
        let natural = ConversionJob::base_name_for(stem, index / files.len());
        let mut name = natural.clone();
        let mut k = 1;
        while taken.contains(&name) {
            name = format!("{}-{}", natural, k);
            k += 1;
        }
        if name != natural {
            warn!(
                "{} is taken, using {} for {}",
                natural,
                name,
                files[index % files.len()].display()
            );
        }
        taken.insert(name.clone());
        names.push(name);
    }
    names
}

/// Index `i` develops file `i mod n` as variant `i div n`, under the name
/// assigned by [`job_names`].
pub fn job_for_index(
    files: &[PathBuf],
    names: &[String],
    collection: &str,
    index: usize,
) -> Option<ConversionJob> {
    if files.is_empty() {
        return None;
    }
    let name = names.get(index)?;
    Some(ConversionJob::named(
        files[index % files.len()].clone(),
        collection,
        index / files.len(),
        name.clone(),
    ))
}

/// Tallies of one batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub planned: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures_by_stage: BTreeMap<&'static str, usize>,
    pub warnings: usize,
    /// Stopped early by a shutdown request.
    pub interrupted: bool,
    pub failures: Vec<JobResult>,
}

impl BatchReport {
    fn new(started_at: DateTime<Utc>, planned: usize) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            planned,
            converted: 0,
            skipped: 0,
            failed: 0,
            failures_by_stage: BTreeMap::new(),
            warnings: 0,
            interrupted: false,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, result: JobResult) {
        self.warnings += result.warnings.len();
        match result.outcome {
            JobOutcome::Converted { .. } => self.converted += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Failed { stage, .. } => {
                self.failed += 1;
                *self.failures_by_stage.entry(stage).or_insert(0) += 1;
                self.failures.push(result);
            }
        }
    }

    pub fn processed(&self) -> usize {
        self.converted + self.skipped + self.failed
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "{} converted, {} skipped, {} failed of {} planned in {}:{:02}:{:02}",
            self.converted,
            self.skipped,
            self.failed,
            self.planned,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )?;
        if !self.failures_by_stage.is_empty() {
            let stages: Vec<String> = self
                .failures_by_stage
                .iter()
                .map(|(stage, count)| format!("{}: {}", stage, count))
                .collect();
            write!(f, " ({})", stages.join(", "))?;
        }
        if self.interrupted {
            write!(f, " [interrupted]")?;
        }
        Ok(())
    }
}

/// Enumerates the collections, selects the work subset and fans it out.
pub struct BatchScheduler {
    pipeline: Arc<Pipeline>,
    batch: BatchConfig,
    worker_count: usize,
    shutdown: Arc<AtomicBool>,
}

impl BatchScheduler {
    pub fn new(pipeline: Arc<Pipeline>, batch: BatchConfig) -> Self {
        let worker_count = batch.resolved_worker_count();
        Self {
            pipeline,
            batch,
            worker_count,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resolves the layout, prepares the output tree and builds the pipeline.
    ///
    /// `clean` removes previous outputs first, as does `paths.clean_on_start`.
    pub fn from_config(config: &Config, clean: bool) -> Result<Self, RawbaseError> {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        pipeline_config.layout.prepare(
            clean || config.paths.clean_on_start,
            pipeline_config.tiling_active(),
        )?;
        let pipeline = Pipeline::from_config(pipeline_config)?;
        Ok(Self::new(Arc::new(pipeline), config.batch.clone()))
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Setting this flag lets running jobs finish and stops dispatch.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Jobs for every configured collection, in dispatch order.
    pub fn plan(&self) -> Result<Vec<ConversionJob>, WorkerError> {
        let mut rng = match self.batch.selection_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let layout = &self.pipeline.config().layout;

        let mut jobs = Vec::new();
        for collection in &layout.collections {
            let scanner = RawScanner::new(
                layout.collection_dir(collection),
                &self.batch.raw_extensions,
            );
            let files = scanner.scan()?;
            let names = job_names(&files, self.batch.jobs_per_raw);
            let indices = select_indices(
                files.len(),
                self.batch.jobs_per_raw,
                self.batch.max_outputs,
                &mut rng,
            );
            info!(
                "{}: {} RAW files, {} images to convert",
                collection,
                files.len(),
                indices.len()
            );
            jobs.extend(
                indices
                    .into_iter()
                    .filter_map(|i| job_for_index(&files, &names, collection, i)),
            );
        }
        Ok(jobs)
    }

    pub fn run(&self) -> Result<BatchReport, WorkerError> {
        let started = Instant::now();
        let jobs = self.plan()?;
        let mut report = BatchReport::new(Utc::now(), jobs.len());

        let pool = WorkerPool::with_shutdown(
            Arc::clone(&self.pipeline),
            self.worker_count,
            Arc::clone(&self.shutdown),
        );

        // Submission blocks on the bounded queue, so it runs beside the
        // collector rather than before it.
        thread::scope(|s| {
            let pool = &pool;
            s.spawn(move || {
                for job in jobs {
                    if pool.submit(job).is_err() {
                        debug!("Dispatch stopped");
                        break;
                    }
                }
            });

            while report.processed() < report.planned {
                match pool.recv_result() {
                    Some(result) => report.record(result),
                    None => break,
                }
            }
        });

        report.interrupted = self.shutdown.load(Ordering::Relaxed);
        if report.interrupted {
            warn!(
                "Interrupted after {} of {} jobs",
                report.processed(),
                report.planned
            );
        }
        pool.wait();

        report.elapsed = started.elapsed();
        info!("Batch finished: {}", report);
        Ok(report)
    }
}
