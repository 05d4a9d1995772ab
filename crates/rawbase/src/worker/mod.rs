pub mod job;
pub mod pool;
pub mod scanner;
pub mod scheduler;

pub use job::{ConversionJob, JobOutcome, JobResult};
pub use pool::WorkerPool;
pub use scanner::RawScanner;
pub use scheduler::{job_for_index, job_names, select_indices, BatchReport, BatchScheduler};
