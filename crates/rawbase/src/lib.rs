pub mod config;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod storage;
pub mod tools;
pub mod worker;

pub use config::{load_config, Config, DevelopmentMode};
pub use error::{
    ConfigError, ImageOpError, RawbaseError, Result, StorageError, ToolError, WorkerError,
};
pub use logging::init_logging;
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext};
pub use profile::{DevelopmentProfile, ParameterSampler, ProfileSerializer};
pub use worker::{BatchReport, BatchScheduler, ConversionJob, JobOutcome, JobResult};
