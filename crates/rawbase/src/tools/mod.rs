//! External converters driven as child processes.
//!
//! Both tools are black boxes: their exit status is logged but never trusted.
//! Callers decide success by checking for the expected output file.

pub mod command;
pub mod rawtherapee;
pub mod x3f;

use std::path::{Path, PathBuf};

use crate::error::ToolError;

pub use command::{log_tail, run_tool, ToolRun};
pub use rawtherapee::RawTherapeeCli;
pub use x3f::X3fExtract;

/// Bit depth of a developed TIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u8 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }
}

/// One development call: `input` rendered to a TIFF at `output` with the
/// settings in `profile`.
#[derive(Debug, Clone, Copy)]
pub struct DevelopRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub profile: &'a Path,
    pub depth: BitDepth,
    pub log: &'a Path,
}

/// The RAW development engine.
pub trait RawEngine: Send + Sync {
    fn develop(&self, request: &DevelopRequest<'_>) -> Result<(), ToolError>;
}

/// Extractor used when the engine cannot read a RAW format.
pub trait FallbackExtractor: Send + Sync {
    /// Runs the extractor and returns where its TIFF is expected to appear.
    fn extract(&self, raw: &Path, log: &Path) -> Result<PathBuf, ToolError>;
}
