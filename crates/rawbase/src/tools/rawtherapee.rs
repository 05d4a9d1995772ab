use std::ffi::OsString;
use std::time::Duration;

use tracing::debug;

use super::command::run_tool;
use super::{DevelopRequest, RawEngine};
use crate::error::ToolError;

/// `rawtherapee-cli` in batch mode.
#[derive(Debug, Clone)]
pub struct RawTherapeeCli {
    program: String,
    timeout: Duration,
}

impl RawTherapeeCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `-q -t -b<depth> -Y -o <out> -p <pp3> -c <in>`. `-c` must come last.
    pub fn args(request: &DevelopRequest<'_>) -> Vec<OsString> {
        vec![
            "-q".into(),
            "-t".into(),
            format!("-b{}", request.depth.bits()).into(),
            "-Y".into(),
            "-o".into(),
            request.output.as_os_str().to_owned(),
            "-p".into(),
            request.profile.as_os_str().to_owned(),
            "-c".into(),
            request.input.as_os_str().to_owned(),
        ]
    }
}

impl RawEngine for RawTherapeeCli {
    fn develop(&self, request: &DevelopRequest<'_>) -> Result<(), ToolError> {
        debug!(
            "Developing {} -> {} with {}",
            request.input.display(),
            request.output.display(),
            request.profile.display()
        );
        run_tool(&self.program, Self::args(request), request.log, self.timeout)?;
        Ok(())
    }
}
