use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::command::run_tool;
use super::FallbackExtractor;
use crate::error::ToolError;

/// `x3f_extract` for Sigma/Foveon files.
#[derive(Debug, Clone)]
pub struct X3fExtract {
    program: String,
    timeout: Duration,
}

impl X3fExtract {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn args(raw: &Path) -> Vec<OsString> {
        vec![
            "-q".into(),
            "-tiff".into(),
            "-no-denoise".into(),
            "-no-sgain".into(),
            raw.as_os_str().to_owned(),
        ]
    }

    /// The extractor writes next to its input, appending `.tif` to the full
    /// file name (`img.X3F` becomes `img.X3F.tif`).
    pub fn output_for(raw: &Path) -> PathBuf {
        let mut name = raw.as_os_str().to_owned();
        name.push(".tif");
        PathBuf::from(name)
    }
}

impl FallbackExtractor for X3fExtract {
    fn extract(&self, raw: &Path, log: &Path) -> Result<PathBuf, ToolError> {
        debug!("Extracting {} with {}", raw.display(), self.program);
        run_tool(&self.program, Self::args(raw), log, self.timeout)?;
        Ok(Self::output_for(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_appends_suffix() {
        assert_eq!(
            X3fExtract::output_for(Path::new("/raw/sigma/DSC0001.X3F")),
            PathBuf::from("/raw/sigma/DSC0001.X3F.tif")
        );
    }

    #[test]
    fn test_args_end_with_input() {
        let args = X3fExtract::args(Path::new("a.X3F"));
        assert_eq!(args.len(), 5);
        assert_eq!(args[1], OsString::from("-tiff"));
        assert_eq!(args[4], OsString::from("a.X3F"));
    }
}
