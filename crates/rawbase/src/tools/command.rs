use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a finished tool invocation reported. Informational only.
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Runs `program` with stdout and stderr appended to `log_path`, killing it
/// once `timeout` has elapsed.
pub fn run_tool<I, S>(
    program: &str,
    args: I,
    log_path: &Path,
    timeout: Duration,
) -> Result<ToolRun, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let open_log = || {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| ToolError::ToolLog {
                path: log_path.to_path_buf(),
                source: e,
            })
    };
    let stdout = open_log()?;
    let stderr = open_log()?;

    let started = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| ToolError::Spawn {
            program: program.to_string(),
            source: e,
        })?;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let run = ToolRun {
                    exit_code: status.code(),
                    elapsed: started.elapsed(),
                };
                debug!(
                    "{} exited with {:?} after {:?}",
                    program, run.exit_code, run.elapsed
                );
                return Ok(run);
            }
            Ok(None) if started.elapsed() >= timeout => {
                warn!("{} exceeded {:?}, killing it", program, timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::TimedOut {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(ToolError::Wait {
                    program: program.to_string(),
                    source: e,
                })
            }
        }
    }
}

/// Last `max_lines` lines of a tool log, for failure reports.
pub fn log_tail(log_path: &Path, max_lines: usize) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(max_lines);
    Some(lines[start..].join("\n"))
}
