//! Builder for executing external tool commands with optional deadline.

use crate::tools::{Tool, ToolsConfig};
use crate::{Error, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often a deadline-bound child is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output captured from a tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// A non-zero exit is not an error here; callers inspect [`ToolOutput`].
///
/// # Example
///
/// ```no_run
/// use playfit_av::ToolCommand;
/// use std::path::PathBuf;
///
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "quiet", "-print_format", "json", "-show_format"])
///     .arg("/path/to/video.mkv")
///     .execute()?;
/// println!("{}", output.stdout);
/// # Ok::<(), playfit_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Kill the process if it runs longer than `d`.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the executable does not exist.
    /// - [`Error::Timeout`] if the deadline passed; the child is killed first.
    /// - [`Error::Io`] for any other spawn or wait failure.
    pub fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();
        tracing::debug!("Running {} {}", program_name, self.args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(program_name.clone())
                } else {
                    Error::Io(e)
                }
            })?;

        let stdout_handle = drain(child.stdout.take());
        let stderr_handle = drain(child.stderr.take());

        let status = match self.timeout {
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        if let Err(e) = child.kill() {
                            tracing::warn!("Failed to kill {}: {}", program_name, e);
                        }
                        if let Err(e) = child.wait() {
                            tracing::warn!("Failed to reap {}: {}", program_name, e);
                        }
                        return Err(Error::Timeout {
                            tool: program_name,
                            timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
            None => child.wait()?,
        };

        let output = ToolOutput {
            exit_code: status.code(),
            stdout: collect(stdout_handle),
            stderr: collect(stderr_handle),
        };

        if !output.success() {
            tracing::debug!("{} exited with {:?}", program_name, output.exit_code);
        }

        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut reader| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = reader.read_to_end(&mut buf) {
                tracing::warn!("Failed to read tool output: {}", e);
            }
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

/// Seam between the pipeline and the processes it spawns.
///
/// Every component that calls an external tool takes a `&dyn ToolRunner`,
/// so tests can script tool behavior without touching the system.
pub trait ToolRunner {
    /// Run `tool` with `args`, optionally bounded by `timeout`.
    fn run(&self, tool: Tool, args: &[String], timeout: Option<Duration>) -> Result<ToolOutput>;
}

/// [`ToolRunner`] that spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    tools: ToolsConfig,
}

impl SystemRunner {
    /// Create a runner resolving executables from `tools`.
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, tool: Tool, args: &[String], timeout: Option<Duration>) -> Result<ToolOutput> {
        let mut cmd = ToolCommand::new(self.tools.program(tool));
        cmd.args(args.iter().cloned());
        if let Some(t) = timeout {
            cmd.timeout(t);
        }
        cmd.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute();

        match output {
            Ok(out) => {
                assert!(out.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[test]
    fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345")).execute();
        assert_matches!(result, Err(Error::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let output = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo boom >&2; exit 3"])
            .execute()
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert!(output.stderr.contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_fires() {
        let started = Instant::now();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(300))
            .execute();
        assert_matches!(result, Err(Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
