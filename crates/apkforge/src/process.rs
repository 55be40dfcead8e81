//! External command execution
//!
//! Every external tool (curl, unzip, sdkmanager, aapt2) goes through the
//! [`CommandRunner`] trait. [`SystemRunner`] spawns real processes with a
//! hard timeout; tests substitute a scripted fake.

use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::{BuildError, Result};

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest stderr excerpt carried in an error
const STDERR_TAIL: usize = 2000;

/// One external command invocation
#[derive(Debug, Clone, Default)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdin: Option<Vec<u8>>,
    pub current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Bytes fed to the child's stdin, which is then closed
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Short program name for logs and errors ("aapt2", not the full path)
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Argument at `index` as a string, for inspection
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| a.to_str())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }

    fn stderr_tail(&self) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let text = text.trim();
        let start = text
            .char_indices()
            .rev()
            .nth(STDERR_TAIL - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        text[start..].to_string()
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Run to completion, killing the child if it outlives `timeout`
    ///
    /// A non-zero exit is not an error here; see [`run_checked`].
    fn run(&self, command: &ToolCommand, timeout: Duration) -> Result<ToolOutput>;
}

/// Run a command and fail unless it exits successfully
pub fn run_checked(
    runner: &dyn CommandRunner,
    command: &ToolCommand,
    timeout: Duration,
) -> Result<ToolOutput> {
    let output = runner.run(command, timeout)?;
    if !output.success() {
        let err = BuildError::ToolFailed {
            program: command.program_name(),
            status: output.status_text(),
            stderr: output.stderr_tail(),
        };
        error!("{}", err);
        return Err(err);
    }
    Ok(output)
}

/// Spawns real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand, timeout: Duration) -> Result<ToolOutput> {
        let name = command.program_name();
        debug!("Running {} {:?}", command.program.display(), command.args);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| BuildError::io(format!("Failed to execute {}", name), e))?;

        // Feed stdin and drain pipes on threads so a chatty child never blocks
        let writer = match (child.stdin.take(), command.stdin.clone()) {
            (Some(mut pipe), Some(input)) => Some(thread::spawn(move || {
                // The child may exit without reading everything
                let _ = pipe.write_all(&input);
            })),
            _ => None,
        };
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let code = match wait_with_timeout(&mut child, timeout) {
            Ok(code) => code,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(match e {
                    WaitError::TimedOut => {
                        error!("{} timed out after {}s", name, timeout.as_secs());
                        BuildError::ToolTimeout {
                            program: name,
                            timeout,
                        }
                    }
                    WaitError::Io(e) => BuildError::io(format!("Failed to wait for {}", name), e),
                });
            }
        };

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let output = ToolOutput {
            code,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };
        debug!("{} finished with {}", name, output.status_text());
        Ok(output)
    }
}

enum WaitError {
    TimedOut,
    Io(std::io::Error),
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::result::Result<Option<i32>, WaitError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) if Instant::now() >= deadline => return Err(WaitError::TimedOut),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(WaitError::Io(e)),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Whether `path` looks like an executable file
pub(crate) fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
