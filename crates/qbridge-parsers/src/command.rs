//! Command execution contract for scheduler queries.
//!
//! Scheduler tools are driven through [`ProcessRunner`], so the adapter logic
//! can be exercised against scripted output without a cluster installed.

use async_trait::async_trait;
use camino::Utf8Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// Error type for command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute {command}: {error}")]
    Execution { command: String, error: String },
    #[error("Command {command} failed with exit code {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("Command {command} did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Exit status of a finished command.
///
/// `code` is `None` when the process was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: Option<i32>,
}

impl ExitStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signalled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

/// Spawns scheduler commands.
pub trait ProcessRunner {
    type Process: SchedulerProcess;

    /// Start `program` with `args`. Does not wait for it.
    fn spawn(&self, program: &Utf8Path, args: &[&str]) -> Result<Self::Process, CommandError>;
}

/// A running (or finished) scheduler command.
///
/// A zero timeout never waits: it only succeeds if the process has already
/// finished and its output was collected.
#[async_trait]
pub trait SchedulerProcess: Send {
    /// Command line, used in error messages.
    fn command(&self) -> &str;

    /// Read the complete stdout text.
    async fn read_text(&mut self, timeout: Duration) -> Result<String, CommandError>;

    /// Wait for the exit status.
    async fn wait_status(&mut self, timeout: Duration) -> Result<ExitStatus, CommandError>;

    /// Stderr text collected so far.
    fn stderr(&self) -> &str;

    /// Wait for the exit status and turn a non-zero exit into an error.
    async fn status_raise(&mut self, timeout: Duration) -> Result<(), CommandError> {
        let status = self.wait_status(timeout).await?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: self.command().to_string(),
                code: status.code().unwrap_or(-1),
                stderr: self.stderr().trim().to_string(),
            })
        }
    }
}

/// Run a command to completion and return its stdout.
///
/// The output is only returned once the command exited successfully.
pub async fn run_command<R: ProcessRunner>(
    runner: &R,
    program: &Utf8Path,
    args: &[&str],
    timeout: Duration,
) -> Result<String, CommandError> {
    let mut process = runner.spawn(program, args)?;
    let stdout = process.read_text(timeout).await?;
    process.status_raise(Duration::ZERO).await?;
    Ok(stdout)
}

/// Render a program and its arguments as a single command line.
pub fn command_line(program: &Utf8Path, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs commands as local tokio child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
    type Process = TokioProcess;

    fn spawn(&self, program: &Utf8Path, args: &[&str]) -> Result<TokioProcess, CommandError> {
        let command = command_line(program, args);
        tracing::debug!("Spawning {}", command);

        let mut child = Command::new(program.as_std_path())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::Execution {
                command: command.clone(),
                error: e.to_string(),
            })?;

        Ok(TokioProcess {
            command,
            stdout_pipe: child.stdout.take(),
            stderr_pipe: child.stderr.take(),
            child,
            stdout: Vec::new(),
            stderr: Vec::new(),
            stderr_text: String::new(),
            collected: false,
            status: None,
        })
    }
}

/// Child process handle returned by [`TokioRunner`].
///
/// Output read before a timeout is kept, so a later call continues where
/// the previous one stopped.
pub struct TokioProcess {
    command: String,
    child: Child,
    stdout_pipe: Option<ChildStdout>,
    stderr_pipe: Option<ChildStderr>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    stderr_text: String,
    collected: bool,
    status: Option<ExitStatus>,
}

impl TokioProcess {
    fn timeout_error(&self, timeout: Duration) -> CommandError {
        CommandError::Timeout {
            command: self.command.clone(),
            timeout,
        }
    }

    /// Read both pipes to the end and wait for the exit status.
    async fn collect(&mut self, timeout: Duration) -> Result<(), CommandError> {
        if self.collected {
            return Ok(());
        }
        if timeout.is_zero() {
            return Err(self.timeout_error(timeout));
        }

        let Self {
            child,
            stdout_pipe,
            stderr_pipe,
            stdout,
            stderr,
            status,
            ..
        } = &mut *self;
        let collect = async {
            let (out_res, err_res) =
                tokio::join!(drain(stdout_pipe, stdout), drain(stderr_pipe, stderr));
            out_res?;
            err_res?;
            match status {
                Some(status) => Ok::<_, std::io::Error>(*status),
                None => child.wait().await.map(exit_status),
            }
        };

        let result = tokio::time::timeout(timeout, collect).await;
        match result {
            Err(_) => Err(self.timeout_error(timeout)),
            Ok(Err(e)) => Err(CommandError::Execution {
                command: self.command.clone(),
                error: e.to_string(),
            }),
            Ok(Ok(status)) => {
                self.status = Some(status);
                self.stderr_text = String::from_utf8_lossy(&self.stderr).into_owned();
                self.collected = true;
                Ok(())
            }
        }
    }
}

fn exit_status(status: std::process::ExitStatus) -> ExitStatus {
    match status.code() {
        Some(code) => ExitStatus::from_code(code),
        None => ExitStatus::signalled(),
    }
}

/// Append everything left in `pipe` to `buf`, then close the pipe.
///
/// Each chunk is stored as soon as it is read, so cancelling the future
/// loses nothing.
async fn drain<R: AsyncRead + Unpin>(
    pipe: &mut Option<R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<()> {
    let Some(reader) = pipe.as_mut() else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    *pipe = None;
    Ok(())
}

#[async_trait]
impl SchedulerProcess for TokioProcess {
    fn command(&self) -> &str {
        &self.command
    }

    async fn read_text(&mut self, timeout: Duration) -> Result<String, CommandError> {
        self.collect(timeout).await?;
        Ok(String::from_utf8_lossy(&self.stdout).into_owned())
    }

    async fn wait_status(&mut self, timeout: Duration) -> Result<ExitStatus, CommandError> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        if timeout.is_zero() {
            // Only check whether it already exited, output stays unread
            return match self.child.try_wait() {
                Ok(Some(status)) => {
                    let status = exit_status(status);
                    self.status = Some(status);
                    Ok(status)
                }
                Ok(None) => Err(self.timeout_error(timeout)),
                Err(e) => Err(CommandError::Execution {
                    command: self.command.clone(),
                    error: e.to_string(),
                }),
            };
        }
        self.collect(timeout).await?;
        self.status.ok_or_else(|| self.timeout_error(timeout))
    }

    fn stderr(&self) -> &str {
        &self.stderr_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_run_command_success() {
        let result = run_command(&TokioRunner, Utf8Path::new("echo"), &["hello"], TIMEOUT)
            .await
            .unwrap();
        assert_eq!(result.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_not_found() {
        let result = run_command(
            &TokioRunner,
            Utf8Path::new("nonexistent_command_12345"),
            &[],
            TIMEOUT,
        )
        .await;
        assert!(matches!(result, Err(CommandError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let result = run_command(
            &TokioRunner,
            Utf8Path::new("sh"),
            &["-c", "echo oops >&2; exit 3"],
            TIMEOUT,
        )
        .await;
        match result {
            Err(CommandError::Failed { code, stderr, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_text_timeout() {
        let mut process = TokioRunner
            .spawn(Utf8Path::new("sleep"), &["5"])
            .unwrap();
        let result = process.read_text(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(CommandError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_read_text_resumes_after_timeout() {
        let mut process = TokioRunner
            .spawn(Utf8Path::new("sh"), &["-c", "printf 'par'; sleep 0.3; echo tial"])
            .unwrap();
        let first = process.read_text(Duration::from_millis(50)).await;
        assert!(matches!(first, Err(CommandError::Timeout { .. })));
        assert_eq!(process.read_text(TIMEOUT).await.unwrap(), "partial\n");
        assert!(process.wait_status(Duration::ZERO).await.unwrap().success());
    }

    #[tokio::test]
    async fn test_wait_status_then_read() {
        let mut process = TokioRunner
            .spawn(Utf8Path::new("sh"), &["-c", "sleep 0.3; echo payload; exit 4"])
            .unwrap();
        let first = process.wait_status(Duration::from_millis(50)).await;
        assert!(matches!(first, Err(CommandError::Timeout { .. })));
        assert_eq!(
            process.wait_status(TIMEOUT).await.unwrap(),
            ExitStatus::from_code(4)
        );
        assert_eq!(
            process.read_text(Duration::ZERO).await.unwrap(),
            "payload\n"
        );
    }

    #[tokio::test]
    async fn test_status_after_read() {
        let mut process = TokioRunner
            .spawn(Utf8Path::new("sh"), &["-c", "printf 'a\\nb\\n'"])
            .unwrap();
        assert_eq!(process.read_text(TIMEOUT).await.unwrap(), "a\nb\n");
        let status = process.wait_status(Duration::ZERO).await.unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            command_line(Utf8Path::new("/opt/sge/bin/qconf"), &["-sq", "all.q"]),
            "/opt/sge/bin/qconf -sq all.q"
        );
    }
}
