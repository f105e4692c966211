//! xorriso process execution
//!
//! Runs the xorriso binary with packet output enabled, either buffered
//! (short queries) or streaming (burns, blanking, verification). Standard
//! error shares one OS pipe with standard output, so the lines arrive in the
//! order the tool wrote them.
//!
//! One executor runs one child at a time. A second call waits on the
//! invocation lock until the first has finished, whatever kind of call it is.

use serde::Serialize;
use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep_until, Instant};

use super::cancel::CancelToken;
use super::command::CommandBuilder;
use super::packet::{parse_line, parse_output, ChannelLines, Channel, ClassifiedLine};
use super::progress::{ProgressExtractor, ProgressRules, ProgressUpdate};
use crate::error::ExecError;

/// How long a child gets to exit after SIGTERM before it is killed
const TERM_GRACE: Duration = Duration::from_secs(5);

/// Lines buffered between the pipe reader and the dispatcher
const LINE_QUEUE_DEPTH: usize = 256;

/// Everything an invocation produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub result_lines: Vec<String>,
    pub info_lines: Vec<String>,
    pub mark_lines: Vec<String>,
    /// Process exit code, -1 if it was ended by a signal
    pub exit_code: i32,
    pub raw_output: String,
}

impl ProcessOutcome {
    fn from_lines(lines: ChannelLines, exit_code: i32, raw_output: String) -> Self {
        Self {
            result_lines: lines.result_lines,
            info_lines: lines.info_lines,
            mark_lines: lines.mark_lines,
            exit_code,
            raw_output,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty Info line, trimmed
    pub fn last_info_line(&self) -> Option<&str> {
        self.info_lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}

/// Upper bound for one invocation: a timeout, a cancel token, or both
///
/// There is deliberately no unbounded constructor.
#[derive(Debug, Clone)]
pub struct RunLimits {
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl RunLimits {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn cancel(token: CancelToken) -> Self {
        Self {
            timeout: None,
            cancel: Some(token),
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Why an invocation was asked to stop early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    TimedOut,
    Cancelled,
}

async fn expired(deadline: Option<Instant>, cancel: Option<&CancelToken>) -> Expiry {
    let timed_out = async {
        match deadline {
            Some(d) => sleep_until(d).await,
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = cancelled => Expiry::Cancelled,
        _ = timed_out => Expiry::TimedOut,
    }
}

/// What the streaming sink is told about, in output order
#[derive(Debug, Clone, Copy)]
pub enum StreamEvent<'a> {
    Line(&'a ClassifiedLine),
    Progress(&'a ProgressUpdate),
}

/// Runs xorriso, one invocation at a time
#[derive(Debug)]
pub struct Executor {
    binary: PathBuf,
    extractor: ProgressExtractor,
    invocation: Mutex<()>,
}

impl Executor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_rules(binary, ProgressRules::default())
    }

    pub fn with_rules(binary: impl Into<PathBuf>, rules: ProgressRules) -> Self {
        Self {
            binary: binary.into(),
            extractor: ProgressExtractor::new(rules),
            invocation: Mutex::new(()),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Resolve the binary to an executable file without running it
    pub fn check_binary(&self) -> Result<PathBuf, ExecError> {
        let found = if self.binary.components().count() > 1 {
            is_executable(&self.binary).then(|| self.binary.clone())
        } else {
            self.binary.to_str().and_then(find_in_path)
        };

        found.ok_or_else(|| ExecError::Start {
            binary: self.binary.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found or not executable"),
        })
    }

    /// Run to completion and return the parsed output
    pub async fn run(&self, args: Vec<String>, limits: RunLimits) -> Result<ProcessOutcome, ExecError> {
        let _guard = self.invocation.lock().await;

        let full_args = with_pkt_output(args);
        let mut raw = String::new();
        let exit_code = self
            .invoke(&full_args, &limits, |line| raw.push_str(&line))
            .await?;

        let lines = parse_output(&raw);
        Ok(ProcessOutcome::from_lines(lines, exit_code, raw))
    }

    /// Run while handing every decoded line and progress update to `sink`
    ///
    /// # Arguments
    /// * `args` - xorriso arguments; `-pkt_output on` is put in front of them
    /// * `limits` - Timeout and/or cancel token that ends the run early
    /// * `sink` - Called with each protocol line, and after an Info line with
    ///   the progress it carried, before the next line is read
    ///
    /// # Returns
    /// * `Ok(ProcessOutcome)` once the child exits, whatever its exit code
    /// * `Err(ExecError::Start)` if the binary could not be launched
    /// * `Err(ExecError::Pipe)` if reading the output failed; the child is killed
    pub async fn run_streaming<F>(
        &self,
        args: Vec<String>,
        limits: RunLimits,
        mut sink: F,
    ) -> Result<ProcessOutcome, ExecError>
    where
        F: FnMut(StreamEvent<'_>),
    {
        let _guard = self.invocation.lock().await;

        let full_args = with_pkt_output(args);
        let mut lines = ChannelLines::default();
        let mut raw_lines: Vec<String> = Vec::new();

        let exit_code = self
            .invoke(&full_args, &limits, |raw| {
                raw_lines.push(raw.trim_end_matches(['\n', '\r']).to_string());

                // Non-protocol lines only go to raw output
                let Some(line) = parse_line(&raw) else {
                    return;
                };
                sink(StreamEvent::Line(&line));
                if line.channel == Channel::Info
                    && let Some(update) = self.extractor.extract(&line.text)
                {
                    sink(StreamEvent::Progress(&update));
                }
                lines.push(line);
            })
            .await?;

        Ok(ProcessOutcome::from_lines(lines, exit_code, raw_lines.join("\n")))
    }

    /// xorriso's version banner, trimmed
    pub async fn version(&self, timeout: Duration) -> Result<String, ExecError> {
        let _guard = self.invocation.lock().await;

        let mut raw = String::new();
        let limits = RunLimits::timeout(timeout);
        self.invoke(&["--version".to_string()], &limits, |line| raw.push_str(&line))
            .await?;
        Ok(raw.trim().to_string())
    }

    /// Spawn the child and feed its raw output lines to `on_line`
    ///
    /// Returns the exit code. Callers hold the invocation lock.
    async fn invoke<F>(&self, args: &[String], limits: &RunLimits, mut on_line: F) -> Result<i32, ExecError>
    where
        F: FnMut(String),
    {
        log::debug!("Running {} {}", self.binary.display(), args.join(" "));

        let (mut child, reader) = self.spawn_merged(args)?;

        let (tx, mut rx) = mpsc::channel(LINE_QUEUE_DEPTH);
        tokio::task::spawn_blocking(move || forward_lines(reader, tx));

        let deadline = limits.timeout.map(|t| Instant::now() + t);
        let mut kill_at: Option<Instant> = None;
        let mut lines_open = true;

        let status = loop {
            tokio::select! {
                msg = rx.recv(), if lines_open => match msg {
                    Some(Ok(raw)) => on_line(raw),
                    Some(Err(e)) => {
                        log::error!("Lost xorriso output: {}", e);
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return Err(ExecError::Pipe(e));
                    }
                    None => lines_open = false,
                },
                status = child.wait(), if !lines_open => {
                    break status.map_err(ExecError::Pipe)?;
                }
                why = expired(deadline, limits.cancel.as_ref()), if kill_at.is_none() => {
                    match why {
                        Expiry::Cancelled => log::info!("Cancelling xorriso"),
                        Expiry::TimedOut => log::warn!("xorriso timed out, terminating"),
                    }
                    request_termination(&mut child);
                    kill_at = Some(Instant::now() + TERM_GRACE);
                }
                _ = sleep_until(kill_at.unwrap_or_else(Instant::now)), if kill_at.is_some() => {
                    log::warn!("xorriso ignored termination, killing");
                    let _ = child.start_kill();
                    // Far enough out that this branch does not fire again
                    kill_at = Some(Instant::now() + Duration::from_secs(86_400));
                }
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        log::info!("xorriso exited with code {}", exit_code);
        Ok(exit_code)
    }

    /// Spawn with stdout and stderr on the same pipe
    fn spawn_merged(&self, args: &[String]) -> Result<(Child, PipeReader), ExecError> {
        let start_error = |source: io::Error| ExecError::Start {
            binary: self.binary.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(start_error)?;
        let writer_err = writer.try_clone().map_err(start_error)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(start_error)?;
        // Our copies of the write end must close, or the reader never sees EOF
        drop(cmd);

        Ok((child, reader))
    }
}

fn with_pkt_output(args: Vec<String>) -> Vec<String> {
    let mut full = CommandBuilder::new().pkt_output().build();
    full.extend(args);
    full
}

/// Blocking pump from the pipe into the line queue
///
/// A read error is queued after the lines read before it, then the pump stops.
fn forward_lines<R: Read>(reader: R, tx: mpsc::Sender<io::Result<String>>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.blocking_send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    // `id()` is None once the child has been reaped, so the pid is still ours
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    let _ = child.start_kill();
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Look up an executable by name on PATH
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}
