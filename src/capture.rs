//! Transcript capture.
//!
//! Spawns the target, feeds it a scripted session on stdin and collects
//! everything it prints, bounded by a wall-clock deadline.
//!
//! Input is written from its own thread and each output stream is drained by
//! its own reader thread, so the child can never block on a full pipe while
//! the harness is blocked on the other end.

use crate::case::Verdict;
use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long the driver waits for output before re-polling the child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const READ_CHUNK: usize = 8192;

/// The input of one session: one command per line, ending in a shutdown
/// directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandScript {
    lines: Vec<String>,
}

impl CommandScript {
    /// Build a script from `commands`, terminated by `shutdown`.
    pub fn new<I, S>(commands: I, shutdown: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines: Vec<String> = commands.into_iter().map(Into::into).collect();
        lines.push(shutdown.to_string());
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The bytes sent to the target: lines joined by `\n`, with a trailing `\n`.
    pub fn render(&self) -> String {
        let mut input = self.lines.join("\n");
        input.push('\n');
        input
    }
}

/// Everything the target printed, plus how it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub stdout: String,
    pub stderr: String,
    /// Exit code if the process exited normally.
    pub exit_code: Option<i32>,
    /// Signal number if the process was terminated by a signal (Unix only).
    pub signal: Option<i32>,
}

impl Transcript {
    /// Stdout followed by stderr, for checks where either stream will do.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }

    pub fn describe_exit(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("signal {signal}"),
            (None, None) => "unknown exit status".to_string(),
        }
    }
}

/// Raw result of one capture call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The target exited on its own before the deadline.
    Completed(Transcript),
    /// The deadline elapsed first; the target was killed and reaped.
    TimedOut { after: Duration },
    /// The target could not be started (or could not be driven at all).
    SpawnFailed(String),
}

impl ExecutionOutcome {
    /// Classify a finished process from its exit status and raw output.
    pub fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        ExecutionOutcome::Completed(Transcript {
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            exit_code: status.code(),
            signal,
        })
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            ExecutionOutcome::Completed(transcript) => Some(transcript),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ExecutionOutcome::TimedOut { .. })
    }

    /// Turn the outcome into a verdict.
    ///
    /// Only a completed transcript reaches `check`; a timeout or a spawn
    /// failure is a `Fail` with a fixed diagnostic naming which one happened.
    pub fn into_verdict<F>(self, check: F) -> Verdict
    where
        F: FnOnce(&Transcript) -> Verdict,
    {
        match self {
            ExecutionOutcome::Completed(transcript) => check(&transcript),
            ExecutionOutcome::TimedOut { after } => Verdict::fail(
                format!("target to exit within {:.1}s", after.as_secs_f64()),
                format!("target timed out after {:.1}s", after.as_secs_f64()),
            ),
            ExecutionOutcome::SpawnFailed(message) => Verdict::fail(
                "target to start",
                format!("target failed to start: {message}"),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

enum Chunk {
    Data(Stream, Vec<u8>),
    Eof,
}

/// Run `program` with `args`, feed it `script` and wait at most `deadline`.
///
/// Never panics and never returns an error: every way the session can go
/// wrong is one of the [`ExecutionOutcome`] variants.
pub fn capture(
    program: &Path,
    args: &[String],
    script: &CommandScript,
    deadline: Duration,
) -> ExecutionOutcome {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Own process group, so a timeout can take down everything the target
    // started in that group as well.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!(program = %program.display(), error = %e, "failed to spawn target");
            return ExecutionOutcome::SpawnFailed(format!(
                "failed to spawn {}: {e}",
                program.display()
            ));
        }
    };
    debug!(
        pid = child.id(),
        lines = script.lines().len(),
        deadline_ms = deadline.as_millis() as u64,
        "target spawned"
    );

    let (tx, rx) = unbounded();
    let mut open_streams = 0;
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(Stream::Stdout, stdout, tx.clone());
        open_streams += 1;
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(Stream::Stderr, stderr, tx.clone());
        open_streams += 1;
    }
    drop(tx);
    if let Some(stdin) = child.stdin.take() {
        spawn_writer(stdin, script.render());
    }

    let start = Instant::now();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exited: Option<ExitStatus> = None;

    loop {
        if exited.is_none() {
            match child.try_wait() {
                Ok(status) => exited = status,
                Err(e) => {
                    terminate(&mut child);
                    return ExecutionOutcome::SpawnFailed(format!(
                        "failed to wait for {}: {e}",
                        program.display()
                    ));
                }
            }
        }

        if let Some(status) = exited
            && open_streams == 0
        {
            debug!(
                ?status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "target finished"
            );
            return ExecutionOutcome::from_status(status, &stdout, &stderr);
        }

        let elapsed = start.elapsed();
        if elapsed >= deadline {
            match exited {
                None => {
                    warn!(
                        program = %program.display(),
                        deadline_ms = deadline.as_millis() as u64,
                        "target timed out, killing it"
                    );
                    terminate(&mut child);
                    return ExecutionOutcome::TimedOut { after: deadline };
                }
                Some(status) => {
                    // The target is gone but something it started still
                    // holds an output pipe. Keep what we have.
                    warn!(
                        program = %program.display(),
                        "target exited with its output held open, killing its group"
                    );
                    kill_process_group(child.id());
                    return ExecutionOutcome::from_status(status, &stdout, &stderr);
                }
            }
        }

        let wait = POLL_INTERVAL.min(deadline - elapsed);
        if open_streams == 0 {
            // Both pipes are closed; only the exit status is left to wait for.
            thread::sleep(wait);
            continue;
        }
        match rx.recv_timeout(wait) {
            Ok(Chunk::Data(Stream::Stdout, bytes)) => stdout.extend_from_slice(&bytes),
            Ok(Chunk::Data(Stream::Stderr, bytes)) => stderr.extend_from_slice(&bytes),
            Ok(Chunk::Eof) => open_streams -= 1,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => open_streams = 0,
        }
    }
}

fn spawn_reader<R>(stream: Stream, mut pipe: R, tx: Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Chunk::Data(stream, buf[..n].to_vec())).is_err() {
                        // The driver gave up on this session.
                        return;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(?stream, error = %e, "read from target failed");
                    break;
                }
            }
        }
        let _ = tx.send(Chunk::Eof);
    });
}

fn spawn_writer(mut stdin: ChildStdin, input: String) {
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            // The target stopped reading (usually it already exited). Its
            // exit decides the outcome, not this write.
            debug!(error = %e, "target closed stdin before the script was fully written");
        }
        // Dropping stdin closes the pipe: end of input.
    });
}

/// Kill the target and its process group, then reap it.
fn terminate(child: &mut Child) {
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(pid, error = %e, "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
