//! Concrete implementation of the `PTYProcess` capability the factory is
//! built on: spawn a child under a controlling PTY, read its output on a
//! background thread into a shared buffer, match prompt patterns against
//! that buffer with a timeout, write input, and track liveness/exit status.
//!
//! Structurally this is the teacher's `PtyManager`/`PtySession` pair
//! (`planterd::pty`, `planter_execd::pty`) narrowed from "one session per
//! open shell" to the single-process, single-command contract this crate
//! needs: no session registry, no sandboxing, just one PTY per `PtyProcess`.

use std::{
    collections::BTreeMap,
    io::{Read, Write},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use portable_pty::{Child, CommandBuilder, ExitStatus, MasterPty, PtySize, native_pty_system};
use regex::Regex;
use shellmux_core::{ErrorCode, ShellMuxError};

/// One prompt pattern recognized by a caller's dialog loop, identified by its
/// position in the ordered pattern list passed to [`PtyProcess::find`].
pub struct PromptMatch {
    pub index: usize,
    pub text: String,
}

/// A live PTY-backed child process.
pub struct PtyProcess {
    writer: Mutex<Box<dyn Write + Send>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Mutex<Box<dyn Child + Send>>,
    buffer: Arc<Mutex<Vec<u8>>>,
    complete: Arc<AtomicBool>,
    exit_code: Arc<Mutex<Option<i32>>>,
    command_line: String,
    /// Read cursor into `buffer` consumed by [`Self::find`], advanced past
    /// each returned match so a later call never re-matches output a caller
    /// already saw (pexpect/original `find` consume semantics).
    scan_offset: Mutex<usize>,
}

impl PtyProcess {
    /// Spawns `program` with `args` under a fresh PTY, with `env` as its
    /// complete environment (callers pass `TERM=vt100` etc. explicitly; the
    /// child does not inherit the parent's environment, matching the
    /// original's `/usr/bin/env TERM=vt100 ...` prefix convention).
    pub fn spawn(
        program: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self, ShellMuxError> {
        let command_line = render_command_line(program, args);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 40,
                cols: 120,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|err| pty_error("open pty", err.to_string()))?;

        let mut command = CommandBuilder::new(program);
        for arg in args {
            command.arg(arg);
        }
        command.env_clear();
        for (key, value) in env {
            command.env(key, value);
        }

        let child = pair.slave.spawn_command(command).map_err(|err| {
            pty_error(
                &format!("spawn pty command: {command_line}"),
                err.to_string(),
            )
        })?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| pty_error("clone pty reader", err.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| pty_error("take pty writer", err.to_string()))?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let complete = Arc::new(AtomicBool::new(false));
        let exit_code = Arc::new(Mutex::new(None));

        spawn_reader_thread(Arc::clone(&buffer), Arc::clone(&complete), reader);

        tracing::debug!(command = %command_line, "spawned pty process");

        Ok(Self {
            writer: Mutex::new(writer),
            master: Mutex::new(pair.master),
            child: Mutex::new(child),
            buffer,
            complete,
            exit_code,
            command_line,
            scan_offset: Mutex::new(0),
        })
    }

    /// Attempts to match any of `patterns` against buffered output within
    /// `timeout`, polling the shared buffer. Returns the first pattern that
    /// matches along with the matched line, or `None` on timeout.
    ///
    /// A match consumes the buffer up to and including it: the persistent
    /// `scan_offset` advances past the match so a later call starts scanning
    /// just after it, instead of re-matching the same unanchored text (e.g. a
    /// host-key prompt) forever.
    pub fn find(
        &self,
        patterns: &[Regex],
        timeout: Duration,
    ) -> Result<Option<PromptMatch>, ShellMuxError> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let buffer = self
                    .buffer
                    .lock()
                    .map_err(|_| lock_error("pty buffer lock poisoned"))?;
                let mut scan_offset = self
                    .scan_offset
                    .lock()
                    .map_err(|_| lock_error("pty scan offset lock poisoned"))?;
                let start = (*scan_offset).min(buffer.len());
                let text = String::from_utf8_lossy(&buffer[start..]);

                let mut best: Option<(usize, usize, usize, String)> = None;
                for (index, pattern) in patterns.iter().enumerate() {
                    if let Some(found) = pattern.find(&text) {
                        let candidate = (found.start(), index, found.end(), found.as_str());
                        if best
                            .as_ref()
                            .is_none_or(|(best_start, _, _, _)| candidate.0 < *best_start)
                        {
                            best = Some((
                                candidate.0,
                                candidate.1,
                                candidate.2,
                                candidate.3.to_string(),
                            ));
                        }
                    }
                }

                if let Some((_, index, end, text)) = best {
                    *scan_offset = start + end;
                    return Ok(Some(PromptMatch { index, text }));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Writes raw bytes to the child's controlling terminal.
    pub fn write(&self, data: &[u8]) -> Result<(), ShellMuxError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| lock_error("pty writer lock poisoned"))?;
        writer
            .write_all(data)
            .map_err(|err| pty_error("write pty input", err.to_string()))?;
        writer
            .flush()
            .map_err(|err| pty_error("flush pty input", err.to_string()))
    }

    /// Blocks until the child exits, recording its exit code.
    pub fn wait(&self) -> Result<i32, ShellMuxError> {
        let mut child = self
            .child
            .lock()
            .map_err(|_| lock_error("pty child lock poisoned"))?;
        let status: ExitStatus = child
            .wait()
            .map_err(|err| pty_error("wait for pty child", err.to_string()))?;
        let code = status.exit_code() as i32;
        *self
            .exit_code
            .lock()
            .map_err(|_| lock_error("pty exit code lock poisoned"))? = Some(code);
        Ok(code)
    }

    /// Reports whether the child is still alive. When `recover` is set and
    /// the child has exited, this still reports the current (dead) state —
    /// recovery in this factory means "the caller should build a new master",
    /// not in-place process revival, since a dead ssh master cannot be
    /// resurrected without re-authenticating.
    pub fn alive(&self, _recover: bool) -> bool {
        if self.complete.load(Ordering::Relaxed) {
            return false;
        }
        let Ok(mut child) = self.child.lock() else {
            return false;
        };
        matches!(child.try_wait(), Ok(None))
    }

    /// Forcefully terminates the child process.
    pub fn kill(&self) -> Result<(), ShellMuxError> {
        let mut child = self
            .child
            .lock()
            .map_err(|_| lock_error("pty child lock poisoned"))?;
        child
            .kill()
            .map_err(|err| pty_error("kill pty process", err.to_string()))
    }

    /// Resizes the PTY terminal dimensions.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), ShellMuxError> {
        let master = self
            .master
            .lock()
            .map_err(|_| lock_error("pty master lock poisoned"))?;
        master
            .resize(PtySize {
                rows: rows.max(1),
                cols: cols.max(1),
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|err| pty_error("resize pty", err.to_string()))
    }

    /// Returns the trailing `max_bytes` of captured output, used to annotate
    /// copy-failure errors with the last lines the remote tool printed.
    pub fn cache_tail(&self, max_bytes: usize) -> Vec<u8> {
        let Ok(buffer) = self.buffer.lock() else {
            return Vec::new();
        };
        let start = buffer.len().saturating_sub(max_bytes);
        buffer[start..].to_vec()
    }

    /// The rendered command line used to spawn this process, for logging.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Returns output captured since `offset` along with the buffer's new
    /// length, for callers that want to stream output incrementally (e.g. an
    /// interactive CLI) rather than matching against it.
    pub fn output_since(&self, offset: usize) -> (Vec<u8>, usize) {
        let Ok(buffer) = self.buffer.lock() else {
            return (Vec::new(), offset);
        };
        let start = offset.min(buffer.len());
        (buffer[start..].to_vec(), buffer.len())
    }
}

fn spawn_reader_thread(
    buffer: Arc<Mutex<Vec<u8>>>,
    complete: Arc<AtomicBool>,
    mut reader: Box<dyn Read + Send>,
) {
    std::thread::spawn(move || {
        let mut buf = [0_u8; 4096];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut bytes) = buffer.lock() {
                        bytes.extend_from_slice(&buf[..n]);
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }

        complete.store(true, Ordering::Relaxed);
    });
}

fn render_command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn pty_error(action: &str, detail: String) -> ShellMuxError {
    ShellMuxError::with_detail(ErrorCode::NoSuccess, action, detail)
}

fn lock_error(message: &str) -> ShellMuxError {
    ShellMuxError::new(ErrorCode::NoSuccess, message)
}
