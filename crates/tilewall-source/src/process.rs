//! Decoder subprocess lifecycle
//!
//! [`DecoderProcess`] owns one running decoder and guarantees it is killed
//! and reaped when dropped. A producer parks its process in a
//! [`ProcessSlot`] so that a stop request from another thread can
//! terminate it, which closes the output pipe and unblocks the producer's
//! read.
//!
//! [`DecoderProbe`] answers "is the decoder installed?" and caches the
//! answer for a while so that bursts of start requests do not each fork a
//! probe.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, SourceError};

/// How long a `-version` probe may run before the decoder is assumed present
const PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// How long a probe result stays valid
const PROBE_CACHE_TTL: Duration = Duration::from_secs(30);

const PROBE_POLL: Duration = Duration::from_millis(25);

/// A running decoder subprocess
///
/// Dropping the guard force-kills the process and waits for it.
#[derive(Debug)]
pub struct DecoderProcess {
    child: Child,
    label: String,
}

impl DecoderProcess {
    /// Launch `binary` with `args`, capturing stdout and stderr
    ///
    /// Returns the guard plus the two output pipes. The caller reads frames
    /// from stdout and must keep stderr drained (see [`drain_stderr`]).
    pub fn spawn(
        binary: &str,
        args: &[String],
        label: impl Into<String>,
    ) -> Result<(Self, ChildStdout, ChildStderr)> {
        let label = label.into();
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::DecoderSpawn(format!("{}: {}", binary, e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut process = Self { child, label };
        match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => {
                debug!("{}: decoder started (pid {})", process.label, process.id());
                Ok((process, stdout, stderr))
            }
            _ => {
                process.kill();
                Err(SourceError::DecoderSpawn(format!(
                    "{}: output pipes unavailable",
                    binary
                )))
            }
        }
    }

    /// OS process id
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Force-kill and reap the process
    ///
    /// Safe to call more than once.
    pub fn kill(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("{}: decoder already exited with {}", self.label, status);
                return;
            }
            Ok(None) => {}
            Err(e) => debug!("{}: could not poll decoder: {}", self.label, e),
        }
        if let Err(e) = self.child.kill() {
            debug!("{}: kill failed: {}", self.label, e);
        }
        if let Err(e) = self.child.wait() {
            warn!("{}: failed to reap decoder: {}", self.label, e);
        }
    }
}

impl Drop for DecoderProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Shared home for a producer's current decoder process
///
/// Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct ProcessSlot {
    inner: Arc<Mutex<Option<DecoderProcess>>>,
}

impl ProcessSlot {
    /// Create an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a process in the slot, killing any previous occupant
    pub fn install(&self, process: DecoderProcess) {
        let previous = self.inner.lock().replace(process);
        drop(previous);
    }

    /// Kill and remove the current process, if any
    pub fn terminate(&self) {
        let process = self.inner.lock().take();
        drop(process);
    }

    /// Whether a process is parked
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.inner.lock().is_some()
    }
}

/// Forward a decoder's stderr to the log on a helper thread
///
/// The pipe must be drained or a chatty decoder blocks on a full buffer.
/// The thread ends when the process closes stderr.
pub fn drain_stderr(stderr: ChildStderr, label: String) {
    let spawned = thread::Builder::new()
        .name(format!("{}-stderr", label))
        .spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines() {
                match line {
                    Ok(line) if !line.trim().is_empty() => debug!("{}: decoder: {}", label, line),
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start stderr drain thread: {}", e);
    }
}

/// Cached decoder availability check
#[derive(Debug)]
pub struct DecoderProbe {
    binary: String,
    cached: Mutex<Option<(bool, Instant)>>,
}

impl DecoderProbe {
    /// Create a probe for `binary`
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            cached: Mutex::new(None),
        }
    }

    /// Decoder binary being probed
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Whether the decoder can be run
    ///
    /// Runs `<binary> -version`. A clean exit means available, a failed
    /// exit or launch error means unavailable, and a probe still running
    /// after 1.5s is killed and counted as available. The answer is cached
    /// for 30 seconds.
    pub fn is_available(&self) -> bool {
        let mut cached = self.cached.lock();
        if let Some((available, at)) = *cached {
            if at.elapsed() < PROBE_CACHE_TTL {
                return available;
            }
        }
        let available = self.run_probe();
        *cached = Some((available, Instant::now()));
        available
    }

    /// Fail with [`SourceError::DecoderUnavailable`] unless the decoder runs
    pub fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SourceError::DecoderUnavailable(self.binary.clone()))
        }
    }

    /// Forget the cached answer
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    fn run_probe(&self) -> bool {
        let mut child = match Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!("Decoder probe for '{}' failed to launch: {}", self.binary, e);
                return false;
            }
        };

        let deadline = Instant::now() + PROBE_TIMEOUT;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) if Instant::now() >= deadline => {
                    debug!("Decoder probe for '{}' timed out, assuming present", self.binary);
                    let _ = child.kill();
                    let _ = child.wait();
                    return true;
                }
                Ok(None) => thread::sleep(PROBE_POLL),
                Err(e) => {
                    debug!("Decoder probe for '{}' could not be polled: {}", self.binary, e);
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
            }
        }
    }
}
