//! Background frame producers
//!
//! A producer is one OS thread that fills a [`FrameQueue`] from a still
//! frame sequence, a video file or a live stream. The thread owns its
//! decoder process through a [`ProcessSlot`], so stopping is a matter of
//! clearing the running flag and killing whatever sits in the slot.
//!
//! # Stopping
//!
//! [`ProducerHandle::stop`] never blocks indefinitely: it waits up to a
//! grace period for the thread to notice, then detaches it. A detached
//! thread still exits on its own once its current read returns, and it
//! only ever touches the queue it was started with.
//!
//! # Capacity
//!
//! | Source   | Policy                                              |
//! |----------|-----------------------------------------------------|
//! | Sequence | waits while the queue holds `capacity` frames       |
//! | Video    | waits while the queue holds `capacity` frames       |
//! | Live     | never waits; drops the oldest frames over the limit |

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tilewall_frame::{ColorLut, FrameQueue, GridSize};
use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::error::{Result, SourceError};
use crate::live::{self, LiveEvents};
use crate::process::ProcessSlot;
use crate::{sequence, video};

const STOP_POLL: Duration = Duration::from_millis(5);

/// Slice used when sleeping so a stop request is noticed quickly
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Which kind of source feeds a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Still frame files
    Sequence,
    /// Video file through the decoder
    Video,
    /// Network stream through the decoder
    Live,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequence => "sequence",
            Self::Video => "video",
            Self::Live => "live",
        })
    }
}

/// Still frames read in order
#[derive(Debug, Clone)]
pub struct SequenceSource {
    /// Frame files in playback order
    pub files: Vec<PathBuf>,
    /// Index of the first file to read
    pub start_index: usize,
    /// Wrap to the first file after the last
    pub looping: bool,
    /// Queue capacity the producer waits on
    pub capacity: usize,
}

/// A video file decoded at its native frame rate
#[derive(Debug, Clone)]
pub struct VideoSource {
    /// Video file
    pub file: PathBuf,
    /// Relaunch the decoder when the file ends
    pub looping: bool,
    /// Queue capacity the producer waits on
    pub capacity: usize,
}

/// A network stream decoded with reconnects
#[derive(Debug, Clone)]
pub struct LiveSource {
    /// Stream URL handed to the decoder
    pub url: String,
    /// Playback cadence; positive values add a decode fps filter
    pub ticks_per_frame: i32,
    /// Oldest frames beyond this many are dropped
    pub queue_limit: usize,
    /// Optional receiver of connection milestones
    pub events: Option<LiveEvents>,
}

/// What a producer reads from
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// Still frame files
    Sequence(SequenceSource),
    /// Video file
    Video(VideoSource),
    /// Live stream
    Live(LiveSource),
}

impl FrameSource {
    /// Kind of this source
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Sequence(_) => SourceKind::Sequence,
            Self::Video(_) => SourceKind::Video,
            Self::Live(_) => SourceKind::Live,
        }
    }

    /// Whether the source runs the external decoder
    #[must_use]
    pub fn needs_decoder(&self) -> bool {
        !matches!(self, Self::Sequence(_))
    }
}

/// Everything a producer needs besides its source
#[derive(Debug, Clone)]
pub struct ProducerContext {
    /// Owner id used in logs, thread names and dump file names
    pub owner: String,
    /// Surface grid the frames must fill
    pub grid: GridSize,
    /// Color table for RGB sources
    pub lut: Option<ColorLut>,
    /// Decoder and queue settings
    pub config: DecoderConfig,
}

/// State shared between a producer thread and its handle
#[derive(Debug, Clone)]
pub(crate) struct Worker {
    pub(crate) ctx: ProducerContext,
    pub(crate) queue: FrameQueue,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) slot: ProcessSlot,
}

impl Worker {
    pub(crate) fn new(ctx: ProducerContext, queue: FrameQueue) -> Self {
        Self {
            ctx,
            queue,
            running: Arc::new(AtomicBool::new(true)),
            slot: ProcessSlot::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Log prefix, `screen <owner>`
    pub(crate) fn label(&self) -> String {
        format!("screen {}", self.ctx.owner)
    }

    /// Block until the queue has room for another frame
    ///
    /// Returns `false` if the producer was stopped while waiting.
    pub(crate) fn wait_for_room(&self, capacity: usize) -> bool {
        let sleep = self.ctx.config.backpressure_sleep();
        while self.is_running() {
            if self.queue.has_room(capacity) {
                return true;
            }
            thread::sleep(sleep);
        }
        false
    }

    /// Sleep for `total`, waking early on stop
    ///
    /// Returns whether the producer is still running.
    pub(crate) fn sleep_while_running(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
        false
    }
}

/// Per-run bookkeeping for decoder-backed producers
#[derive(Debug)]
pub(crate) struct StreamState {
    pub(crate) started: Instant,
    pub(crate) truncation_logged: bool,
    pub(crate) first_frame: Option<Duration>,
    dump_path: Option<PathBuf>,
}

impl StreamState {
    pub(crate) fn new(worker: &Worker, kind: SourceKind) -> Self {
        let dump_path = worker.ctx.config.dump_dir.as_ref().map(|dir| {
            dir.join(format!("screen-{}-{}-first.rgb", worker.ctx.owner, kind))
        });
        Self {
            started: Instant::now(),
            truncation_logged: false,
            first_frame: None,
            dump_path,
        }
    }

    /// Write the first decoded RGB frame to the dump file, once
    pub(crate) fn dump_first(&mut self, rgb: &[u8]) {
        let Some(path) = self.dump_path.take() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Cannot create dump directory {}: {}", parent.display(), e);
                return;
            }
        }
        match fs::write(&path, rgb) {
            Ok(()) => info!("Wrote first frame dump {} ({} bytes)", path.display(), rgb.len()),
            Err(e) => warn!("Failed to write frame dump {}: {}", path.display(), e),
        }
    }

    /// Warn about a short frame read, once per run
    pub(crate) fn log_truncated(&mut self, label: &str, kind: SourceKind, read: usize, expected: usize) {
        if self.truncation_logged {
            return;
        }
        self.truncation_logged = true;
        warn!(
            "{} {} frame truncated: read={} expected={}; check the source or network",
            label, kind, read, expected
        );
    }
}

/// Handle to a running producer thread
#[derive(Debug)]
pub struct ProducerHandle {
    kind: SourceKind,
    worker: Worker,
    thread: Option<JoinHandle<()>>,
}

impl ProducerHandle {
    /// Start a producer thread filling `queue` from `source`
    ///
    /// Decoder-backed sources require `ctx.lut`.
    pub fn spawn(source: FrameSource, ctx: ProducerContext, queue: FrameQueue) -> Result<Self> {
        if source.needs_decoder() && ctx.lut.is_none() {
            return Err(SourceError::LutMissing);
        }

        let kind = source.kind();
        let worker = Worker::new(ctx, queue);
        let thread_worker = worker.clone();
        let thread = thread::Builder::new()
            .name(format!("tilewall-{}-{}", kind, worker.ctx.owner))
            .spawn(move || {
                debug!("{}: {} producer started", thread_worker.label(), kind);
                match source {
                    FrameSource::Sequence(s) => sequence::run(&thread_worker, &s),
                    FrameSource::Video(v) => video::run(&thread_worker, &v),
                    FrameSource::Live(l) => live::run(&thread_worker, &l),
                }
                thread_worker.slot.terminate();
                debug!("{}: {} producer finished", thread_worker.label(), kind);
            })?;

        Ok(Self {
            kind,
            worker,
            thread: Some(thread),
        })
    }

    /// Source kind
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Queue this producer fills
    #[must_use]
    pub fn queue(&self) -> &FrameQueue {
        &self.worker.queue
    }

    /// Whether the thread has exited (source exhausted or stopped)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the producer, waiting at most `grace` for its thread
    ///
    /// Kills the decoder process, if any, before waiting. Safe to call more
    /// than once.
    pub fn stop(&mut self, grace: Duration) {
        self.signal_stop();
        let Some(thread) = self.thread.take() else {
            return;
        };

        let deadline = Instant::now() + grace;
        while !thread.is_finished() && Instant::now() < deadline {
            thread::sleep(STOP_POLL);
        }
        if thread.is_finished() {
            if thread.join().is_err() {
                warn!("{}: {} producer panicked", self.worker.label(), self.kind);
            }
        } else {
            warn!(
                "{}: {} producer did not stop within {:?}; detaching",
                self.worker.label(),
                self.kind,
                grace
            );
        }
    }

    fn signal_stop(&self) {
        self.worker.running.store(false, Ordering::SeqCst);
        self.worker.slot.terminate();
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Worker for owner `7` with default settings and a fresh queue
#[cfg(test)]
pub(crate) fn test_worker(grid: GridSize, lut: Option<ColorLut>) -> Worker {
    let ctx = ProducerContext {
        owner: "7".to_string(),
        grid,
        lut,
        config: DecoderConfig::default(),
    };
    Worker::new(ctx, FrameQueue::new())
}

/// Executable shell script standing in for the decoder
///
/// Each launch appends its arguments as one line to the returned log file,
/// then runs `body`.
#[cfg(all(test, unix))]
pub(crate) fn fake_decoder(dir: &std::path::Path, body: &str) -> (String, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("launches.log");
    let script = dir.join("fake-decoder.sh");
    let text = format!("#!/bin/sh\necho \"$*\" >> '{}'\n{}\n", log.display(), body);
    fs::write(&script, text).expect("write script");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");
    (script.display().to_string(), log)
}

/// Argument lines recorded by [`fake_decoder`]
#[cfg(all(test, unix))]
pub(crate) fn launches(log: &std::path::Path) -> Vec<String> {
    fs::read_to_string(log)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::Sequence.to_string(), "sequence");
        assert_eq!(SourceKind::Live.to_string(), "live");
    }

    #[test]
    fn test_decoder_sources_need_lut() {
        let source = FrameSource::Video(VideoSource {
            file: PathBuf::from("clip.mp4"),
            looping: false,
            capacity: 4,
        });
        assert!(source.needs_decoder());
        let ctx = ProducerContext {
            owner: "1".to_string(),
            grid: GridSize { cols: 1, rows: 1 },
            lut: None,
            config: DecoderConfig::default(),
        };
        let err = ProducerHandle::spawn(source, ctx, FrameQueue::new()).expect_err("no lut");
        assert!(matches!(err, SourceError::LutMissing));
    }

    #[test]
    fn test_sleep_wakes_on_stop() {
        let worker = test_worker(GridSize { cols: 1, rows: 1 }, None);
        worker.running.store(false, Ordering::SeqCst);
        let start = Instant::now();
        assert!(!worker.sleep_while_running(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_dump_written_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut worker = test_worker(GridSize { cols: 1, rows: 1 }, None);
        worker.ctx.config.dump_dir = Some(dir.path().join("dumps"));

        let mut state = StreamState::new(&worker, SourceKind::Video);
        state.dump_first(&[1, 2, 3]);
        state.dump_first(&[4, 5, 6]);

        let path = dir.path().join("dumps").join("screen-7-video-first.rgb");
        assert_eq!(fs::read(Path::new(&path)).expect("dump"), vec![1, 2, 3]);
    }

    #[test]
    fn test_stop_sequence_producer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("0.smrf");
        fs::write(&file, vec![3u8; 128 * 128]).expect("write");

        let ctx = ProducerContext {
            owner: "9".to_string(),
            grid: GridSize { cols: 1, rows: 1 },
            lut: None,
            config: DecoderConfig::default(),
        };
        let source = FrameSource::Sequence(SequenceSource {
            files: vec![file],
            start_index: 0,
            looping: true,
            capacity: 2,
        });
        let mut handle = ProducerHandle::spawn(source, ctx, FrameQueue::new()).expect("spawn");
        assert_eq!(handle.kind(), SourceKind::Sequence);

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.queue().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.queue().len(), 2);

        handle.stop(Duration::from_millis(500));
        assert!(handle.is_finished());
        assert!(handle.queue().len() <= 2);
    }
}
