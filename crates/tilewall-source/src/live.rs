//! Live stream producer
//!
//! Keeps a decoder attached to a network stream for as long as the
//! producer runs. Each attempt reads concatenated P6 images until the
//! stream fails, then waits the configured reconnect delay (one second by
//! default) and tries again with a fresh decoder. From the third attempt on the decoder gets a larger
//! probe budget, which helps streams whose first keyframe arrives late.
//!
//! The queue is never allowed to hold more than `queue_limit` frames; the
//! oldest are dropped so playback stays close to real time.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use tilewall_frame::{read_ppm_frame, Frame};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::command;
use crate::process::{drain_stderr, DecoderProcess};
use crate::producer::{LiveSource, SourceKind, StreamState, Worker};

const READ_BUFFER: usize = 1 << 20;

/// Connection milestones reported while a live stream starts up
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A decoder launch is being attempted (1-based)
    Connecting {
        /// Attempt number
        attempt: u32,
    },
    /// An attempt ended before any frame arrived; reconnecting
    WaitingForFirstFrame,
    /// The first frame was queued
    FirstFrame {
        /// Time since the producer started
        elapsed: Duration,
    },
    /// A launch or read failed
    Error(String),
}

/// Sender side of the milestone channel
pub type LiveEvents = UnboundedSender<LiveEvent>;

fn emit(source: &LiveSource, event: LiveEvent) {
    if let Some(events) = &source.events {
        // A dropped receiver only means nobody is listening anymore
        let _ = events.send(event);
    }
}

/// Attach to the stream until stopped, reconnecting on failure
pub(crate) fn run(worker: &Worker, source: &LiveSource) {
    let grid = worker.ctx.grid;
    let config = &worker.ctx.config;
    let fps = command::live_fps(config.reference_tick_rate, source.ticks_per_frame);
    let mut state = StreamState::new(worker, SourceKind::Live);
    let delay = config.reconnect_delay();
    let mut attempts: u32 = 0;

    while worker.is_running() {
        let probe = config.probe_for_attempt(attempts);
        attempts += 1;
        emit(source, LiveEvent::Connecting { attempt: attempts });
        debug!(
            "{}: live attempt {} (analyzeduration={} probesize={})",
            worker.label(),
            attempts,
            probe.analyze_duration_us,
            probe.probe_size
        );

        let args = command::live_args(&source.url, grid, probe, fps);
        let (process, stdout, stderr) =
            match DecoderProcess::spawn(&config.decoder_binary, &args, worker.label()) {
                Ok(spawned) => spawned,
                Err(e) => {
                    warn!("{}: live decoder launch failed: {}", worker.label(), e);
                    emit(source, LiveEvent::Error(e.to_string()));
                    worker.sleep_while_running(delay);
                    continue;
                }
            };
        drain_stderr(stderr, worker.label());
        worker.slot.install(process);
        if !worker.is_running() {
            break;
        }

        let frames = pump_ppm(worker, BufReader::with_capacity(READ_BUFFER, stdout), source, &mut state);
        worker.slot.terminate();
        if !worker.is_running() {
            break;
        }
        if state.first_frame.is_none() {
            emit(source, LiveEvent::WaitingForFirstFrame);
        }
        info!(
            "{}: live stream ended after {} frames, reconnecting in {:?}",
            worker.label(),
            frames,
            delay
        );
        worker.sleep_while_running(delay);
    }
}

/// Read P6 frames into the queue until the stream fails or the producer stops
///
/// Returns the number of frames queued.
pub(crate) fn pump_ppm<R: BufRead>(
    worker: &Worker,
    mut reader: R,
    source: &LiveSource,
    state: &mut StreamState,
) -> usize {
    let Some(lut) = worker.ctx.lut.as_ref() else {
        warn!("{}: live needs the color lookup table", worker.label());
        return 0;
    };
    let grid = worker.ctx.grid;
    let mut frames = 0;

    while worker.is_running() {
        let rgb = match read_ppm_frame(&mut reader, grid.width(), grid.height()) {
            Ok(Some(rgb)) => rgb,
            Ok(None) => break,
            Err(e) => {
                warn!("{}: live read error: {}", worker.label(), e);
                emit(source, LiveEvent::Error(e.to_string()));
                break;
            }
        };
        state.dump_first(&rgb);

        let frame = match Frame::new(grid, lut.quantize_rgb24(&rgb)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}: dropping live frame: {}", worker.label(), e);
                break;
            }
        };
        let dropped = worker.queue.push_with_ceiling(frame, source.queue_limit);
        if dropped > 0 {
            debug!("{}: live queue full, dropped {} old frame(s)", worker.label(), dropped);
        }
        frames += 1;

        if state.first_frame.is_none() {
            let elapsed = state.started.elapsed();
            state.first_frame = Some(elapsed);
            info!("{}: first live frame after {:?}", worker.label(), elapsed);
            emit(source, LiveEvent::FirstFrame { elapsed });
        }
    }
    frames
}
