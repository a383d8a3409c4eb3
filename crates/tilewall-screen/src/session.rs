//! Playback Session
//!
//! One session per surface group. It owns the group's producer and frame
//! queue and decides, once per tick, whether a queued frame gets published.
//!
//! # States
//!
//! ```text
//!            start_* (any state)
//!   ┌──────┐ ─────────────────▶ ┌──────────┐
//!   │ Idle │                    │ Sequence │
//!   │      │ ◀───────────────── │ Video    │
//!   └──────┘  stop / completed  │ Live     │
//!                               └──────────┘
//! ```
//!
//! Every start first tears down the running producer and drops its queue,
//! so a session never has two producers.
//!
//! # Cadence
//!
//! | `ticks_per_frame` | Behavior                                             |
//! |-------------------|------------------------------------------------------|
//! | `-1`              | publish one frame, then hold it                      |
//! | `0`               | publish whenever a frame is queued                   |
//! | `k > 0`           | publish every `k` ticks, from `start + warmup + k`   |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tilewall_frame::{ColorLut, Frame, FrameQueue};
use tilewall_source::{read_frame_file, FrameSource, LiveEvents, ProducerContext, ProducerHandle};
use tracing::{debug, info, warn};

use crate::error::{Result, ScreenError};
use crate::group::SurfaceGroup;

/// What a session is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    Idle,
    Sequence,
    Video,
    Live,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Sequence => "sequence",
            Self::Video => "video",
            Self::Live => "live",
        })
    }
}

/// How often frames are published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// Publish the first frame and hold it
    Freeze,
    /// Publish as fast as frames arrive, one in flight at a time
    SourcePaced,
    /// Publish every `n` ticks
    Every(u32),
}

impl Cadence {
    /// Negative means freeze, zero source-paced, positive fixed
    #[must_use]
    pub fn from_ticks_per_frame(ticks_per_frame: i32) -> Self {
        match ticks_per_frame {
            t if t < 0 => Self::Freeze,
            0 => Self::SourcePaced,
            t => Self::Every(t.unsigned_abs()),
        }
    }

    /// Inverse of [`from_ticks_per_frame`](Self::from_ticks_per_frame)
    #[must_use]
    pub fn ticks_per_frame(&self) -> i32 {
        match self {
            Self::Freeze => -1,
            Self::SourcePaced => 0,
            Self::Every(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }
}

/// Parameters for sequence and video playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackParams {
    /// Cadence, see [`Cadence::from_ticks_per_frame`] (default: 2)
    pub ticks_per_frame: i32,
    /// Restart at the end (default: false)
    pub looping: bool,
    /// Ticks to wait after start before the first publish (default: 0)
    pub warmup_ticks: u64,
    /// Frames to queue before the first publish; also caps the queue
    /// (default: 0, no pre-roll)
    pub buffer_target: usize,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            ticks_per_frame: 2,
            looping: false,
            warmup_ticks: 0,
            buffer_target: 0,
        }
    }
}

/// Parameters for live playback
#[derive(Debug, Clone, Default)]
pub struct LiveParams {
    /// Cadence, see [`Cadence::from_ticks_per_frame`] (default: 0)
    pub ticks_per_frame: i32,
    /// Queue ceiling; zero uses the configured default
    pub queue_limit: usize,
    /// Receiver for connection milestones
    pub events: Option<LiveEvents>,
}

/// A fully resolved start request
#[derive(Debug, Clone)]
pub struct PlaybackPlan {
    pub mode: PlaybackMode,
    pub cadence: Cadence,
    pub looping: bool,
    pub warmup_ticks: u64,
    pub buffer_target: usize,
    /// Shown as `source=` in status output
    pub label: String,
    pub source: FrameSource,
}

/// Result of one tick for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is playing
    Inactive,
    /// Playing, but no publish this tick
    Waiting,
    /// Published under this epoch
    Published(u64),
    /// Published the last frame of a non-looping sequence and stopped
    Completed(u64),
}

/// Playback state for one surface group
#[derive(Debug)]
pub struct PlaybackSession {
    group: SurfaceGroup,
    black: u8,
    join_grace: Duration,

    mode: PlaybackMode,
    cadence: Cadence,
    looping: bool,
    warmup_ticks: u64,
    buffer_target: usize,
    label: String,

    start_tick: u64,
    next_frame_tick: u64,
    frame_index: usize,
    frozen: bool,
    prerolled: bool,

    sequence: Vec<PathBuf>,
    video_file: Option<PathBuf>,
    lut: Option<ColorLut>,

    queue: FrameQueue,
    producer: Option<ProducerHandle>,
}

impl PlaybackSession {
    /// Idle session for `group`; `black` is the palette index for blank frames
    #[must_use]
    pub fn new(group: SurfaceGroup, black: u8, join_grace: Duration) -> Self {
        Self {
            group,
            black,
            join_grace,
            mode: PlaybackMode::Idle,
            cadence: Cadence::Every(1),
            looping: false,
            warmup_ticks: 0,
            buffer_target: 0,
            label: String::new(),
            start_tick: 0,
            next_frame_tick: u64::MAX,
            frame_index: 0,
            frozen: false,
            prerolled: false,
            sequence: Vec::new(),
            video_file: None,
            lut: None,
            queue: FrameQueue::new(),
            producer: None,
        }
    }

    #[must_use]
    pub fn group(&self) -> &SurfaceGroup {
        &self.group
    }

    /// Palette index used by [`reset_to_black`](Self::reset_to_black)
    pub fn set_black_index(&mut self, black: u8) {
        self.black = black;
    }

    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    #[must_use]
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Index of the next sequence frame to publish
    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Tick at which the next fixed-cadence publish is due
    #[must_use]
    pub fn next_frame_tick(&self) -> Option<u64> {
        (self.next_frame_tick != u64::MAX).then_some(self.next_frame_tick)
    }

    /// Queue of the current run
    #[must_use]
    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    /// Whether a producer thread is attached and still running
    #[must_use]
    pub fn producer_running(&self) -> bool {
        self.producer.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// Switch to a new source
    ///
    /// Stops the current producer, resets every renderer's staged tile and
    /// seen map, then spawns the producer for `plan`. On error the session
    /// is left idle.
    pub fn start(&mut self, plan: PlaybackPlan, ctx: ProducerContext, tick: u64) -> Result<()> {
        if self.group.is_empty() {
            return Err(ScreenError::EmptyGroup(self.group.id()));
        }
        if plan.mode == PlaybackMode::Idle {
            return Err(ScreenError::invalid_parameter("cannot start idle playback"));
        }

        self.stop_producer();
        self.group.reset_renderers();
        self.queue = FrameQueue::new();

        self.mode = plan.mode;
        self.cadence = plan.cadence;
        self.looping = plan.looping;
        self.warmup_ticks = plan.warmup_ticks;
        self.buffer_target = plan.buffer_target;
        self.label = plan.label;
        self.start_tick = tick;
        self.next_frame_tick = match self.cadence {
            Cadence::Freeze => u64::MAX,
            Cadence::SourcePaced => tick,
            Cadence::Every(n) => tick + self.warmup_ticks + u64::from(n),
        };
        self.frame_index = 0;
        self.frozen = false;
        self.prerolled = false;
        self.sequence.clear();
        self.video_file = None;
        match &plan.source {
            FrameSource::Sequence(s) => {
                self.sequence = s.files.clone();
                self.frame_index = s.start_index;
            }
            FrameSource::Video(v) => self.video_file = Some(v.file.clone()),
            FrameSource::Live(_) => {}
        }
        self.lut = ctx.lut.clone();

        match ProducerHandle::spawn(plan.source, ctx, self.queue.clone()) {
            Ok(producer) => {
                self.producer = Some(producer);
                info!(
                    "screen {}: started {} tpf={} loop={} warmup={} buffer={} source={}",
                    self.group.id(),
                    self.mode,
                    self.cadence.ticks_per_frame(),
                    self.looping,
                    self.warmup_ticks,
                    self.buffer_target,
                    self.label
                );
                Ok(())
            }
            Err(e) => {
                self.reset_state();
                Err(e.into())
            }
        }
    }

    /// Stop playback, keeping the last published frame on screen
    pub fn stop(&mut self) {
        let was = self.mode;
        self.stop_producer();
        self.queue.clear();
        self.group.reset_renderers();
        self.reset_state();
        if was != PlaybackMode::Idle {
            info!("screen {}: stopped {}", self.group.id(), was);
        }
    }

    /// Stop playback and publish a frame of the black palette index
    pub fn reset_to_black(&mut self) -> Result<u64> {
        self.stop();
        if self.group.is_empty() {
            return Err(ScreenError::EmptyGroup(self.group.id()));
        }
        let frame = Frame::filled(self.group.grid(), self.black);
        self.group.publish_frame(&frame)
    }

    /// Stop playback and unbind every surface
    pub fn clear(&mut self) {
        self.stop();
        self.group.clear_members();
        info!("screen {}: cleared", self.group.id());
    }

    /// Advance the session by one scheduler tick
    pub fn on_tick(&mut self, tick: u64) -> TickOutcome {
        if self.mode == PlaybackMode::Idle || self.group.is_empty() {
            return TickOutcome::Inactive;
        }
        if self.mode == PlaybackMode::Sequence && self.sequence.is_empty() {
            return TickOutcome::Inactive;
        }
        if tick < self.start_tick.saturating_add(self.warmup_ticks) {
            return TickOutcome::Waiting;
        }

        match self.cadence {
            Cadence::Freeze => self.tick_freeze(),
            Cadence::SourcePaced => {
                if self.group.has_pending() {
                    return TickOutcome::Waiting;
                }
                match self.queue.pop() {
                    Some(frame) => self.publish(&frame),
                    None => TickOutcome::Waiting,
                }
            }
            Cadence::Every(n) => self.tick_fixed(tick, n),
        }
    }

    fn tick_freeze(&mut self) -> TickOutcome {
        if self.frozen || self.group.has_pending() {
            return TickOutcome::Waiting;
        }
        let frame = match self.queue.pop() {
            Some(frame) => frame,
            None if self.mode == PlaybackMode::Sequence => {
                let Some(first) = self.sequence.first() else {
                    return TickOutcome::Waiting;
                };
                match read_frame_file(first, self.group.grid(), self.lut.as_ref()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("screen {}: single-frame read failed: {}", self.group.id(), e);
                        return TickOutcome::Waiting;
                    }
                }
            }
            None => return TickOutcome::Waiting,
        };
        let outcome = self.publish(&frame);
        if matches!(outcome, TickOutcome::Published(_)) {
            self.frozen = true;
        }
        outcome
    }

    fn tick_fixed(&mut self, tick: u64, every: u32) -> TickOutcome {
        if self.sequence_drained() && !self.group.has_pending() {
            return self.finish_sequence(self.group.epoch());
        }
        if tick < self.next_frame_tick {
            return TickOutcome::Waiting;
        }
        if self.queue.is_empty() || self.group.has_pending() {
            return TickOutcome::Waiting;
        }
        if !self.prerolled
            && self.buffer_target > 0
            && self.queue.len() < self.buffer_target
            && self.producer_running()
        {
            return TickOutcome::Waiting;
        }
        let Some(frame) = self.queue.pop() else {
            return TickOutcome::Waiting;
        };
        let TickOutcome::Published(epoch) = self.publish(&frame) else {
            return TickOutcome::Waiting;
        };
        self.prerolled = true;
        self.next_frame_tick = self.next_frame_tick.saturating_add(u64::from(every));

        if self.mode == PlaybackMode::Sequence {
            self.frame_index += 1;
            if self.frame_index >= self.sequence.len() {
                if !self.looping {
                    return self.finish_sequence(epoch);
                }
                self.frame_index = 0;
            }
            if self.sequence_drained() {
                return self.finish_sequence(epoch);
            }
        }
        TickOutcome::Published(epoch)
    }

    /// A non-looping sequence whose producer exited with nothing left queued
    ///
    /// Skipped files mean this can happen before every index was shown.
    fn sequence_drained(&self) -> bool {
        self.mode == PlaybackMode::Sequence
            && !self.looping
            && self.producer.as_ref().is_some_and(ProducerHandle::is_finished)
            && self.queue.is_empty()
    }

    fn finish_sequence(&mut self, epoch: u64) -> TickOutcome {
        debug!(
            "screen {}: sequence finished at frame {}/{}",
            self.group.id(),
            self.frame_index,
            self.sequence.len()
        );
        self.stop();
        TickOutcome::Completed(epoch)
    }

    fn publish(&mut self, frame: &Frame) -> TickOutcome {
        match self.group.publish_frame(frame) {
            Ok(epoch) => TickOutcome::Published(epoch),
            Err(e) => {
                warn!("screen {}: publish failed: {}", self.group.id(), e);
                TickOutcome::Waiting
            }
        }
    }

    fn stop_producer(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.stop(self.join_grace);
        }
    }

    fn reset_state(&mut self) {
        self.mode = PlaybackMode::Idle;
        self.cadence = Cadence::Every(1);
        self.looping = false;
        self.warmup_ticks = 0;
        self.buffer_target = 0;
        self.next_frame_tick = u64::MAX;
        self.frame_index = 0;
        self.frozen = false;
        self.prerolled = false;
        self.sequence.clear();
        self.video_file = None;
    }

    /// One-line status, e.g.
    /// `screen 1: binding=4 maps layout=2x2 frames=3 tpf=2 loop=true idx=1/2 radius=32 source=intro`
    #[must_use]
    pub fn describe(&self) -> String {
        let frames = match self.mode {
            PlaybackMode::Live => "<live>".to_string(),
            PlaybackMode::Video => {
                let name = self
                    .video_file
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map_or_else(|| "?".to_string(), |n| n.to_string_lossy().into_owned());
                format!("<video:{}>", name)
            }
            _ => self.sequence.len().to_string(),
        };
        let tpf = match self.cadence {
            Cadence::Freeze => " tpf=-1".to_string(),
            Cadence::SourcePaced => " tpf=source".to_string(),
            Cadence::Every(n) => format!(" tpf={}", n),
        };
        let looping = if self.mode == PlaybackMode::Live {
            String::new()
        } else {
            format!(" loop={}", self.looping)
        };
        let index = if self.mode == PlaybackMode::Sequence && !self.sequence.is_empty() {
            format!(" idx={}/{}", self.frame_index, self.sequence.len().saturating_sub(1))
        } else {
            String::new()
        };
        let source = if self.label.is_empty() {
            String::new()
        } else {
            format!(" source={}", self.label)
        };
        format!(
            "screen {}: binding={} maps layout={}x{} frames={}{}{}{} radius={}{}",
            self.group.id(),
            self.group.len(),
            self.group.grid().cols,
            self.group.grid().rows,
            frames,
            tpf,
            looping,
            index,
            self.group.radius(),
            source
        )
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.stop(Duration::ZERO);
        }
    }
}
