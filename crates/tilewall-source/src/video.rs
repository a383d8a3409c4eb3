//! Video file producer
//!
//! The decoder emits headerless RGB24 at the file's own frame rate (`-re`),
//! so every `width*height*3` bytes on its stdout is one frame.

use std::io::{BufReader, Read};

use tilewall_frame::{read_full, Frame};
use tracing::{debug, error, warn};

use crate::command;
use crate::process::{drain_stderr, DecoderProcess};
use crate::producer::{SourceKind, StreamState, VideoSource, Worker};

/// Decode the file, relaunching the decoder at end of file when looping
pub(crate) fn run(worker: &Worker, source: &VideoSource) {
    let mut state = StreamState::new(worker, SourceKind::Video);
    loop {
        let Some(frames) = run_once(worker, source, &mut state) else {
            return;
        };
        if !worker.is_running() || !source.looping {
            return;
        }
        if frames == 0 {
            warn!(
                "{}: {} produced no frames; not relaunching",
                worker.label(),
                source.file.display()
            );
            return;
        }
        debug!("{}: video ended after {} frames, looping", worker.label(), frames);
    }
}

/// One decoder launch; `None` if it could not be started
fn run_once(worker: &Worker, source: &VideoSource, state: &mut StreamState) -> Option<usize> {
    let grid = worker.ctx.grid;
    let label = worker.label();
    let args = command::video_args(&source.file, grid);
    let (process, stdout, stderr) =
        match DecoderProcess::spawn(&worker.ctx.config.decoder_binary, &args, label.clone()) {
            Ok(spawned) => spawned,
            Err(e) => {
                error!("{}: {}", label, e);
                return None;
            }
        };
    drain_stderr(stderr, label);
    worker.slot.install(process);
    if !worker.is_running() {
        worker.slot.terminate();
        return Some(0);
    }

    let reader = BufReader::with_capacity(grid.rgb24_len() * 2, stdout);
    let frames = pump_raw(worker, reader, source.capacity, state);
    worker.slot.terminate();
    Some(frames)
}

/// Slice a raw RGB24 stream into frames until it ends or the producer stops
///
/// Returns the number of frames queued.
pub(crate) fn pump_raw<R: Read>(
    worker: &Worker,
    mut reader: R,
    capacity: usize,
    state: &mut StreamState,
) -> usize {
    let Some(lut) = worker.ctx.lut.as_ref() else {
        error!("{}: video needs the color lookup table", worker.label());
        return 0;
    };
    let grid = worker.ctx.grid;
    let mut rgb = vec![0u8; grid.rgb24_len()];
    let mut frames = 0;

    while worker.wait_for_room(capacity) {
        let read = match read_full(&mut reader, &mut rgb) {
            Ok(read) => read,
            Err(e) => {
                warn!("{}: decoder read error: {}", worker.label(), e);
                break;
            }
        };
        if read < rgb.len() {
            if read > 0 {
                state.log_truncated(&worker.label(), SourceKind::Video, read, rgb.len());
            }
            break;
        }
        state.dump_first(&rgb);

        match Frame::new(grid, lut.quantize_rgb24(&rgb)) {
            Ok(frame) => {
                worker.queue.push(frame);
                frames += 1;
            }
            Err(e) => {
                warn!("{}: dropping decoded frame: {}", worker.label(), e);
                break;
            }
        }
    }
    frames
}
