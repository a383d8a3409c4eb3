//! Still-frame sequence producer

use tilewall_frame::Frame;
use tracing::{debug, warn};

use crate::loader::read_frame_file;
use crate::producer::{SequenceSource, Worker};

/// Read frame files in order until stopped or, without looping, exhausted
///
/// A file that fails to decode is logged and skipped; it does not end the
/// sequence.
pub(crate) fn run(worker: &Worker, source: &SequenceSource) {
    let files = &source.files;
    if files.is_empty() {
        return;
    }
    let grid = worker.ctx.grid;
    let lut = worker.ctx.lut.as_ref();
    let mut index = source.start_index;

    loop {
        if !worker.wait_for_room(source.capacity) {
            return;
        }
        if index >= files.len() {
            if !source.looping {
                debug!("{}: sequence exhausted after {} files", worker.label(), files.len());
                return;
            }
            index = 0;
        }

        let path = &files[index];
        match read_frame_file(path, grid, lut) {
            Ok(frame) => push(worker, frame),
            Err(e) => warn!("{}: skipping frame {}: {}", worker.label(), path.display(), e),
        }
        index += 1;
    }
}

fn push(worker: &Worker, frame: Frame) {
    if worker.is_running() {
        worker.queue.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use tilewall_frame::GridSize;

    use crate::producer::test_worker;

    fn smrf_files(dir: &std::path::Path, tags: &[u8]) -> Vec<PathBuf> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| {
                let path = dir.join(format!("{}.smrf", i));
                fs::write(&path, vec![*tag; 128 * 128]).expect("write");
                path
            })
            .collect()
    }

    fn tags(worker: &Worker) -> Vec<u8> {
        std::iter::from_fn(|| worker.queue.pop()).map(|f| f.pixels()[0]).collect()
    }

    #[test]
    fn test_plays_once_from_start_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worker = test_worker(GridSize { cols: 1, rows: 1 }, None);
        let source = SequenceSource {
            files: smrf_files(dir.path(), &[10, 20, 30]),
            start_index: 1,
            looping: false,
            capacity: 10,
        };

        run(&worker, &source);
        assert_eq!(tags(&worker), vec![20, 30]);
    }

    #[test]
    fn test_skips_unreadable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worker = test_worker(GridSize { cols: 1, rows: 1 }, None);
        let mut files = smrf_files(dir.path(), &[1, 2]);
        let broken = dir.path().join("broken.smrf");
        fs::write(&broken, b"short").expect("write");
        files.insert(1, broken);

        let source = SequenceSource {
            files,
            start_index: 0,
            looping: false,
            capacity: 10,
        };
        run(&worker, &source);
        assert_eq!(tags(&worker), vec![1, 2]);
    }

    #[test]
    fn test_loop_wraps_and_respects_capacity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let worker = test_worker(GridSize { cols: 1, rows: 1 }, None);
        let source = SequenceSource {
            files: smrf_files(dir.path(), &[5, 6]),
            start_index: 1,
            looping: true,
            capacity: 3,
        };

        let thread_worker = worker.clone();
        let handle = std::thread::spawn(move || run(&thread_worker, &source));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while worker.queue.len() < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert_eq!(worker.queue.len(), 3);

        worker.running.store(false, Ordering::SeqCst);
        handle.join().expect("join");
        assert_eq!(tags(&worker), vec![6, 5, 6]);
    }
}
