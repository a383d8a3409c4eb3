//! Decoder command lines
//!
//! Both modes scale to the exact grid size with nearest-neighbour sampling
//! and square pixels, so every decoded frame is `cols*128 x rows*128` RGB24.
//! Files go out as headerless raw video; live streams go out as
//! concatenated P6 images so frame boundaries survive a flaky connection.

use std::path::Path;

use tilewall_frame::GridSize;

use crate::config::ProbeBudget;

const QUIET: [&str; 4] = ["-hide_banner", "-loglevel", "error", "-nostdin"];

/// Scale filter producing exactly `width` x `height` RGB24
#[must_use]
pub fn scale_filter(width: usize, height: usize) -> String {
    format!(
        "scale={}:{}:flags=neighbor:force_original_aspect_ratio=disable,setsar=1,format=rgb24",
        width, height
    )
}

/// Decode rate for a live stream at `ticks_per_frame`
///
/// `None` for source-paced streams (no fps filter).
#[must_use]
pub fn live_fps(reference_tick_rate: u32, ticks_per_frame: i32) -> Option<f64> {
    (ticks_per_frame > 0).then(|| f64::from(reference_tick_rate) / f64::from(ticks_per_frame))
}

/// Arguments for decoding a video file at its native speed
#[must_use]
pub fn video_args(file: &Path, grid: GridSize) -> Vec<String> {
    let mut args: Vec<String> = QUIET.iter().map(|s| (*s).to_string()).collect();
    args.extend([
        "-re".to_string(),
        "-i".to_string(),
        file.to_string_lossy().into_owned(),
        "-vf".to_string(),
        scale_filter(grid.width(), grid.height()),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "pipe:1".to_string(),
    ]);
    args
}

/// Arguments for decoding a live stream with low-latency flags
#[must_use]
pub fn live_args(url: &str, grid: GridSize, probe: ProbeBudget, fps: Option<f64>) -> Vec<String> {
    let mut filter = scale_filter(grid.width(), grid.height());
    if let Some(fps) = fps.filter(|f| *f > 0.0) {
        filter.push_str(&format!(",fps={:.3}", fps));
    }

    let mut args: Vec<String> = QUIET.iter().map(|s| (*s).to_string()).collect();
    args.extend([
        "-fflags".to_string(),
        "nobuffer".to_string(),
        "-flags".to_string(),
        "low_delay".to_string(),
        "-analyzeduration".to_string(),
        probe.analyze_duration_us.to_string(),
        "-probesize".to_string(),
        probe.probe_size.to_string(),
        "-reconnect".to_string(),
        "1".to_string(),
        "-reconnect_streamed".to_string(),
        "1".to_string(),
        "-reconnect_delay_max".to_string(),
        "2".to_string(),
        "-i".to_string(),
        url.to_string(),
        "-vf".to_string(),
        filter,
        "-f".to_string(),
        "image2pipe".to_string(),
        "-vcodec".to_string(),
        "ppm".to_string(),
        "pipe:1".to_string(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSize {
        GridSize { cols: 2, rows: 1 }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_video_args() {
        let args = video_args(Path::new("/media/frames/clip/clip.mp4"), grid());
        assert_eq!(args[0], "-hide_banner");
        assert!(args.contains(&"-re".to_string()));
        assert_eq!(value_after(&args, "-i"), Some("/media/frames/clip/clip.mp4"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=256:128:flags=neighbor:force_original_aspect_ratio=disable,setsar=1,format=rgb24")
        );
        assert_eq!(value_after(&args, "-f"), Some("rawvideo"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_live_args_with_fps() {
        let args = live_args("rtmp://host/live", grid(), ProbeBudget::SHORT, live_fps(20, 3));
        assert_eq!(value_after(&args, "-analyzeduration"), Some("200000"));
        assert_eq!(value_after(&args, "-probesize"), Some("65536"));
        assert_eq!(value_after(&args, "-i"), Some("rtmp://host/live"));
        assert!(value_after(&args, "-vf")
            .is_some_and(|vf| vf.ends_with(",fps=6.667")));
        assert_eq!(value_after(&args, "-vcodec"), Some("ppm"));
    }

    #[test]
    fn test_live_args_source_paced() {
        assert_eq!(live_fps(20, -1), None);
        assert_eq!(live_fps(20, 0), None);
        let args = live_args("udp://0.0.0.0:5000", grid(), ProbeBudget::ESCALATED, None);
        assert_eq!(value_after(&args, "-analyzeduration"), Some("1000000"));
        assert!(value_after(&args, "-vf").is_some_and(|vf| !vf.contains("fps=")));
    }
}
