//! Media library and frame file decoding
//!
//! Frame folders live under `<media root>/frames/<name>`. A folder holds
//! either numbered still frames or a single video file:
//!
//! | Extension              | Contents                                        |
//! |------------------------|-------------------------------------------------|
//! | `.smrf`                | raw palette indices, exactly `width*height` bytes |
//! | `.json`                | array of rows of pixel entries                  |
//! | `.png` `.jpg` `.jpeg`  | RGB image, resized and quantized                |
//! | video extensions       | decoded through the external decoder           |
//!
//! Still frames are ordered by the number embedded in their names, so
//! `frame2.png` comes before `frame10.png`.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde_json::Value;
use tilewall_frame::{ColorLut, Frame, GridSize};
use tracing::{debug, info};

use crate::error::{Result, SourceError};

const VIDEO_EXTENSIONS: [&str; 9] = ["mp4", "mov", "m4v", "avi", "webm", "wmv", "ts", "m3u8", "gif"];

/// Kind of still-frame file, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFileKind {
    /// `.json` pixel matrix
    Json,
    /// `.smrf` raw palette bytes
    RawMatrix,
    /// `.png`, `.jpg` or `.jpeg`
    Image,
}

impl FrameFileKind {
    /// Classify `path` by its (case-insensitive) extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension(path)?.as_str() {
            "json" => Some(Self::Json),
            "smrf" => Some(Self::RawMatrix),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }

    /// Whether decoding this kind needs the color lookup table
    #[must_use]
    pub fn needs_lut(self) -> bool {
        matches!(self, Self::Image)
    }
}

/// Whether `path` has a video extension
#[must_use]
pub fn is_video_path(path: &Path) -> bool {
    extension(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// What a folder resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderContent {
    /// Ordered still frames
    Sequence(Vec<PathBuf>),
    /// A lone video file
    Video(PathBuf),
}

/// A resolved folder plus the label used in status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFolder {
    /// Frames or video found in the folder
    pub content: FolderContent,
    /// `<name>` for sequences, `<name>/<file>` for videos
    pub label: String,
}

impl LoadedFolder {
    /// Frame count for sequences; videos report 1
    #[must_use]
    pub fn frame_count(&self) -> usize {
        match &self.content {
            FolderContent::Sequence(files) => files.len(),
            FolderContent::Video(_) => 1,
        }
    }
}

/// Read-only view of the media directory
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    /// Library rooted at `root`; frame folders are under `root/frames`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Media root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding named frame folders
    #[must_use]
    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    /// Path for a named folder or file under the frames directory
    ///
    /// Absolute names are used as-is.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.frames_dir().join(path)
        }
    }

    /// Resolve a folder into a frame sequence or a single video
    ///
    /// The first still frame is validated against `grid` so that a wrong
    /// folder fails here instead of inside a producer.
    pub fn load_folder(&self, name: &str, grid: GridSize) -> Result<LoadedFolder> {
        let folder = self.resolve(name);
        info!("Loading frames from {}", folder.display());
        if !folder.exists() {
            return Err(SourceError::NotFound(folder));
        }
        if !folder.is_dir() {
            return Err(SourceError::NotADirectory(folder));
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&folder)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if FrameFileKind::from_path(&path).is_some() || is_video_path(&path) {
                candidates.push(path);
            }
        }
        if candidates.is_empty() {
            return Err(SourceError::NoFrames(folder));
        }

        if candidates.len() == 1 && is_video_path(&candidates[0]) {
            let video = candidates.remove(0);
            let file_name = file_name(&video);
            info!("Video mode: {}", file_name);
            return Ok(LoadedFolder {
                content: FolderContent::Video(video),
                label: format!("{}/{}", name, file_name),
            });
        }

        let mut frames: Vec<PathBuf> = candidates.into_iter().filter(|p| !is_video_path(p)).collect();
        if frames.is_empty() {
            return Err(SourceError::NoFrames(folder));
        }
        frames.sort_by(|a, b| natural_order(&file_name(a), &file_name(b)));

        validate_first_frame(&frames[0], grid)?;
        info!("Found {} frame(s), first = {}", frames.len(), file_name(&frames[0]));

        Ok(LoadedFolder {
            content: FolderContent::Sequence(frames),
            label: name.to_string(),
        })
    }

    /// Resolve a video source: a video file, or a folder holding exactly one
    pub fn resolve_video(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name);
        if !path.exists() {
            return Err(SourceError::NotFound(path));
        }
        if path.is_file() {
            return Ok(path);
        }
        let mut videos = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?.path();
            if entry.is_file() && is_video_path(&entry) {
                videos.push(entry);
            }
        }
        videos.sort();
        videos.into_iter().next().ok_or(SourceError::NoFrames(path))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Order file names by the digits they contain
///
/// When both names contain digits, all digits of each name are joined and
/// compared as numbers. Otherwise, or on a numeric tie, plain string order
/// decides.
#[must_use]
pub fn natural_order(a: &str, b: &str) -> Ordering {
    let digits = |s: &str| -> String { s.chars().filter(char::is_ascii_digit).collect() };
    let (da, db) = (digits(a), digits(b));
    if let (Ok(na), Ok(nb)) = (da.parse::<u64>(), db.parse::<u64>()) {
        return na.cmp(&nb).then_with(|| a.cmp(b));
    }
    a.cmp(b)
}

/// Check that the first frame of a sequence fits the grid
fn validate_first_frame(path: &Path, grid: GridSize) -> Result<()> {
    match FrameFileKind::from_path(path) {
        Some(FrameFileKind::Json) => {
            let rows = read_json_rows(path)?;
            let (width, height) = json_dimensions(path, &rows)?;
            if width != grid.width() || height != grid.height() {
                return Err(SourceError::dimension_mismatch(
                    path,
                    format!("{}x{}", grid.width(), grid.height()),
                    format!("{}x{}", width, height),
                ));
            }
            Ok(())
        }
        Some(FrameFileKind::RawMatrix) => {
            let len = fs::metadata(path)?.len();
            if len != grid.pixel_count() as u64 {
                return Err(SourceError::dimension_mismatch(
                    path,
                    format!("{} bytes", grid.pixel_count()),
                    format!("{} bytes", len),
                ));
            }
            Ok(())
        }
        Some(FrameFileKind::Image) => {
            image::image_dimensions(path)?;
            Ok(())
        }
        None => Err(SourceError::UnsupportedFile(path.to_path_buf())),
    }
}

/// Decode one still frame file into a grid-sized frame
pub fn read_frame_file(path: &Path, grid: GridSize, lut: Option<&ColorLut>) -> Result<Frame> {
    let pixels = match FrameFileKind::from_path(path) {
        Some(FrameFileKind::Json) => read_json_frame(path, grid, lut)?,
        Some(FrameFileKind::RawMatrix) => read_raw_matrix(path, grid)?,
        Some(FrameFileKind::Image) => read_image_frame(path, grid, lut.ok_or(SourceError::LutMissing)?)?,
        None => return Err(SourceError::UnsupportedFile(path.to_path_buf())),
    };
    Ok(Frame::new(grid, pixels)?)
}

fn read_raw_matrix(path: &Path, grid: GridSize) -> Result<Vec<u8>> {
    let expected = grid.pixel_count();
    let mut buf = Vec::with_capacity(expected);
    File::open(path)?.take(expected as u64).read_to_end(&mut buf)?;
    if buf.len() != expected {
        return Err(SourceError::dimension_mismatch(
            path,
            format!("{} bytes", expected),
            format!("{} bytes", buf.len()),
        ));
    }
    Ok(buf)
}

fn read_image_frame(path: &Path, grid: GridSize, lut: &ColorLut) -> Result<Vec<u8>> {
    let (width, height) = (grid.width() as u32, grid.height() as u32);
    let mut rgb = image::open(path)?.to_rgb8();
    if rgb.width() != width || rgb.height() != height {
        debug!(
            "Resizing {} from {}x{} to {}x{}",
            path.display(),
            rgb.width(),
            rgb.height(),
            width,
            height
        );
        rgb = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
    }
    Ok(lut.quantize_rgb24(rgb.as_raw()))
}

fn read_json_rows(path: &Path) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    match value {
        Value::Array(rows) => Ok(rows),
        _ => Err(SourceError::invalid_frame(path, "top level is not an array")),
    }
}

fn json_dimensions(path: &Path, rows: &[Value]) -> Result<(usize, usize)> {
    let first = rows
        .first()
        .ok_or_else(|| SourceError::invalid_frame(path, "empty array"))?;
    let width = first
        .as_array()
        .ok_or_else(|| SourceError::invalid_frame(path, "row 0 is not an array"))?
        .len();
    Ok((width, rows.len()))
}

fn read_json_frame(path: &Path, grid: GridSize, lut: Option<&ColorLut>) -> Result<Vec<u8>> {
    let rows = read_json_rows(path)?;
    let (width, height) = json_dimensions(path, &rows)?;
    if width != grid.width() || height != grid.height() {
        return Err(SourceError::dimension_mismatch(
            path,
            format!("{}x{}", grid.width(), grid.height()),
            format!("{}x{}", width, height),
        ));
    }

    let mut out = Vec::with_capacity(width * height);
    for (y, row) in rows.iter().enumerate() {
        let row = row
            .as_array()
            .ok_or_else(|| SourceError::invalid_frame(path, format!("row {} is not an array", y)))?;
        if row.len() != width {
            return Err(SourceError::invalid_frame(path, format!("bad row width at y={}", y)));
        }
        for cell in row {
            let index = resolve_pixel(cell, lut).map_err(|e| match e {
                PixelError::LutMissing => SourceError::LutMissing,
                PixelError::Invalid(reason) => {
                    SourceError::invalid_frame(path, format!("row {}: {}", y, reason))
                }
            })?;
            out.push(index);
        }
    }
    Ok(out)
}

/// Error raised while interpreting one JSON pixel entry
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PixelError {
    LutMissing,
    Invalid(String),
}

impl std::fmt::Display for PixelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LutMissing => f.write_str("RGB pixel needs the color lookup table"),
            Self::Invalid(reason) => f.write_str(reason),
        }
    }
}

/// Interpret a JSON pixel entry as a palette index
///
/// Accepted forms: a number or numeric string (taken modulo 256), `null`
/// (0), arrays (`[]` is 0, `[x]` and `[x, y]` resolve `x`, three or more
/// elements are RGB), and objects with `index`, `value`, `palette`, `rgb`
/// or `r`/`g`/`b` keys.
pub(crate) fn resolve_pixel(value: &Value, lut: Option<&ColorLut>) -> std::result::Result<u8, PixelError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(_) | Value::String(_) => Ok((integer(value)? & 0xFF) as u8),
        Value::Array(items) => match items.len() {
            0 => Ok(0),
            1 | 2 => resolve_pixel(&items[0], lut),
            _ => rgb_to_index(&items[0], &items[1], &items[2], lut),
        },
        Value::Object(map) => {
            for key in ["index", "value", "palette"] {
                if let Some(inner) = map.get(key) {
                    return resolve_pixel(inner, lut);
                }
            }
            if let Some(Value::Array(rgb)) = map.get("rgb") {
                if rgb.len() < 3 {
                    return Err(PixelError::Invalid("rgb array needs 3 elements".to_string()));
                }
                return rgb_to_index(&rgb[0], &rgb[1], &rgb[2], lut);
            }
            if let (Some(r), Some(g), Some(b)) = (map.get("r"), map.get("g"), map.get("b")) {
                return rgb_to_index(r, g, b, lut);
            }
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            Err(PixelError::Invalid(format!("unsupported pixel object keys {:?}", keys)))
        }
        Value::Bool(_) => Err(PixelError::Invalid(format!("unsupported pixel value {}", value))),
    }
}

fn integer(value: &Value) -> std::result::Result<i64, PixelError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| PixelError::Invalid(format!("unusable number {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| PixelError::Invalid(format!("invalid numeric string {:?}", s))),
        other => Err(PixelError::Invalid(format!("not a number: {}", other))),
    }
}

fn channel(value: &Value) -> std::result::Result<u8, PixelError> {
    Ok(integer(value)?.clamp(0, 255) as u8)
}

fn rgb_to_index(
    r: &Value,
    g: &Value,
    b: &Value,
    lut: Option<&ColorLut>,
) -> std::result::Result<u8, PixelError> {
    let (r, g, b) = (channel(r)?, channel(g)?, channel(b)?);
    let lut = lut.ok_or(PixelError::LutMissing)?;
    Ok(lut.quantize(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tilewall_frame::LUT_SIZE;

    fn grid() -> GridSize {
        GridSize { cols: 1, rows: 1 }
    }

    /// Table mapping every color to the low byte of its blue channel + 1
    fn test_lut() -> ColorLut {
        let table = (0..LUT_SIZE).map(|key| ((key & 0xFF) as u8).wrapping_add(1)).collect();
        ColorLut::from_bytes(table).expect("table")
    }

    fn json_frame(dir: &Path, name: &str, cell: Value) -> PathBuf {
        let row = vec![cell; 128];
        let rows = vec![Value::Array(row); 128];
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec(&rows).expect("json")).expect("write");
        path
    }

    #[test]
    fn test_natural_order() {
        let mut names = vec!["frame10.png", "frame2.png", "frame1.png", "cover.png"];
        names.sort_by(|a, b| natural_order(a, b));
        // "cover.png" has no digits, so it compares by name against the rest
        assert_eq!(names, vec!["cover.png", "frame1.png", "frame2.png", "frame10.png"]);

        assert_eq!(natural_order("a_001.json", "b_1.json"), Ordering::Less);
        assert_eq!(natural_order("x9.smrf", "x10.smrf"), Ordering::Less);
    }

    #[test]
    fn test_classify_paths() {
        assert_eq!(FrameFileKind::from_path(Path::new("a/B.JSON")), Some(FrameFileKind::Json));
        assert_eq!(FrameFileKind::from_path(Path::new("f.smrf")), Some(FrameFileKind::RawMatrix));
        assert_eq!(FrameFileKind::from_path(Path::new("f.jpeg")), Some(FrameFileKind::Image));
        assert_eq!(FrameFileKind::from_path(Path::new("f.mp4")), None);
        assert!(is_video_path(Path::new("clip.MP4")));
        assert!(is_video_path(Path::new("stream.m3u8")));
        assert!(!is_video_path(Path::new("frame.png")));
    }

    #[test]
    fn test_resolve_primitives() {
        assert_eq!(resolve_pixel(&json!(null), None), Ok(0));
        assert_eq!(resolve_pixel(&json!(42), None), Ok(42));
        assert_eq!(resolve_pixel(&json!(300), None), Ok(44));
        assert_eq!(resolve_pixel(&json!(-1), None), Ok(255));
        assert_eq!(resolve_pixel(&json!(" 17 "), None), Ok(17));
        assert!(matches!(resolve_pixel(&json!("seven"), None), Err(PixelError::Invalid(_))));
        assert!(matches!(resolve_pixel(&json!(true), None), Err(PixelError::Invalid(_))));
    }

    #[test]
    fn test_resolve_arrays_and_objects() {
        let lut = test_lut();
        assert_eq!(resolve_pixel(&json!([]), None), Ok(0));
        assert_eq!(resolve_pixel(&json!([9]), None), Ok(9));
        assert_eq!(resolve_pixel(&json!([9, 200]), None), Ok(9));
        assert_eq!(resolve_pixel(&json!([0, 0, 5]), Some(&lut)), Ok(6));
        // Channels are clamped before lookup
        assert_eq!(resolve_pixel(&json!([0, 0, 999]), Some(&lut)), Ok(0));
        assert_eq!(resolve_pixel(&json!({"index": 3}), None), Ok(3));
        assert_eq!(resolve_pixel(&json!({"value": "4"}), None), Ok(4));
        assert_eq!(resolve_pixel(&json!({"palette": [5]}), None), Ok(5));
        assert_eq!(resolve_pixel(&json!({"rgb": [1, 2, 3]}), Some(&lut)), Ok(4));
        assert_eq!(resolve_pixel(&json!({"r": 0, "g": 0, "b": -5}), Some(&lut)), Ok(1));
        assert!(matches!(resolve_pixel(&json!({"alpha": 1}), None), Err(PixelError::Invalid(_))));
    }

    #[test]
    fn test_rgb_without_lut() {
        assert_eq!(resolve_pixel(&json!([1, 2, 3]), None), Err(PixelError::LutMissing));
        assert_eq!(resolve_pixel(&json!({"r": 1, "g": 2, "b": 3}), None), Err(PixelError::LutMissing));
    }

    #[test]
    fn test_load_sequence_folder() {
        let root = tempfile::tempdir().expect("tempdir");
        let library = MediaLibrary::new(root.path());
        let folder = library.resolve("intro");
        fs::create_dir_all(&folder).expect("mkdir");
        for name in ["f10.smrf", "f2.smrf", "f1.smrf"] {
            fs::write(folder.join(name), vec![7u8; 128 * 128]).expect("write");
        }
        fs::write(folder.join("notes.txt"), b"ignored").expect("write");

        let loaded = library.load_folder("intro", grid()).expect("load");
        assert_eq!(loaded.label, "intro");
        assert_eq!(loaded.frame_count(), 3);
        let FolderContent::Sequence(files) = loaded.content else {
            panic!("expected a sequence");
        };
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["f1.smrf", "f2.smrf", "f10.smrf"]);
    }

    #[test]
    fn test_load_video_folder() {
        let root = tempfile::tempdir().expect("tempdir");
        let library = MediaLibrary::new(root.path());
        let folder = library.resolve("clip");
        fs::create_dir_all(&folder).expect("mkdir");
        fs::write(folder.join("movie.mp4"), b"not really a movie").expect("write");

        let loaded = library.load_folder("clip", grid()).expect("load");
        assert_eq!(loaded.label, "clip/movie.mp4");
        assert!(matches!(loaded.content, FolderContent::Video(_)));
        assert_eq!(library.resolve_video("clip").expect("video"), folder.join("movie.mp4"));
    }

    #[test]
    fn test_load_folder_errors() {
        let root = tempfile::tempdir().expect("tempdir");
        let library = MediaLibrary::new(root.path());
        assert!(matches!(library.load_folder("missing", grid()), Err(SourceError::NotFound(_))));

        let frames = library.frames_dir();
        fs::create_dir_all(&frames).expect("mkdir");
        fs::write(frames.join("plain.txt"), b"x").expect("write");
        assert!(matches!(
            library.load_folder("plain.txt", grid()),
            Err(SourceError::NotADirectory(_))
        ));

        fs::create_dir_all(frames.join("empty")).expect("mkdir");
        assert!(matches!(library.load_folder("empty", grid()), Err(SourceError::NoFrames(_))));

        let short = frames.join("short");
        fs::create_dir_all(&short).expect("mkdir");
        fs::write(short.join("0.smrf"), vec![0u8; 100]).expect("write");
        assert!(matches!(
            library.load_folder("short", grid()),
            Err(SourceError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_read_json_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = json_frame(dir.path(), "0.json", json!({"index": 12}));
        let frame = read_frame_file(&path, grid(), None).expect("frame");
        assert!(frame.pixels().iter().all(|&p| p == 12));

        let rgb = json_frame(dir.path(), "1.json", json!([0, 0, 1]));
        assert!(matches!(read_frame_file(&rgb, grid(), None), Err(SourceError::LutMissing)));
        let frame = read_frame_file(&rgb, grid(), Some(&test_lut())).expect("frame");
        assert!(frame.pixels().iter().all(|&p| p == 2));
    }

    #[test]
    fn test_read_json_wrong_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("small.json");
        fs::write(&path, b"[[1,2],[3,4]]").expect("write");
        assert!(matches!(
            read_frame_file(&path, grid(), None),
            Err(SourceError::DimensionMismatch { .. })
        ));

        fs::write(&path, b"[1,2]").expect("write");
        assert!(matches!(read_frame_file(&path, grid(), None), Err(SourceError::InvalidFrame { .. })));
    }

    #[test]
    fn test_read_image_frame_resizes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("0.png");
        image::RgbImage::from_pixel(16, 16, image::Rgb([0, 0, 4]))
            .save(&path)
            .expect("png");

        assert!(matches!(read_frame_file(&path, grid(), None), Err(SourceError::LutMissing)));

        let frame = read_frame_file(&path, grid(), Some(&test_lut())).expect("frame");
        assert_eq!(frame.pixels().len(), 128 * 128);
        assert!(frame.pixels().iter().all(|&p| p == 5));
    }

    #[test]
    fn test_read_raw_matrix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("0.smrf");
        let mut bytes: Vec<u8> = (0..128 * 128).map(|i| (i % 251) as u8).collect();
        bytes.extend_from_slice(b"trailing bytes are ignored");
        fs::write(&path, &bytes).expect("write");

        let frame = read_frame_file(&path, grid(), None).expect("frame");
        assert_eq!(frame.pixels(), &bytes[..128 * 128]);
    }
}
