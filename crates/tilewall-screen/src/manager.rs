//! Screen Manager
//!
//! The command surface: binds surface groups, starts and stops playback,
//! and runs the per-tick publish and render pass for every session.
//!
//! # Tick pass
//!
//! ```text
//! on_tick
//!   ├─ clock.advance()
//!   ├─ session.on_tick(tick)      for every group (publish at most one frame)
//!   └─ renderer.render(viewer)    for every member × viewer in its partition
//! ```
//!
//! All mutation happens on the caller of [`ScreenManager::on_tick`]; the
//! producers only ever touch their own queues.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tilewall_frame::{black_index, ColorLut};
use tilewall_source::{
    DecoderProbe, FolderContent, FrameFileKind, FrameSource, LiveSource, MediaLibrary,
    ProducerContext, SequenceSource, SourceError, VideoSource,
};
use tracing::{debug, info, warn};

use crate::clock::TickClock;
use crate::config::EngineConfig;
use crate::error::{Result, ScreenError};
use crate::group::{GroupId, GroupSpec, SurfaceGroup};
use crate::renderer::SurfaceRenderer;
use crate::resume::{JsonResumeStore, MemoryResumeStore, ResumeIntent, ResumeStore};
use crate::session::{
    Cadence, LiveParams, PlaybackMode, PlaybackParams, PlaybackPlan, PlaybackSession, TickOutcome,
};
use crate::viewer::{SurfaceId, TileSink, ViewerDirectory};

/// Owns every surface group and its playback session
pub struct ScreenManager {
    config: EngineConfig,
    library: MediaLibrary,
    lut: Option<ColorLut>,
    probe: DecoderProbe,
    resume: Box<dyn ResumeStore>,
    clock: TickClock,
    sessions: BTreeMap<GroupId, PlaybackSession>,
    last_active: Option<GroupId>,
}

impl std::fmt::Debug for ScreenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenManager")
            .field("media_root", &self.library.root())
            .field("lut_loaded", &self.lut.is_some())
            .field("tick", &self.clock.now())
            .field("groups", &self.sessions.len())
            .finish()
    }
}

impl ScreenManager {
    /// Create a manager from `config`
    ///
    /// Loads the color table when configured (a table that fails to load is
    /// logged and skipped; raw palette sources still play) and opens the
    /// resume store. An unreadable resume file is moved aside and playback
    /// starts with no intents.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let lut = match &config.lut_path {
            Some(path) => match ColorLut::load(path) {
                Ok(lut) => Some(lut),
                Err(e) => {
                    warn!("Color table {} not loaded: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };
        let resume: Box<dyn ResumeStore> = match &config.resume_path {
            Some(path) => Box::new(JsonResumeStore::open_or_discard(path)),
            None => Box::new(MemoryResumeStore::new()),
        };
        Self::with_parts(config, lut, resume, TickClock::new())
    }

    /// Create a manager from already-built parts
    pub fn with_parts(
        config: EngineConfig,
        lut: Option<ColorLut>,
        resume: Box<dyn ResumeStore>,
        clock: TickClock,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|issues| ScreenError::invalid_parameter(issues.join("; ")))?;

        info!(
            "Screen manager: media root {}, {} Hz, color table {}",
            config.media_root.display(),
            config.tick_rate,
            if lut.is_some() { "loaded" } else { "missing" }
        );

        Ok(Self {
            library: MediaLibrary::new(config.media_root.clone()),
            probe: DecoderProbe::new(config.decoder.decoder_binary.clone()),
            config,
            lut,
            resume,
            clock,
            sessions: BTreeMap::new(),
            last_active: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared tick counter
    #[must_use]
    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    #[must_use]
    pub fn lut_loaded(&self) -> bool {
        self.lut.is_some()
    }

    /// Replace the color table; affects playback started afterwards
    pub fn set_lut(&mut self, lut: Option<ColorLut>) {
        let black = black_index(lut.as_ref());
        for session in self.sessions.values_mut() {
            session.set_black_index(black);
        }
        self.lut = lut;
    }

    /// Bind a new group under the next free id
    pub fn bind(&mut self, spec: GroupSpec) -> Result<GroupId> {
        let id = GroupId(self.sessions.keys().next_back().map_or(1, |last| last.0 + 1));
        self.bind_with_id(id, spec)?;
        Ok(id)
    }

    /// Bind a group under a caller-chosen id
    ///
    /// Binding does not publish anything; surfaces stay blank until the
    /// first frame or [`reset_to_black`](Self::reset_to_black).
    pub fn bind_with_id(&mut self, id: GroupId, spec: GroupSpec) -> Result<()> {
        if self.sessions.contains_key(&id) {
            return Err(ScreenError::GroupExists(id));
        }
        let group = SurfaceGroup::new(id, spec)?;
        info!(
            "screen {}: bound {}x{} in {}",
            id,
            group.grid().cols,
            group.grid().rows,
            group.partition()
        );
        let session = PlaybackSession::new(group, black_index(self.lut.as_ref()), self.config.join_grace());
        self.sessions.insert(id, session);
        Ok(())
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&SurfaceGroup> {
        self.sessions.get(&id).map(PlaybackSession::group)
    }

    #[must_use]
    pub fn session(&self, id: GroupId) -> Option<&PlaybackSession> {
        self.sessions.get(&id)
    }

    /// Bound group ids in ascending order
    #[must_use]
    pub fn groups(&self) -> Vec<GroupId> {
        self.sessions.keys().copied().collect()
    }

    /// Renderer for `surface` in any group
    #[must_use]
    pub fn renderer(&self, surface: SurfaceId) -> Option<Arc<SurfaceRenderer>> {
        self.sessions
            .values()
            .find_map(|s| s.group().renderer(surface).cloned())
    }

    /// Group that most recently started playback
    #[must_use]
    pub fn last_active(&self) -> Option<GroupId> {
        self.last_active
    }

    /// Play the folder `name` under the media root
    ///
    /// A folder holding a single video file plays that video instead.
    /// Returns the number of frames found (1 for a video).
    pub fn start_sequence(&mut self, id: GroupId, name: &str, params: PlaybackParams) -> Result<usize> {
        check_params(&params)?;
        let grid = self.bound_session(id)?.group().grid();
        let loaded = self.library.load_folder(name, grid)?;
        let count = loaded.frame_count();

        let files = match loaded.content {
            FolderContent::Video(file) => {
                self.start_video_file(id, file, loaded.label, name, params)?;
                return Ok(count);
            }
            FolderContent::Sequence(files) => files,
        };

        let first_needs_lut = files
            .first()
            .and_then(|f| FrameFileKind::from_path(f))
            .is_some_and(FrameFileKind::needs_lut);
        if self.lut.is_none() && first_needs_lut {
            return Err(SourceError::LutMissing.into());
        }

        let plan = PlaybackPlan {
            mode: PlaybackMode::Sequence,
            cadence: Cadence::from_ticks_per_frame(params.ticks_per_frame),
            looping: params.looping,
            warmup_ticks: params.warmup_ticks,
            buffer_target: params.buffer_target,
            label: loaded.label,
            source: FrameSource::Sequence(SequenceSource {
                files,
                start_index: 0,
                looping: params.looping,
                capacity: self.config.decoder.capacity_for(params.buffer_target),
            }),
        };
        let intent = intent(PlaybackMode::Sequence, name, &params);
        self.launch(id, plan, intent)?;
        Ok(count)
    }

    /// Play a video file, or the first video in a folder
    pub fn start_video(&mut self, id: GroupId, name: &str, params: PlaybackParams) -> Result<()> {
        check_params(&params)?;
        self.bound_session(id)?;
        let file = self.library.resolve_video(name)?;
        self.start_video_file(id, file, name.to_string(), name, params)
    }

    fn start_video_file(
        &mut self,
        id: GroupId,
        file: PathBuf,
        label: String,
        name: &str,
        params: PlaybackParams,
    ) -> Result<()> {
        if self.lut.is_none() {
            return Err(SourceError::LutMissing.into());
        }
        self.probe.ensure_available()?;

        let plan = PlaybackPlan {
            mode: PlaybackMode::Video,
            cadence: Cadence::from_ticks_per_frame(params.ticks_per_frame),
            looping: params.looping,
            warmup_ticks: params.warmup_ticks,
            buffer_target: params.buffer_target,
            label,
            source: FrameSource::Video(VideoSource {
                file,
                looping: params.looping,
                capacity: self.config.decoder.capacity_for(params.buffer_target),
            }),
        };
        let intent = intent(PlaybackMode::Video, name, &params);
        self.launch(id, plan, intent)
    }

    /// Play a network stream, reconnecting until stopped
    pub fn start_live(&mut self, id: GroupId, url: &str, params: LiveParams) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ScreenError::invalid_parameter("stream url is empty"));
        }
        if params.ticks_per_frame < -1 {
            return Err(ScreenError::invalid_parameter(format!(
                "ticks_per_frame must be -1 or more, got {}",
                params.ticks_per_frame
            )));
        }
        self.bound_session(id)?;
        if self.lut.is_none() {
            return Err(SourceError::LutMissing.into());
        }
        self.probe.ensure_available()?;

        let queue_limit = if params.queue_limit > 0 {
            params.queue_limit
        } else {
            self.config.decoder.live_queue_limit
        };
        let plan = PlaybackPlan {
            mode: PlaybackMode::Live,
            cadence: Cadence::from_ticks_per_frame(params.ticks_per_frame),
            looping: true,
            warmup_ticks: 0,
            buffer_target: 0,
            label: url.to_string(),
            source: FrameSource::Live(LiveSource {
                url: url.to_string(),
                ticks_per_frame: params.ticks_per_frame,
                queue_limit,
                events: params.events,
            }),
        };
        let intent = ResumeIntent {
            mode: PlaybackMode::Live,
            source: url.to_string(),
            ticks_per_frame: params.ticks_per_frame,
            looping: true,
            warmup_ticks: 0,
            buffer_target: queue_limit,
        };
        self.launch(id, plan, intent)
    }

    fn launch(&mut self, id: GroupId, plan: PlaybackPlan, intent: ResumeIntent) -> Result<()> {
        let tick = self.clock.now();
        let ctx = ProducerContext {
            owner: id.to_string(),
            grid: self.bound_session(id)?.group().grid(),
            lut: self.lut.clone(),
            config: self.config.decoder.clone(),
        };
        self.sessions
            .get_mut(&id)
            .ok_or(ScreenError::GroupNotFound(id))?
            .start(plan, ctx, tick)?;
        self.last_active = Some(id);
        if let Err(e) = self.resume.save(id, intent) {
            warn!("screen {}: resume intent not saved: {}", id, e);
        }
        Ok(())
    }

    /// Stop playback; the last frame stays on screen
    pub fn stop(&mut self, id: GroupId) -> Result<()> {
        self.sessions
            .get_mut(&id)
            .ok_or(ScreenError::GroupNotFound(id))?
            .stop();
        self.forget_intent(id);
        Ok(())
    }

    /// Stop every group
    pub fn stop_all(&mut self) {
        let ids = self.groups();
        for id in ids {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.stop();
            }
            self.forget_intent(id);
        }
    }

    /// Stop playback and show black; returns the epoch of the black frame
    pub fn reset_to_black(&mut self, id: GroupId) -> Result<u64> {
        let epoch = self
            .sessions
            .get_mut(&id)
            .ok_or(ScreenError::GroupNotFound(id))?
            .reset_to_black()?;
        self.forget_intent(id);
        Ok(epoch)
    }

    /// Stop playback and unbind the group
    pub fn clear(&mut self, id: GroupId) -> Result<()> {
        let mut session = self.sessions.remove(&id).ok_or(ScreenError::GroupNotFound(id))?;
        session.clear();
        self.forget_intent(id);
        if self.last_active == Some(id) {
            self.last_active = None;
        }
        Ok(())
    }

    /// Unbind every group
    pub fn clear_all(&mut self) {
        for id in self.groups() {
            if let Err(e) = self.clear(id) {
                warn!("screen {}: clear failed: {}", id, e);
            }
        }
    }

    /// One-line status of a group
    pub fn describe(&self, id: GroupId) -> Result<String> {
        self.sessions
            .get(&id)
            .map(PlaybackSession::describe)
            .ok_or(ScreenError::GroupNotFound(id))
    }

    /// Status lines for every group, by id
    #[must_use]
    pub fn list_status(&self) -> Vec<String> {
        self.sessions.values().map(PlaybackSession::describe).collect()
    }

    /// Advance the clock, publish due frames and render to viewers
    ///
    /// Returns the new tick.
    pub fn on_tick(&mut self, directory: &dyn ViewerDirectory, sink: &mut dyn TileSink) -> u64 {
        let tick = self.clock.advance();
        let mut completed = Vec::new();
        for (id, session) in &mut self.sessions {
            if let TickOutcome::Completed(_) = session.on_tick(tick) {
                completed.push(*id);
            }
        }
        for id in completed {
            self.forget_intent(id);
        }
        self.render_viewers(directory, sink);
        tick
    }

    /// Offer every surface to the viewers in its partition
    ///
    /// Returns the number of tiles sent.
    pub fn render_viewers(&self, directory: &dyn ViewerDirectory, sink: &mut dyn TileSink) -> usize {
        let mut sent = 0;
        for session in self.sessions.values() {
            let group = session.group();
            if group.is_empty() {
                continue;
            }
            let viewers = directory.viewers_in(group.partition());
            for renderer in group.members() {
                for viewer in &viewers {
                    if renderer.render(viewer, sink) {
                        sent += 1;
                    }
                }
            }
        }
        sent
    }

    /// Restart playback from stored resume intents
    ///
    /// Groups must already be bound. Intents for unknown groups are kept;
    /// intents that fail to start are logged and dropped. Returns how many
    /// groups resumed.
    pub fn resume_all(&mut self) -> Result<usize> {
        let intents = self.resume.load_all()?;
        let mut resumed = 0;
        for (id, intent) in intents {
            if !self.sessions.contains_key(&id) {
                debug!("screen {}: not bound, resume deferred", id);
                continue;
            }
            let params = PlaybackParams {
                ticks_per_frame: intent.ticks_per_frame,
                looping: intent.looping,
                warmup_ticks: intent.warmup_ticks,
                buffer_target: intent.buffer_target,
            };
            let result = match intent.mode {
                PlaybackMode::Sequence => self.start_sequence(id, &intent.source, params).map(|_| ()),
                PlaybackMode::Video => self.start_video(id, &intent.source, params),
                PlaybackMode::Live => self.start_live(
                    id,
                    &intent.source,
                    LiveParams {
                        ticks_per_frame: intent.ticks_per_frame,
                        queue_limit: intent.buffer_target,
                        events: None,
                    },
                ),
                PlaybackMode::Idle => Ok(()),
            };
            match result {
                Ok(()) => {
                    info!("screen {}: resumed {} {}", id, intent.mode, intent.source);
                    resumed += 1;
                }
                Err(e) => {
                    warn!("screen {}: resume of {} failed: {}", id, intent.source, e);
                    self.forget_intent(id);
                }
            }
        }
        Ok(resumed)
    }

    /// Stop every producer but keep resume intents for the next start
    pub fn shutdown(&mut self) {
        for session in self.sessions.values_mut() {
            session.stop();
        }
        info!("Screen manager shut down at tick {}", self.clock.now());
    }

    fn bound_session(&self, id: GroupId) -> Result<&PlaybackSession> {
        let session = self.sessions.get(&id).ok_or(ScreenError::GroupNotFound(id))?;
        if session.group().is_empty() {
            return Err(ScreenError::EmptyGroup(id));
        }
        Ok(session)
    }

    fn forget_intent(&mut self, id: GroupId) {
        if let Err(e) = self.resume.remove(id) {
            warn!("screen {}: resume intent not removed: {}", id, e);
        }
    }
}

fn check_params(params: &PlaybackParams) -> Result<()> {
    if params.ticks_per_frame < -1 {
        return Err(ScreenError::invalid_parameter(format!(
            "ticks_per_frame must be -1 or more, got {}",
            params.ticks_per_frame
        )));
    }
    Ok(())
}

fn intent(mode: PlaybackMode, source: &str, params: &PlaybackParams) -> ResumeIntent {
    ResumeIntent {
        mode,
        source: source.to_string(),
        ticks_per_frame: params.ticks_per_frame,
        looping: params.looping,
        warmup_ticks: params.warmup_ticks,
        buffer_target: params.buffer_target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use tilewall_frame::{GridSize, LUT_SIZE};
    use tilewall_source::DecoderConfig;

    use crate::viewer::{Position, RecordingSink, Viewer};

    fn manager(root: &Path) -> ScreenManager {
        let config = EngineConfig::builder().media_root(root).build();
        ScreenManager::new(config).expect("manager")
    }

    fn write_folder(root: &Path, name: &str, grid: GridSize, tags: &[u8]) {
        let dir = root.join("frames").join(name);
        fs::create_dir_all(&dir).expect("mkdir");
        for (i, tag) in tags.iter().enumerate() {
            fs::write(dir.join(format!("f{}.smrf", i)), vec![*tag; grid.pixel_count()]).expect("write");
        }
    }

    fn spec(cols: u32, rows: u32) -> GroupSpec {
        GroupSpec::sequential("world", GridSize { cols, rows }, 1)
    }

    #[test]
    fn test_bind_assigns_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        assert_eq!(manager.bind(spec(1, 1)).expect("bind"), GroupId(1));
        manager.bind_with_id(GroupId(10), spec(2, 1)).expect("bind");
        assert_eq!(manager.bind(spec(1, 1)).expect("bind"), GroupId(11));
        assert!(matches!(
            manager.bind_with_id(GroupId(10), spec(1, 1)),
            Err(ScreenError::GroupExists(_))
        ));
        assert!(manager.renderer(SurfaceId(2)).is_some());
    }

    #[test]
    fn test_unknown_group() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        assert!(matches!(manager.stop(GroupId(4)), Err(ScreenError::GroupNotFound(_))));
        assert!(matches!(manager.describe(GroupId(4)), Err(ScreenError::GroupNotFound(_))));
        assert!(matches!(
            manager.start_sequence(GroupId(4), "x", PlaybackParams::default()),
            Err(ScreenError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_start_errors_leave_session_idle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        let id = manager.bind(spec(2, 1)).expect("bind");

        let err = manager
            .start_sequence(id, "missing", PlaybackParams::default())
            .expect_err("missing folder");
        assert!(matches!(err, ScreenError::Source(SourceError::NotFound(_))));

        write_folder(dir.path(), "small", GridSize { cols: 1, rows: 1 }, &[1]);
        let err = manager
            .start_sequence(id, "small", PlaybackParams::default())
            .expect_err("wrong size");
        assert!(matches!(err, ScreenError::Source(SourceError::DimensionMismatch { .. })));

        let params = PlaybackParams {
            ticks_per_frame: -3,
            ..Default::default()
        };
        assert!(matches!(
            manager.start_sequence(id, "small", params),
            Err(ScreenError::InvalidParameter(_))
        ));

        assert_eq!(manager.session(id).map(PlaybackSession::mode), Some(PlaybackMode::Idle));
        assert!(manager.last_active().is_none());
    }

    #[test]
    fn test_decoder_sources_need_lut() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        let id = manager.bind(spec(1, 1)).expect("bind");
        fs::create_dir_all(dir.path().join("frames")).expect("mkdir");
        fs::write(dir.path().join("frames").join("clip.mp4"), b"not a video").expect("write");

        assert!(matches!(
            manager.start_video(id, "clip.mp4", PlaybackParams::default()),
            Err(ScreenError::Source(SourceError::LutMissing))
        ));
        assert!(matches!(
            manager.start_live(id, "rtmp://example.invalid/live", LiveParams::default()),
            Err(ScreenError::Source(SourceError::LutMissing))
        ));
        assert!(matches!(
            manager.start_live(id, " ", LiveParams::default()),
            Err(ScreenError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_decoder_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = EngineConfig::builder()
            .media_root(dir.path())
            .decoder(
                DecoderConfig::builder()
                    .decoder_binary("tilewall-no-such-decoder")
                    .build(),
            )
            .build();
        let lut = ColorLut::from_bytes(vec![0; LUT_SIZE]).expect("lut");
        let mut manager = ScreenManager::with_parts(
            config,
            Some(lut),
            Box::new(MemoryResumeStore::new()),
            TickClock::new(),
        )
        .expect("manager");
        let id = manager.bind(spec(1, 1)).expect("bind");

        assert!(matches!(
            manager.start_live(id, "rtmp://example.invalid/live", LiveParams::default()),
            Err(ScreenError::Source(SourceError::DecoderUnavailable(_)))
        ));
    }

    #[test]
    fn test_sequence_publishes_and_renders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        let grid = GridSize { cols: 2, rows: 1 };
        write_folder(dir.path(), "intro", grid, &[4, 5]);
        let id = manager.bind(spec(2, 1)).expect("bind");

        let params = PlaybackParams {
            ticks_per_frame: 1,
            looping: true,
            ..Default::default()
        };
        assert_eq!(manager.start_sequence(id, "intro", params).expect("start"), 2);
        assert_eq!(manager.last_active(), Some(id));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while manager.session(id).map_or(0, |s| s.queue().len()) < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let viewers = vec![
            Viewer::new(1, "world", Position::default()),
            Viewer::new(2, "elsewhere", Position::default()),
        ];
        let mut sink = RecordingSink::new();
        assert_eq!(manager.on_tick(&viewers, &mut sink), 1);
        assert_eq!(sink.sends.len(), 2);
        assert!(sink.sends.iter().all(|(v, _, tag)| v.0 == 1 && *tag == 4));

        // Already up to date: rendering again sends nothing
        assert_eq!(manager.render_viewers(&viewers, &mut sink), 0);

        let status = manager.describe(id).expect("describe");
        assert!(status.starts_with("screen 1: binding=2 maps layout=2x1 frames=2 tpf=1 loop=true"));
        assert!(status.ends_with("source=intro"));
    }

    #[test]
    fn test_reset_to_black_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manager = manager(dir.path());
        let id = manager.bind(spec(1, 2)).expect("bind");

        assert_eq!(manager.reset_to_black(id).expect("black"), 1);
        let viewers = vec![Viewer::new(1, "world", Position::default())];
        let mut sink = RecordingSink::new();
        assert_eq!(manager.render_viewers(&viewers, &mut sink), 2);

        manager.clear(id).expect("clear");
        assert!(manager.group(id).is_none());
        assert!(manager.list_status().is_empty());
    }

    #[test]
    fn test_corrupt_resume_file_does_not_block_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resume_path = dir.path().join("resume.json");
        fs::write(&resume_path, b"\x00 not json").expect("write");
        let config = EngineConfig::builder()
            .media_root(dir.path())
            .resume_path(&resume_path)
            .build();

        let mut manager = ScreenManager::new(config).expect("manager");
        manager.bind(spec(1, 1)).expect("bind");
        assert_eq!(manager.resume_all().expect("resume"), 0);
        assert!(dir.path().join("resume.json.bad").exists());
    }

    #[test]
    fn test_sequence_with_broken_file_completes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resume_path = dir.path().join("resume.json");
        let config = EngineConfig::builder()
            .media_root(dir.path())
            .resume_path(&resume_path)
            .build();
        let grid = GridSize { cols: 1, rows: 1 };
        write_folder(dir.path(), "once", grid, &[1, 2, 3]);
        fs::write(dir.path().join("frames").join("once").join("f1.smrf"), b"truncated").expect("write");

        let mut manager = ScreenManager::new(config).expect("manager");
        let id = manager.bind(spec(1, 1)).expect("bind");
        let params = PlaybackParams {
            ticks_per_frame: 1,
            looping: false,
            ..Default::default()
        };
        assert_eq!(manager.start_sequence(id, "once", params).expect("start"), 3);

        let viewers = vec![Viewer::new(1, "world", Position::default())];
        let mut sink = RecordingSink::new();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while manager.session(id).map(PlaybackSession::mode) != Some(PlaybackMode::Idle)
            && std::time::Instant::now() < deadline
        {
            manager.on_tick(&viewers, &mut sink);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        assert_eq!(manager.session(id).map(PlaybackSession::mode), Some(PlaybackMode::Idle));
        // Stopping clears seen maps, so the last frame may go out twice
        let mut tags: Vec<u8> = sink.sends.iter().map(|(_, _, tag)| *tag).collect();
        tags.dedup();
        assert_eq!(tags, vec![1, 3]);
        let store = JsonResumeStore::open(&resume_path).expect("store");
        assert!(store.load_all().expect("load").is_empty());
    }

    #[test]
    fn test_intents_follow_playback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resume_path = dir.path().join("resume.json");
        let config = EngineConfig::builder()
            .media_root(dir.path())
            .resume_path(&resume_path)
            .build();
        let grid = GridSize { cols: 1, rows: 1 };
        write_folder(dir.path(), "loop", grid, &[1, 2, 3]);

        let mut manager = ScreenManager::new(config.clone()).expect("manager");
        let id = manager.bind(spec(1, 1)).expect("bind");
        let params = PlaybackParams {
            looping: true,
            ..Default::default()
        };
        manager.start_sequence(id, "loop", params).expect("start");
        manager.shutdown();
        drop(manager);

        let mut restarted = ScreenManager::new(config).expect("manager");
        restarted.bind_with_id(id, spec(1, 1)).expect("bind");
        assert_eq!(restarted.resume_all().expect("resume"), 1);
        assert_eq!(restarted.session(id).map(PlaybackSession::mode), Some(PlaybackMode::Sequence));

        restarted.stop(id).expect("stop");
        drop(restarted);
        let store = JsonResumeStore::open(&resume_path).expect("store");
        assert!(store.load_all().expect("load").is_empty());
    }
}
