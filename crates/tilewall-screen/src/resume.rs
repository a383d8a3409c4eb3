//! Resume intents
//!
//! A resume intent records what a screen was playing so that playback can
//! be re-armed after a restart. One is written when playback starts and
//! removed when it stops or the screen is cleared.
//!
//! [`JsonResumeStore`] keeps intents in a small JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "screens": [
//!     { "group": 3, "intent": { "mode": "sequence", "source": "intro",
//!       "ticks_per_frame": 2, "looping": true, "warmup_ticks": 0,
//!       "buffer_target": 0 } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, ScreenError};
use crate::group::GroupId;
use crate::session::PlaybackMode;

const FORMAT_VERSION: u32 = 1;

/// What a screen should resume doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeIntent {
    /// Playback mode; never [`PlaybackMode::Idle`]
    pub mode: PlaybackMode,
    /// Folder name, video name or stream URL
    pub source: String,
    /// Cadence as given to the start call
    pub ticks_per_frame: i32,
    pub looping: bool,
    pub warmup_ticks: u64,
    /// Pre-roll target, or the queue limit for live streams
    pub buffer_target: usize,
}

impl ResumeIntent {
    /// Reject intents that describe no playback
    pub fn ensure_resumable(&self) -> Result<()> {
        if self.mode == PlaybackMode::Idle {
            return Err(ScreenError::persistence("idle sessions have nothing to resume"));
        }
        Ok(())
    }
}

/// Storage for resume intents, keyed by group
///
/// Every implementation refuses [`PlaybackMode::Idle`] intents on `save`.
pub trait ResumeStore: Send {
    /// Every stored intent
    fn load_all(&self) -> Result<BTreeMap<GroupId, ResumeIntent>>;

    /// Store or replace the intent for `group`
    fn save(&mut self, group: GroupId, intent: ResumeIntent) -> Result<()>;

    /// Forget the intent for `group`; missing entries are fine
    fn remove(&mut self, group: GroupId) -> Result<()>;
}

/// In-memory store, for tests and embedders without persistence
#[derive(Debug, Default, Clone)]
pub struct MemoryResumeStore {
    intents: BTreeMap<GroupId, ResumeIntent>,
}

impl MemoryResumeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResumeStore for MemoryResumeStore {
    fn load_all(&self) -> Result<BTreeMap<GroupId, ResumeIntent>> {
        Ok(self.intents.clone())
    }

    fn save(&mut self, group: GroupId, intent: ResumeIntent) -> Result<()> {
        intent.ensure_resumable()?;
        self.intents.insert(group, intent);
        Ok(())
    }

    fn remove(&mut self, group: GroupId) -> Result<()> {
        self.intents.remove(&group);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ResumeRecord {
    group: GroupId,
    intent: ResumeIntent,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResumeDocument {
    version: u32,
    #[serde(default)]
    screens: Vec<ResumeRecord>,
}

/// Store backed by a JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonResumeStore {
    path: PathBuf,
    intents: BTreeMap<GroupId, ResumeIntent>,
}

impl JsonResumeStore {
    /// Open the store at `path`, loading existing intents if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let intents = if path.exists() {
            let document: ResumeDocument = serde_json::from_slice(&fs::read(&path)?)?;
            if document.version != FORMAT_VERSION {
                return Err(ScreenError::persistence(format!(
                    "{}: unsupported version {}",
                    path.display(),
                    document.version
                )));
            }
            document
                .screens
                .into_iter()
                .map(|record| (record.group, record.intent))
                .collect()
        } else {
            BTreeMap::new()
        };
        info!("Loaded {} resume intent(s) from {}", intents.len(), path.display());
        Ok(Self { path, intents })
    }

    /// Open the store at `path`, starting empty if the file is unreadable
    ///
    /// A file that fails to parse or carries an unknown version is renamed
    /// to `<path>.bad` so the next write does not destroy it.
    pub fn open_or_discard(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                let mut aside = path.clone().into_os_string();
                aside.push(".bad");
                let aside = PathBuf::from(aside);
                match fs::rename(&path, &aside) {
                    Ok(()) => warn!(
                        "Ignoring resume intents in {} ({}); moved to {}",
                        path.display(),
                        e,
                        aside.display()
                    ),
                    Err(rename) => warn!(
                        "Ignoring resume intents in {} ({}); could not move it aside: {}",
                        path.display(),
                        e,
                        rename
                    ),
                }
                Self {
                    path,
                    intents: BTreeMap::new(),
                }
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let document = ResumeDocument {
            version: FORMAT_VERSION,
            screens: self
                .intents
                .iter()
                .map(|(group, intent)| ResumeRecord {
                    group: *group,
                    intent: intent.clone(),
                })
                .collect(),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&document)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} resume intent(s) to {}", self.intents.len(), self.path.display());
        Ok(())
    }
}

impl ResumeStore for JsonResumeStore {
    fn load_all(&self) -> Result<BTreeMap<GroupId, ResumeIntent>> {
        Ok(self.intents.clone())
    }

    fn save(&mut self, group: GroupId, intent: ResumeIntent) -> Result<()> {
        intent.ensure_resumable()?;
        self.intents.insert(group, intent);
        self.flush()
    }

    fn remove(&mut self, group: GroupId) -> Result<()> {
        if self.intents.remove(&group).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
