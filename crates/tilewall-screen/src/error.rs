//! Error types for screen operations
//!
//! Provides typed errors that callers of the command surface can match and
//! report back to whoever issued the command.
//!
//! # Examples
//!
//! ```no_run
//! # use tilewall_screen::{EngineConfig, GroupId, PlaybackParams, ScreenError, ScreenManager};
//! # fn example() -> Result<(), ScreenError> {
//! let mut manager = ScreenManager::new(EngineConfig::default())?;
//!
//! match manager.start_sequence(GroupId(1), "intro", PlaybackParams::default()) {
//!     Ok(frames) => println!("Playing {} frames", frames),
//!     Err(ScreenError::GroupNotFound(id)) => eprintln!("No screen {}", id),
//!     Err(ScreenError::Source(e)) => eprintln!("Cannot load source: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;
use tilewall_source::SourceError;

use crate::group::GroupId;

/// Errors that can occur during screen operations
#[derive(Error, Debug)]
pub enum ScreenError {
    /// No surface group is bound under this id
    #[error("Screen {0} not found")]
    GroupNotFound(GroupId),

    /// A surface group is already bound under this id
    #[error("Screen {0} already exists")]
    GroupExists(GroupId),

    /// Surface list does not match the declared layout
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// The group has no surfaces (it was cleared)
    #[error("Screen {0} has no surfaces bound")]
    EmptyGroup(GroupId),

    /// A playback parameter is out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Source could not be prepared
    ///
    /// Missing folders, wrong frame sizes, a missing color table or a
    /// missing decoder all land here. Nothing was started.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Resume intent store failed
    #[error("Resume store error: {0}")]
    Persistence(String),

    /// I/O operation failed
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for screen operations
pub type Result<T> = std::result::Result<T, ScreenError>;

impl ScreenError {
    pub(crate) fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ScreenError::GroupNotFound(GroupId(4)).to_string(), "Screen 4 not found");
        assert_eq!(
            ScreenError::invalid_layout("expected 4 surfaces, got 3").to_string(),
            "Invalid layout: expected 4 surfaces, got 3"
        );
    }

    #[test]
    fn test_source_error_conversion() {
        let err: ScreenError = SourceError::LutMissing.into();
        assert!(matches!(err, ScreenError::Source(SourceError::LutMissing)));
        assert!(err.to_string().starts_with("Source error:"));
    }
}
