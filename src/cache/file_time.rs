//! File timestamps
//!
//! Access/creation/modify times of cache files, used to rebuild recency
//! order when a disk cache starts over an existing directory.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamps of one file in Unix milliseconds.
///
/// A field is None when the platform or filesystem does not record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub created: Option<u64>,
    pub accessed: Option<u64>,
    pub modified: Option<u64>,
}

impl FileTimes {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            created: metadata.created().ok().and_then(to_millis),
            accessed: metadata.accessed().ok().and_then(to_millis),
            modified: metadata.modified().ok().and_then(to_millis),
        }
    }

    /// Best estimate of the last use of the file.
    ///
    /// Access time when recorded (relatime/noatime mounts make it coarse),
    /// then modify time, then creation time.
    pub fn last_use(&self) -> Option<u64> {
        match (self.accessed, self.modified) {
            (Some(a), Some(m)) => Some(a.max(m)),
            (Some(a), None) => Some(a),
            (None, Some(m)) => Some(m),
            (None, None) => self.created,
        }
    }
}

fn to_millis(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}
