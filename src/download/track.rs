use std::{fmt, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::DownloadError;

pub const SKIP_ALREADY_CACHED: &str = "already in cache";
pub const SKIP_DOWNLOAD_SUPPRESSED: &str = "download suppressed";

/// Opaque identifier of a remote media item (a YouTube video id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self) -> String {
        format!("https://music.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata of a song, as extracted by the downloader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: TrackId,
    pub title: String,
    /// Length in seconds.
    pub duration: u64,
    pub channel: Option<String>,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub track_id: TrackId,
    pub path: PathBuf,
    pub info: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub track_id: TrackId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub track_id: TrackId,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Failed {
    pub track_id: TrackId,
    pub error: Arc<DownloadError>,
}

/// Terminal classification of one track in a batch.
///
/// Only `Downloaded` and `Filtered` are durable facts about a track and end up
/// in the cache; `Skipped` and `Failed` live for the current run only.
#[derive(Debug, Clone)]
pub enum Outcome {
    Downloaded(Downloaded),
    Filtered(Filtered),
    Skipped(Skipped),
    Failed(Failed),
}

impl Outcome {
    pub fn track_id(&self) -> &TrackId {
        match self {
            Outcome::Downloaded(d) => &d.track_id,
            Outcome::Filtered(f) => &f.track_id,
            Outcome::Skipped(s) => &s.track_id,
            Outcome::Failed(f) => &f.track_id,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Downloaded(_) => OutcomeKind::Downloaded,
            Outcome::Filtered(_) => OutcomeKind::Filtered,
            Outcome::Skipped(_) => OutcomeKind::Skipped,
            Outcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, Outcome::Downloaded(_) | Outcome::Filtered(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Downloaded,
    Filtered,
    Skipped,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 4] = [
        OutcomeKind::Downloaded,
        OutcomeKind::Filtered,
        OutcomeKind::Skipped,
        OutcomeKind::Failed,
    ];
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeKind::Downloaded => "Downloaded",
            OutcomeKind::Filtered => "Filtered",
            OutcomeKind::Skipped => "Skipped",
            OutcomeKind::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}
