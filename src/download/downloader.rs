use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    download::{
        observer::DownloadObserver,
        track::{TrackId, TrackInfo},
    },
    error::DownloadError,
};

/// What a downloader made of a track, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Audio was stored at `path` with `info` embedded.
    Downloaded { path: PathBuf, info: TrackInfo },
    /// The item is not music (e.g. a plain video). A stable classification,
    /// not an error.
    Filtered { reason: String },
}

/// Fetches one track and runs its post-processing.
///
/// Implementations report byte and stage progress to `observer` while working.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        track_id: &TrackId,
        observer: &dyn DownloadObserver,
    ) -> Result<DownloadOutcome, DownloadError>;
}

#[async_trait]
impl<D: Downloader + ?Sized> Downloader for Box<D> {
    async fn download(
        &self,
        track_id: &TrackId,
        observer: &dyn DownloadObserver,
    ) -> Result<DownloadOutcome, DownloadError> {
        (**self).download(track_id, observer).await
    }
}
