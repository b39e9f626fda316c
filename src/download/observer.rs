use crate::download::track::{Outcome, TrackId};

/// Receives lifecycle and progress events of a batch.
///
/// Events are purely observational and never influence the queue.
pub trait DownloadObserver: Send + Sync {
    /// A track is about to be handed to the downloader.
    fn on_item_start(&self, track_id: &TrackId);

    /// The downloader is done with a track, whatever the result was.
    fn on_item_end(&self, track_id: &TrackId);

    fn on_download_progress(&self, downloaded_bytes: u64, total_bytes: Option<u64>, filename: &str);

    fn on_stage_start(&self, name: &str);

    fn on_stage_finish(&self, name: &str);

    /// A track was resolved to its outcome.
    fn on_outcome(&self, _outcome: &Outcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {
    fn on_item_start(&self, _track_id: &TrackId) {}

    fn on_item_end(&self, _track_id: &TrackId) {}

    fn on_download_progress(&self, _downloaded: u64, _total: Option<u64>, _filename: &str) {}

    fn on_stage_start(&self, _name: &str) {}

    fn on_stage_finish(&self, _name: &str) {}
}
