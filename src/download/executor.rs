use log::{debug, info, warn};

use crate::{
    download::{
        cancellation::CancellationToken,
        downloader::{DownloadOutcome, Downloader},
        observer::{DownloadObserver, NoopObserver},
        queue::{DownloadQueue, QueueResult},
        track::{Outcome, SKIP_ALREADY_CACHED, SKIP_DOWNLOAD_SUPPRESSED, TrackId},
    },
    error::{DownloadError, QueueError},
    management::TrackCache,
};

static NOOP_OBSERVER: NoopObserver = NoopObserver;

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Stop once this many tracks were downloaded.
    pub limit: Option<usize>,
    /// Resolve uncached tracks as skipped instead of downloading them.
    pub skip_download: bool,
}

/// Drives one batch: every track goes through a fresh [`DownloadQueue`]
/// strictly in input order, one at a time.
///
/// Per-track download failures become [`Outcome::Failed`]; only queue protocol
/// violations are returned as errors.
pub struct BatchDownloader<'a, D: Downloader + ?Sized, C: TrackCache + ?Sized> {
    downloader: &'a D,
    cache: &'a mut C,
    cancellation_token: CancellationToken,
    observer: &'a dyn DownloadObserver,
    options: BatchOptions,
}

impl<'a, D: Downloader + ?Sized, C: TrackCache + ?Sized> BatchDownloader<'a, D, C> {
    pub fn new(downloader: &'a D, cache: &'a mut C, cancellation_token: CancellationToken) -> Self {
        Self {
            downloader,
            cache,
            cancellation_token,
            observer: &NOOP_OBSERVER,
            options: BatchOptions::default(),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn DownloadObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(mut self, tracks: Vec<TrackId>) -> Result<QueueResult, QueueError> {
        info!(
            "starting batch download of {} tracks, limit={:?}, skip_download={}",
            tracks.len(),
            self.options.limit,
            self.options.skip_download
        );

        let mut queue = DownloadQueue::new(tracks);
        let mut downloaded = 0;

        loop {
            if let Some(limit) = self.options.limit {
                if downloaded >= limit {
                    info!("stopping batch: limit of {} downloads reached", limit);
                    break;
                }
            }

            let Some(track_id) = queue.next()? else {
                break;
            };
            debug!("checked out {}", track_id);

            if self.cancellation_token.kill_requested() {
                info!("stopping batch: cancel was requested");
                queue.return_to_queue()?;
                break;
            }

            let outcome = if self.cache.contains(&track_id) {
                queue.complete_as_skipped(SKIP_ALREADY_CACHED)?
            } else if self.options.skip_download {
                queue.complete_as_skipped(SKIP_DOWNLOAD_SUPPRESSED)?
            } else {
                let result = {
                    let _item = ItemScope::start(self.observer, &track_id);
                    self.downloader.download(&track_id, self.observer).await
                };
                self.resolve(&mut queue, &track_id, result).await?
            };

            if let Outcome::Downloaded(_) = outcome {
                downloaded += 1;
            }
            info!("{}: {}", outcome.kind(), track_id);
            self.observer.on_outcome(&outcome);
        }

        let result = queue.result()?;
        info!(
            "batch ended: {} resolved, {} remaining",
            result.resolved(),
            result.remaining.len()
        );
        Ok(result)
    }

    async fn resolve(
        &mut self,
        queue: &mut DownloadQueue,
        track_id: &TrackId,
        result: Result<DownloadOutcome, DownloadError>,
    ) -> Result<Outcome, QueueError> {
        match result {
            Ok(DownloadOutcome::Downloaded { path, info }) => {
                let outcome = queue.complete_as_downloaded(path, info.clone())?;
                if let Err(e) = self.cache.record_metadata(info).await {
                    warn!("cannot cache metadata of {}: {}", track_id, e);
                }
                if let Err(e) = self.cache.record_outcome(track_id, None).await {
                    warn!("cannot cache download of {}: {}", track_id, e);
                }
                Ok(outcome)
            }
            Ok(DownloadOutcome::Filtered { reason }) => {
                let outcome = queue.complete_as_filtered(reason.clone())?;
                if let Err(e) = self.cache.record_outcome(track_id, Some(reason)).await {
                    warn!("cannot cache filtered track {}: {}", track_id, e);
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!("download of {} failed: {}", track_id, e);
                queue.complete_as_failed(e)
            }
        }
    }
}

/// Brackets one downloader call with start/end notifications. The end event
/// is sent on drop, so it also fires when the call unwinds.
struct ItemScope<'a> {
    observer: &'a dyn DownloadObserver,
    track_id: &'a TrackId,
}

impl<'a> ItemScope<'a> {
    fn start(observer: &'a dyn DownloadObserver, track_id: &'a TrackId) -> Self {
        observer.on_item_start(track_id);
        Self { observer, track_id }
    }
}

impl Drop for ItemScope<'_> {
    fn drop(&mut self) {
        self.observer.on_item_end(self.track_id);
    }
}
