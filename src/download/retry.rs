use std::time::Duration;

use async_trait::async_trait;
use log::warn;

use crate::{
    download::{
        cancellation::CancellationToken,
        downloader::{DownloadOutcome, Downloader},
        observer::DownloadObserver,
        track::TrackId,
    },
    error::DownloadError,
    utils,
};

const MAX_DELAY: Duration = Duration::from_secs(300);

/// Retries transient failures of the wrapped downloader with exponential
/// backoff. Filtered tracks and non-retryable errors pass straight through.
pub struct Retrying<D> {
    inner: D,
    attempts: u32,
    base_delay: Duration,
    cancellation_token: CancellationToken,
}

impl<D: Downloader> Retrying<D> {
    /// `attempts` counts the first try, so `1` never retries.
    pub fn new(
        inner: D,
        attempts: u32,
        base_delay: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay,
            cancellation_token,
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }
}

#[async_trait]
impl<D: Downloader> Downloader for Retrying<D> {
    async fn download(
        &self,
        track_id: &TrackId,
        observer: &dyn DownloadObserver,
    ) -> Result<DownloadOutcome, DownloadError> {
        let mut attempt = 1;
        loop {
            let err = match self.inner.download(track_id, observer).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => err,
            };

            if attempt >= self.attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(
                "download of {} failed (attempt {}/{}), retrying in {:?}: {}",
                track_id, attempt, self.attempts, delay, err
            );
            if !utils::sleep_with_cancel(delay, &self.cancellation_token).await {
                return Err(err);
            }
            attempt += 1;
        }
    }
}
