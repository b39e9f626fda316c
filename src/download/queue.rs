use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use crate::{
    download::track::{Downloaded, Failed, Filtered, Outcome, Skipped, TrackId, TrackInfo},
    error::{DownloadError, QueueError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Checkout {
    Idle,
    CheckedOut(TrackId),
}

/// Ordered work list of one batch.
///
/// Tracks are handed out one at a time in input order. A checked out track
/// must be completed (or returned) before the next one can be taken.
#[derive(Debug)]
pub struct DownloadQueue {
    original: Vec<TrackId>,
    pending: VecDeque<TrackId>,
    checkout: Checkout,
    downloaded: Vec<Downloaded>,
    filtered: Vec<Filtered>,
    skipped: Vec<Skipped>,
    failed: Vec<Failed>,
}

/// Immutable snapshot of a queue.
#[derive(Debug, Clone)]
pub struct QueueResult {
    /// Everything that was requested, in input order.
    pub original: Vec<TrackId>,
    /// Tracks that were never resolved, in input order.
    pub remaining: Vec<TrackId>,
    pub downloaded: Vec<Downloaded>,
    pub filtered: Vec<Filtered>,
    pub skipped: Vec<Skipped>,
    pub failed: Vec<Failed>,
}

impl DownloadQueue {
    pub fn new(tracks: Vec<TrackId>) -> Self {
        Self {
            pending: tracks.iter().cloned().collect(),
            original: tracks,
            checkout: Checkout::Idle,
            downloaded: Vec::new(),
            filtered: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Checks out the next track.
    ///
    /// Returns `Ok(None)` once nothing is pending.
    pub fn next(&mut self) -> Result<Option<TrackId>, QueueError> {
        if let Checkout::CheckedOut(current) = &self.checkout {
            return Err(QueueError::ItemNotCompleted(current.clone()));
        }

        let Some(track_id) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.checkout = Checkout::CheckedOut(track_id.clone());
        Ok(Some(track_id))
    }

    pub fn current(&self) -> Option<&TrackId> {
        match &self.checkout {
            Checkout::CheckedOut(track_id) => Some(track_id),
            Checkout::Idle => None,
        }
    }

    pub fn complete_as_downloaded(
        &mut self,
        path: PathBuf,
        info: TrackInfo,
    ) -> Result<Outcome, QueueError> {
        let track_id = self.release()?;
        let downloaded = Downloaded {
            track_id,
            path,
            info,
        };
        self.downloaded.push(downloaded.clone());
        Ok(Outcome::Downloaded(downloaded))
    }

    pub fn complete_as_filtered(&mut self, reason: impl Into<String>) -> Result<Outcome, QueueError> {
        let track_id = self.release()?;
        let filtered = Filtered {
            track_id,
            reason: reason.into(),
        };
        self.filtered.push(filtered.clone());
        Ok(Outcome::Filtered(filtered))
    }

    pub fn complete_as_skipped(&mut self, reason: impl Into<String>) -> Result<Outcome, QueueError> {
        let track_id = self.release()?;
        let skipped = Skipped {
            track_id,
            reason: reason.into(),
        };
        self.skipped.push(skipped.clone());
        Ok(Outcome::Skipped(skipped))
    }

    pub fn complete_as_failed(&mut self, error: DownloadError) -> Result<Outcome, QueueError> {
        let track_id = self.release()?;
        let failed = Failed {
            track_id,
            error: Arc::new(error),
        };
        self.failed.push(failed.clone());
        Ok(Outcome::Failed(failed))
    }

    /// Puts the checked out track back in front of the pending list without
    /// recording an outcome.
    pub fn return_to_queue(&mut self) -> Result<(), QueueError> {
        let track_id = self.release()?;
        self.pending.push_front(track_id);
        Ok(())
    }

    pub fn result(&self) -> Result<QueueResult, QueueError> {
        if let Checkout::CheckedOut(current) = &self.checkout {
            return Err(QueueError::HasUncompleteItem(current.clone()));
        }

        Ok(QueueResult {
            original: self.original.clone(),
            remaining: self.pending.iter().cloned().collect(),
            downloaded: self.downloaded.clone(),
            filtered: self.filtered.clone(),
            skipped: self.skipped.clone(),
            failed: self.failed.clone(),
        })
    }

    /// Number of tracks not yet checked out.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn release(&mut self) -> Result<TrackId, QueueError> {
        match std::mem::replace(&mut self.checkout, Checkout::Idle) {
            Checkout::CheckedOut(track_id) => Ok(track_id),
            Checkout::Idle => Err(QueueError::ItemModifyNotAllowed),
        }
    }
}

impl QueueResult {
    pub fn resolved(&self) -> usize {
        self.downloaded.len() + self.filtered.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}
