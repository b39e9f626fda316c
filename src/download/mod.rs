//! # Download Module
//!
//! The batch download core: a strictly ordered, single-checkout queue of
//! tracks and the executor that drives it to completion.
//!
//! ```text
//! candidate tracks
//!       ↓
//! BatchDownloader ── cache lookup / record (TrackCache)
//!       │         ── cancellation check (CancellationToken)
//!       │         ── lifecycle events (DownloadObserver)
//!       ↓
//! DownloadQueue: Pending → InFlight → Downloaded | Filtered | Skipped | Failed
//!       ↓
//! QueueResult
//! ```
//!
//! Tracks are processed one by one in input order. Cancellation is checked
//! between tracks only; an interrupted batch leaves the unprocessed tracks in
//! [`QueueResult::remaining`].

mod cancellation;
mod downloader;
mod executor;
mod observer;
mod queue;
mod retry;
mod track;
mod ytdlp;

pub use cancellation::CancellationToken;
pub use downloader::{DownloadOutcome, Downloader};
pub use executor::{BatchDownloader, BatchOptions};
pub use observer::{DownloadObserver, NoopObserver};
pub use queue::{DownloadQueue, QueueResult};
pub use retry::Retrying;
pub use track::{
    Downloaded, Failed, Filtered, Outcome, OutcomeKind, SKIP_ALREADY_CACHED,
    SKIP_DOWNLOAD_SUPPRESSED, Skipped, TrackId, TrackInfo,
};
pub use ytdlp::{
    NOT_A_SONG, OutputLine, RawInfo, STAGE_DOWNLOAD, STAGE_MOVE, STAGE_POSTPROCESS, YtDlpDownloader,
    main_artist, parse_line,
};
