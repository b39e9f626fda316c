//! Typed errors for the download core and its persistence layer.
//!
//! Glue code (CLI, API client) keeps using the boxed [`crate::Res`] alias; the
//! enums here are for the places where callers need to tell failures apart.

use std::{io, process::ExitStatus};

use thiserror::Error;

use crate::download::TrackId;

/// Misuse of the download queue's checkout protocol.
///
/// These indicate a bug in the caller, never a per-track runtime condition,
/// and are never converted into an outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// `next()` was called while a track was still checked out.
    #[error("track {0} is checked out and was not completed")]
    ItemNotCompleted(TrackId),

    /// A completion or rollback was attempted with nothing checked out.
    #[error("no checked out track to modify")]
    ItemModifyNotAllowed,

    /// A snapshot was requested mid-transition.
    #[error("download queue has an uncompleted track: {0}")]
    HasUncompleteItem(TrackId),
}

/// Failure of a single track download.
///
/// Filtering is not an error: it is reported through
/// [`crate::download::DownloadOutcome::Filtered`].
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("downloader exited with {status}: {stderr}")]
    Process { status: ExitStatus, stderr: String },

    #[error("unexpected downloader output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("downloader did not report an output file")]
    MissingOutput,

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl DownloadError {
    /// Whether trying the same track again may succeed.
    ///
    /// Malformed upstream data and a missing program will fail the same way
    /// on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Spawn { .. } => false,
            DownloadError::Parse(_) => false,
            DownloadError::MissingOutput => false,
            DownloadError::Io(_) => true,
            DownloadError::Process { .. } => true,
            DownloadError::Network(_) => true,
            DownloadError::Other(_) => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("config io error: {0}")]
    Io(#[from] io::Error),

    #[error("config serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
