use std::{collections::HashSet, hash::Hash, io, path::Path, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use tokio::time::sleep;

use crate::{
    download::{CancellationToken, Outcome, OutcomeKind, QueueResult, TrackId},
    types::{FailureTableRow, OutcomeTableRow},
};

const PARTIAL_FILE_EXTENSIONS: [&str; 2] = ["part", "ytdl"];

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Keeps the first element for every key, preserving order.
pub fn dedupe_by_key<T, K, F>(items: &mut Vec<T>, key: F)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

pub fn remove_duplicate_tracks(tracks: &mut Vec<TrackId>) {
    dedupe_by_key(tracks, |t| t.clone());
}

/// Total download attempts for `retries` extra tries.
pub fn attempts_for_retries(retries: u32) -> u32 {
    retries.saturating_add(1)
}

/// Sleeps for `duration` unless a kill is requested first.
///
/// Returns `false` when the sleep was cut short.
pub async fn sleep_with_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.killed() => false,
        _ = sleep(duration) => true,
    }
}

/// Removes leftovers of interrupted downloads (`*.part`, `*.ytdl`) directly
/// inside `dir`. A missing directory counts as clean.
pub async fn clean_partial_files(dir: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_partial = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PARTIAL_FILE_EXTENSIONS.contains(&ext));
        if is_partial && entry.file_type().await?.is_file() {
            tokio::fs::remove_file(&path).await?;
            log::debug!("removed partial file {}", path.display());
            removed += 1;
        }
    }

    Ok(removed)
}

/// Count of every outcome kind plus remaining and total, in display order.
pub fn outcome_table_rows(result: &QueueResult) -> Vec<OutcomeTableRow> {
    let mut rows: Vec<OutcomeTableRow> = OutcomeKind::ALL
        .iter()
        .map(|kind| OutcomeTableRow {
            result: kind.to_string(),
            count: match kind {
                OutcomeKind::Downloaded => result.downloaded.len(),
                OutcomeKind::Filtered => result.filtered.len(),
                OutcomeKind::Skipped => result.skipped.len(),
                OutcomeKind::Failed => result.failed.len(),
            },
        })
        .collect();

    rows.push(OutcomeTableRow {
        result: "Remaining".to_string(),
        count: result.remaining.len(),
    });
    rows.push(OutcomeTableRow {
        result: "Total".to_string(),
        count: result.original.len(),
    });
    rows
}

pub fn failure_table_rows(result: &QueueResult) -> Vec<FailureTableRow> {
    result
        .failed
        .iter()
        .map(|f| FailureTableRow {
            track: f.track_id.to_string(),
            error: f.error.to_string(),
        })
        .collect()
}

/// One line per resolved track, as shown while a batch runs.
pub fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Downloaded(d) => {
            format!("{} - {} [{}]", d.info.artist, d.info.title, d.track_id)
        }
        Outcome::Filtered(f) => format!("{} ({})", f.track_id, f.reason),
        Outcome::Skipped(s) => format!("{} ({})", s.track_id, s.reason),
        Outcome::Failed(f) => format!("{}: {}", f.track_id, f.error),
    }
}
