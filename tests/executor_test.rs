use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use async_trait::async_trait;
use musync::download::{
    BatchDownloader, BatchOptions, CancellationToken, DownloadObserver, DownloadOutcome,
    Downloader, NOT_A_SONG, Outcome, SKIP_ALREADY_CACHED, SKIP_DOWNLOAD_SUPPRESSED, TrackId,
    TrackInfo,
};
use musync::error::{CacheError, DownloadError};
use musync::management::{CachedTrack, MemoryCache, TrackCache};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Song,
    Video,
    Transient,
    /// Succeeds, but requests cancellation while downloading.
    SongThenCancel,
}

// Scripted downloader: behavior is looked up by id, default is a song.
struct FakeDownloader {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<TrackId>>,
    token: CancellationToken,
}

impl FakeDownloader {
    fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(id, b)| (id.to_string(), *b))
                .collect(),
            calls: Mutex::new(Vec::new()),
            token: CancellationToken::new(),
        }
    }

    fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    fn calls(&self) -> Vec<TrackId> {
        self.calls.lock().unwrap().clone()
    }
}

fn song_info(track_id: &TrackId) -> TrackInfo {
    TrackInfo {
        id: track_id.clone(),
        title: format!("Song {}", track_id),
        duration: 200,
        channel: Some("Channel".to_string()),
        artist: "Artist".to_string(),
    }
}

fn song(track_id: &TrackId) -> DownloadOutcome {
    DownloadOutcome::Downloaded {
        path: PathBuf::from(format!("/music/{}.m4a", track_id)),
        info: song_info(track_id),
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        track_id: &TrackId,
        observer: &dyn DownloadObserver,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.calls.lock().unwrap().push(track_id.clone());
        observer.on_download_progress(10, Some(100), "file.m4a");

        match self
            .behaviors
            .get(track_id.as_str())
            .copied()
            .unwrap_or(Behavior::Song)
        {
            Behavior::Song => Ok(song(track_id)),
            Behavior::Video => Ok(DownloadOutcome::Filtered {
                reason: NOT_A_SONG.to_string(),
            }),
            Behavior::Transient => Err(DownloadError::Network("connection reset".to_string())),
            Behavior::SongThenCancel => {
                self.token.request_kill();
                Ok(song(track_id))
            }
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl DownloadObserver for RecordingObserver {
    fn on_item_start(&self, track_id: &TrackId) {
        self.push(format!("start {}", track_id));
    }

    fn on_item_end(&self, track_id: &TrackId) {
        self.push(format!("end {}", track_id));
    }

    fn on_download_progress(&self, _downloaded: u64, _total: Option<u64>, _filename: &str) {}

    fn on_stage_start(&self, _name: &str) {}

    fn on_stage_finish(&self, _name: &str) {}

    fn on_outcome(&self, outcome: &Outcome) {
        self.push(format!("{} {}", outcome.kind(), outcome.track_id()));
    }
}

fn ids(names: &[&str]) -> Vec<TrackId> {
    names.iter().map(|n| TrackId::from(*n)).collect()
}

fn downloaded_ids(result: &musync::download::QueueResult) -> Vec<TrackId> {
    result
        .downloaded
        .iter()
        .map(|d| d.track_id.clone())
        .collect()
}

#[tokio::test]
async fn test_songs_and_videos_are_cached() {
    let downloader = FakeDownloader::new(&[("not_a_song", Behavior::Video)]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .run(ids(&["valid1", "not_a_song", "valid2"]))
        .await
        .unwrap();

    assert_eq!(downloaded_ids(&result), ids(&["valid1", "valid2"]));
    assert_eq!(result.filtered.len(), 1);
    assert_eq!(result.filtered[0].track_id, TrackId::from("not_a_song"));
    assert_eq!(result.filtered[0].reason, NOT_A_SONG);

    assert_eq!(cache.len(), 3);
    let filtered = cache.get(&TrackId::from("not_a_song")).unwrap();
    assert_eq!(filtered.filtered_reason.as_deref(), Some(NOT_A_SONG));
    assert!(!cache.get(&TrackId::from("valid1")).unwrap().is_filtered());
    assert_eq!(
        cache.metadata(&TrackId::from("valid2")),
        Some(song_info(&TrackId::from("valid2")))
    );
}

#[tokio::test]
async fn test_cached_tracks_are_skipped() {
    let downloader = FakeDownloader::new(&[]);
    let mut cache = MemoryCache::new();
    cache
        .record_outcome(&TrackId::from("cached1"), None)
        .await
        .unwrap();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .run(ids(&["cached1", "new1"]))
        .await
        .unwrap();

    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].track_id, TrackId::from("cached1"));
    assert_eq!(result.skipped[0].reason, SKIP_ALREADY_CACHED);
    assert_eq!(downloaded_ids(&result), ids(&["new1"]));
    assert_eq!(downloader.calls(), ids(&["new1"]));
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_failed_track_does_not_stop_batch() {
    let downloader = FakeDownloader::new(&[("flaky1", Behavior::Transient)]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .run(ids(&["flaky1", "next1", "next2"]))
        .await
        .unwrap();

    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].track_id, TrackId::from("flaky1"));
    assert!(result.failed[0].error.is_retryable());
    assert_eq!(downloaded_ids(&result), ids(&["next1", "next2"]));

    assert!(!cache.contains(&TrackId::from("flaky1")));
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_only_downloaded_and_filtered_are_cached() {
    let downloader = FakeDownloader::new(&[("v", Behavior::Video), ("x", Behavior::Transient)]);
    let mut cache = MemoryCache::new();
    cache.record_outcome(&TrackId::from("c"), None).await.unwrap();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .run(ids(&["d", "v", "x", "c"]))
        .await
        .unwrap();

    assert_eq!(result.resolved(), 4);
    assert!(result.is_complete());

    for d in &result.downloaded {
        assert!(cache.contains(&d.track_id));
    }
    for f in &result.filtered {
        assert!(cache.contains(&f.track_id));
    }
    for f in &result.failed {
        assert!(!cache.contains(&f.track_id));
    }
    // "c" was cached before the batch; nothing new was written for it
    assert_eq!(cache.track_ids(), ids(&["c", "d", "v"]));
}

#[tokio::test]
async fn test_skipped_tracks_are_not_cached() {
    let downloader = FakeDownloader::new(&[]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .with_options(BatchOptions {
            limit: None,
            skip_download: true,
        })
        .run(ids(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(result.skipped.len(), 2);
    assert!(
        result
            .skipped
            .iter()
            .all(|s| s.reason == SKIP_DOWNLOAD_SUPPRESSED)
    );
    assert!(downloader.calls().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cancel_before_start_keeps_everything_pending() {
    let downloader = FakeDownloader::new(&[]);
    let mut cache = MemoryCache::new();
    let token = CancellationToken::new();
    token.request_kill();

    let input = ids(&["a", "b", "c", "d", "e"]);
    let result = BatchDownloader::new(&downloader, &mut cache, token)
        .run(input.clone())
        .await
        .unwrap();

    assert_eq!(result.resolved(), 0);
    assert_eq!(result.remaining, input);
    assert!(!result.is_complete());
    assert!(downloader.calls().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cancel_during_batch_stops_after_current_track() {
    let token = CancellationToken::new();
    let downloader =
        FakeDownloader::new(&[("b", Behavior::SongThenCancel)]).with_token(token.clone());
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, token)
        .run(ids(&["a", "b", "c", "d"]))
        .await
        .unwrap();

    assert_eq!(downloaded_ids(&result), ids(&["a", "b"]));
    assert_eq!(result.remaining, ids(&["c", "d"]));
    assert_eq!(downloader.calls(), ids(&["a", "b"]));
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_limit_stops_after_downloads() {
    let downloader = FakeDownloader::new(&[("v", Behavior::Video)]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .with_options(BatchOptions {
            limit: Some(2),
            skip_download: false,
        })
        .run(ids(&["a", "v", "b", "c", "d"]))
        .await
        .unwrap();

    assert_eq!(downloaded_ids(&result), ids(&["a", "b"]));
    assert_eq!(result.filtered.len(), 1);
    assert_eq!(result.remaining, ids(&["c", "d"]));
}

#[tokio::test]
async fn test_limit_zero_downloads_nothing() {
    let downloader = FakeDownloader::new(&[]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .with_options(BatchOptions {
            limit: Some(0),
            skip_download: false,
        })
        .run(ids(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(result.resolved(), 0);
    assert_eq!(result.remaining, ids(&["a", "b"]));
}

#[tokio::test]
async fn test_observer_events_bracket_downloads() {
    let downloader = FakeDownloader::new(&[("v", Behavior::Video), ("x", Behavior::Transient)]);
    let mut cache = MemoryCache::new();
    cache.record_outcome(&TrackId::from("c"), None).await.unwrap();
    let observer = RecordingObserver::default();

    BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .with_observer(&observer)
        .run(ids(&["a", "c", "v", "x"]))
        .await
        .unwrap();

    assert_eq!(
        observer.events(),
        vec![
            "start a",
            "end a",
            "Downloaded a",
            "Skipped c",
            "start v",
            "end v",
            "Filtered v",
            "start x",
            "end x",
            "Failed x",
        ]
    );
}

#[tokio::test]
async fn test_empty_batch() {
    let downloader = FakeDownloader::new(&[]);
    let mut cache = MemoryCache::new();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .run(Vec::new())
        .await
        .unwrap();

    assert!(result.original.is_empty());
    assert!(result.is_complete());
}

#[tokio::test]
async fn test_boxed_downloader() {
    let downloader: Box<dyn Downloader> = Box::new(FakeDownloader::new(&[]));
    let mut cache = MemoryCache::new();
    let token = CancellationToken::new();

    let result = BatchDownloader::new(downloader.as_ref(), &mut cache, token.clone())
        .run(ids(&["a"]))
        .await
        .unwrap();

    assert_eq!(downloaded_ids(&result), ids(&["a"]));
    assert!(!token.kill_requested());
}

/// Cache that knows nothing and fails every write.
#[derive(Default)]
struct FailingCache {
    writes: usize,
}

#[async_trait]
impl TrackCache for FailingCache {
    fn contains(&self, _track_id: &TrackId) -> bool {
        false
    }

    fn get(&self, _track_id: &TrackId) -> Option<CachedTrack> {
        None
    }

    fn metadata(&self, _track_id: &TrackId) -> Option<TrackInfo> {
        None
    }

    fn track_ids(&self) -> Vec<TrackId> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }

    async fn record_outcome(
        &mut self,
        _track_id: &TrackId,
        _filtered_reason: Option<String>,
    ) -> Result<(), CacheError> {
        self.writes += 1;
        Err(CacheError::Io(std::io::Error::other("disk full")))
    }

    async fn record_metadata(&mut self, _info: TrackInfo) -> Result<(), CacheError> {
        self.writes += 1;
        Err(CacheError::Io(std::io::Error::other("disk full")))
    }

    async fn close(&mut self) -> Result<(), CacheError> {
        Err(CacheError::Io(std::io::Error::other("disk full")))
    }
}

#[tokio::test]
async fn test_failing_cache_writes_do_not_change_outcomes() {
    let downloader = FakeDownloader::new(&[("v", Behavior::Video), ("x", Behavior::Transient)]);
    let mut cache = FailingCache::default();
    let observer = RecordingObserver::default();

    let result = BatchDownloader::new(&downloader, &mut cache, CancellationToken::new())
        .with_observer(&observer)
        .run(ids(&["a", "v", "x", "b"]))
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(result.resolved(), 4);
    assert_eq!(downloaded_ids(&result), ids(&["a", "b"]));
    assert_eq!(result.filtered.len(), 1);
    assert_eq!(result.filtered[0].track_id, TrackId::from("v"));
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].track_id, TrackId::from("x"));
    assert_eq!(downloader.calls(), ids(&["a", "v", "x", "b"]));
    assert_eq!(
        observer.events(),
        vec![
            "start a",
            "end a",
            "Downloaded a",
            "start v",
            "end v",
            "Filtered v",
            "start x",
            "end x",
            "Failed x",
            "start b",
            "end b",
            "Downloaded b",
        ]
    );
    // every write was attempted: metadata and outcome per song, outcome per video
    assert_eq!(cache.writes, 5);
}
