use std::{path::PathBuf, sync::Mutex};

use musync::download::{
    DownloadObserver, DownloadOutcome, Downloader, NOT_A_SONG, NoopObserver, OutputLine, RawInfo,
    STAGE_DOWNLOAD, STAGE_MOVE, STAGE_POSTPROCESS, TrackId, YtDlpDownloader, main_artist,
    parse_line,
};
use musync::error::DownloadError;
use tempfile::tempdir;

fn raw(json: &str) -> RawInfo {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_main_artist() {
    assert_eq!(main_artist("Nightwish"), "Nightwish");
    assert_eq!(main_artist("Nightwish, Tuomas Holopainen"), "Nightwish");
    assert_eq!(main_artist("  Queen , David Bowie"), "Queen");
    assert_eq!(main_artist(""), "");
}

#[test]
fn test_song_info_from_music_track() {
    let info = raw(
        r#"{"id": "abc123", "title": "Under Pressure", "duration": 248.4,
            "channel": "Queen - Topic", "artist": "Queen, David Bowie"}"#,
    )
    .song_info()
    .unwrap();

    assert_eq!(info.id, TrackId::from("abc123"));
    assert_eq!(info.title, "Under Pressure");
    assert_eq!(info.duration, 248);
    assert_eq!(info.channel.as_deref(), Some("Queen - Topic"));
    assert_eq!(info.artist, "Queen");
}

#[test]
fn test_song_info_prefers_artists_list() {
    let info = raw(
        r#"{"id": "x", "title": "Song", "artist": "A, B", "artists": ["B", "A"]}"#,
    )
    .song_info()
    .unwrap();

    assert_eq!(info.artist, "B");
    assert_eq!(info.duration, 0);
    assert_eq!(info.channel, None);
}

#[test]
fn test_video_has_no_song_info() {
    assert!(
        raw(r#"{"id": "v", "title": "Vlog", "channel": "Someone"}"#)
            .song_info()
            .is_none()
    );
    assert!(
        raw(r#"{"id": "v", "title": "Vlog", "artist": "  "}"#)
            .song_info()
            .is_none()
    );
    assert!(raw(r#"{"id": "v", "artist": "Queen"}"#).song_info().is_none());
}

#[test]
fn test_parse_progress_line() {
    assert_eq!(
        parse_line("[musync-progress] 1024 4096 NA Queen - Song [x].m4a"),
        OutputLine::Progress {
            downloaded: 1024,
            total: Some(4096),
            filename: "Queen - Song [x].m4a".to_string(),
        }
    );
}

#[test]
fn test_parse_progress_line_with_estimate() {
    assert_eq!(
        parse_line("[musync-progress] 10 NA 5000.7 a.webm"),
        OutputLine::Progress {
            downloaded: 10,
            total: Some(5000),
            filename: "a.webm".to_string(),
        }
    );
    assert_eq!(
        parse_line("[musync-progress] 10 NA NA a.webm"),
        OutputLine::Progress {
            downloaded: 10,
            total: None,
            filename: "a.webm".to_string(),
        }
    );
}

#[test]
fn test_parse_malformed_progress_line() {
    let line = "[musync-progress] NA NA NA a.webm";
    assert_eq!(parse_line(line), OutputLine::Other(line.to_string()));
}

#[test]
fn test_parse_stage_lines() {
    assert_eq!(
        parse_line("[musync-stage] Download"),
        OutputLine::Stage(STAGE_DOWNLOAD.to_string())
    );
    assert_eq!(
        parse_line("[musync-stage] MoveFiles"),
        OutputLine::Stage(STAGE_MOVE.to_string())
    );
    // yt-dlp's own tags are not stages
    let line = "[ExtractAudio] Destination: /music/a.m4a";
    assert_eq!(parse_line(line), OutputLine::Other(line.to_string()));
}

#[test]
fn test_parse_info_line() {
    let line = r#"[musync-info] {"id": "abc", "title": "Song", "artist": "Queen"}"#;
    let OutputLine::Info(json) = parse_line(line) else {
        panic!("not an info line");
    };

    let info = raw(&json).song_info().unwrap();
    assert_eq!(info.id, TrackId::from("abc"));
    assert_eq!(info.artist, "Queen");
}

#[test]
fn test_parse_file_line() {
    assert_eq!(
        parse_line("[musync-file] /music/Queen - Song [x].m4a"),
        OutputLine::File(PathBuf::from("/music/Queen - Song [x].m4a"))
    );
}

#[test]
fn test_parse_other_lines() {
    for line in [
        "[youtube] x: Downloading webpage",
        "[musync-stage] ",
        "[download] 100% of 3.2MiB",
        "plain text",
        "",
    ] {
        assert_eq!(parse_line(line), OutputLine::Other(line.to_string()));
    }
}

#[tokio::test]
async fn test_missing_program_is_not_retryable() {
    let dir = tempdir().unwrap();
    let downloader = YtDlpDownloader::new("musync-test-no-such-program", dir.path());

    let err = downloader
        .download(&TrackId::from("abc"), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Spawn { .. }));
    assert!(!err.is_retryable());
    assert_eq!(downloader.home_dir(), dir.path());
}

fn find_arg<'a>(args: &'a [String], flag: &str, prefix: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|pair| pair[0] == flag && pair[1].starts_with(prefix))
        .map(|pair| pair[1].as_str())
}

#[test]
fn test_download_args_keep_progress_with_print() {
    let downloader = YtDlpDownloader::new("yt-dlp", "/music").with_tmp_dir("/tmp/musync");
    let args = downloader.download_args(&TrackId::from("abc"));

    assert!(args.iter().any(|a| a == "--progress"));
    assert!(find_arg(&args, "--progress-template", "download:[musync-progress] ").is_some());
    assert_eq!(
        find_arg(&args, "--print", "pre_process:"),
        Some("pre_process:[musync-info] %()j")
    );
    assert_eq!(
        find_arg(&args, "--print", "before_dl:"),
        Some("before_dl:[musync-stage] Download")
    );
    assert_eq!(
        find_arg(&args, "--print", "post_process:"),
        Some("post_process:[musync-stage] MoveFiles")
    );
    assert!(find_arg(&args, "--print", "after_move:[musync-file] ").is_some());
    assert_eq!(find_arg(&args, "--paths", "home:"), Some("home:/music"));
    assert_eq!(find_arg(&args, "--paths", "temp:"), Some("temp:/tmp/musync"));
    assert!(args.last().unwrap().ends_with("abc"));
}

#[test]
fn test_download_args_run_once() {
    let args = YtDlpDownloader::new("yt-dlp", "/music").download_args(&TrackId::from("abc"));

    assert!(!args.iter().any(|a| a == "--dump-json" || a == "--skip-download"));
    assert!(args.iter().any(|a| a == "--no-simulate"));
}

#[derive(Default)]
struct StageObserver {
    events: Mutex<Vec<String>>,
}

impl DownloadObserver for StageObserver {
    fn on_item_start(&self, _track_id: &TrackId) {}

    fn on_item_end(&self, _track_id: &TrackId) {}

    fn on_download_progress(&self, downloaded: u64, _total: Option<u64>, _filename: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("progress {}", downloaded));
    }

    fn on_stage_start(&self, name: &str) {
        self.events.lock().unwrap().push(format!("start {}", name));
    }

    fn on_stage_finish(&self, name: &str) {
        self.events.lock().unwrap().push(format!("finish {}", name));
    }
}

/// Writes an executable stand-in for yt-dlp that logs each run to `runs`.
#[cfg(unix)]
fn fake_ytdlp(dir: &std::path::Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-yt-dlp");
    let runs = dir.join("runs");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho run >> '{}'\n{}\n", runs.display(), body),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
fn runs(dir: &std::path::Path) -> usize {
    std::fs::read_to_string(dir.join("runs"))
        .unwrap_or_default()
        .lines()
        .count()
}

#[cfg(unix)]
#[tokio::test]
async fn test_song_is_downloaded_in_one_run() {
    let dir = tempdir().unwrap();
    let script = fake_ytdlp(
        dir.path(),
        r#"echo '[musync-info] {"id": "abc", "title": "Song", "artist": "Queen, Bowie"}'
echo '[musync-stage] Download'
echo '[musync-progress] 512 1024 NA a.webm'
echo '[musync-progress] 1024 1024 NA a.webm'
echo '[musync-stage] MoveFiles'
echo '[musync-file] /music/Queen - Song [abc].m4a'"#,
    );
    let downloader = YtDlpDownloader::new(script.to_string_lossy(), dir.path());
    let observer = StageObserver::default();

    let outcome = downloader
        .download(&TrackId::from("abc"), &observer)
        .await
        .unwrap();

    let DownloadOutcome::Downloaded { path, info } = outcome else {
        panic!("expected a download");
    };
    assert_eq!(path, PathBuf::from("/music/Queen - Song [abc].m4a"));
    assert_eq!(info.artist, "Queen");
    assert_eq!(runs(dir.path()), 1);
    assert_eq!(
        *observer.events.lock().unwrap(),
        vec![
            format!("start {}", STAGE_DOWNLOAD),
            "progress 512".to_string(),
            "progress 1024".to_string(),
            format!("finish {}", STAGE_DOWNLOAD),
            format!("start {}", STAGE_POSTPROCESS),
            format!("finish {}", STAGE_POSTPROCESS),
            format!("start {}", STAGE_MOVE),
            format!("finish {}", STAGE_MOVE),
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_video_stops_the_run() {
    let dir = tempdir().unwrap();
    let script = fake_ytdlp(
        dir.path(),
        r#"echo '[musync-info] {"id": "v", "title": "Vlog", "channel": "Someone"}'
sleep 30
echo '[musync-file] /music/never.m4a'"#,
    );
    let downloader = YtDlpDownloader::new(script.to_string_lossy(), dir.path());

    let started = std::time::Instant::now();
    let outcome = downloader
        .download(&TrackId::from("v"), &NoopObserver)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DownloadOutcome::Filtered { reason } if reason == NOT_A_SONG
    ));
    assert_eq!(runs(dir.path()), 1);
    assert!(started.elapsed() < std::time::Duration::from_secs(20));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_run_reports_stderr() {
    let dir = tempdir().unwrap();
    let script = fake_ytdlp(dir.path(), "echo 'ERROR: unavailable' >&2
exit 1");
    let downloader = YtDlpDownloader::new(script.to_string_lossy(), dir.path());

    let err = downloader
        .download(&TrackId::from("gone"), &NoopObserver)
        .await
        .unwrap_err();

    match err {
        DownloadError::Process { stderr, .. } => assert_eq!(stderr, "ERROR: unavailable"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(runs(dir.path()), 1);
}
