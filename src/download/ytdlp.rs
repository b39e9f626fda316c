use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
};

use crate::{
    download::{
        downloader::{DownloadOutcome, Downloader},
        observer::DownloadObserver,
        track::{TrackId, TrackInfo},
    },
    error::DownloadError,
};

pub const NOT_A_SONG: &str = "it's video, not a song";

const PROGRESS_PREFIX: &str = "[musync-progress] ";
const INFO_PREFIX: &str = "[musync-info] ";
const STAGE_PREFIX: &str = "[musync-stage] ";
const FILE_PREFIX: &str = "[musync-file] ";
const OUTPUT_TEMPLATE: &str = "%(artist)s - %(title)s [%(id)s].%(ext)s";

pub const STAGE_DOWNLOAD: &str = "Download";
pub const STAGE_POSTPROCESS: &str = "Postprocess";
pub const STAGE_MOVE: &str = "MoveFiles";

/// Subset of the info JSON yt-dlp prints before processing a video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawInfo {
    pub id: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub channel: Option<String>,
    pub artist: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<String>>,
}

impl RawInfo {
    /// Song metadata, or `None` when the item is a plain video.
    ///
    /// Songs carry both an artist and a title.
    pub fn song_info(&self) -> Option<TrackInfo> {
        let artist = self
            .artists
            .as_ref()
            .and_then(|a| a.first().cloned())
            .or_else(|| self.artist.clone())
            .filter(|a| !a.trim().is_empty())?;
        let title = self.title.clone()?;

        Some(TrackInfo {
            id: TrackId::new(self.id.clone()),
            title,
            duration: self.duration.map_or(0, |d| d.round() as u64),
            channel: self.channel.clone(),
            artist: main_artist(&artist),
        })
    }
}

/// Keeps the first of several comma separated artists:
/// `"Nightwish, Tuomas Holopainen"` becomes `"Nightwish"`.
pub fn main_artist(artist: &str) -> String {
    artist.split(',').next().unwrap_or(artist).trim().to_string()
}

/// One line of yt-dlp's stdout during a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// Info JSON, still unparsed.
    Info(String),
    Progress {
        downloaded: u64,
        total: Option<u64>,
        filename: String,
    },
    Stage(String),
    File(PathBuf),
    Other(String),
}

pub fn parse_line(line: &str) -> OutputLine {
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let mut parts = rest.splitn(4, ' ');
        let downloaded = parts.next().and_then(|d| d.parse::<u64>().ok());
        let total = parts.next().and_then(|t| t.parse::<u64>().ok());
        let estimate = parts
            .next()
            .and_then(|e| e.parse::<f64>().ok())
            .map(|e| e as u64);
        let filename = parts.next().unwrap_or_default().to_string();

        return match downloaded {
            Some(downloaded) => OutputLine::Progress {
                downloaded,
                total: total.or(estimate),
                filename,
            },
            None => OutputLine::Other(line.to_string()),
        };
    }

    if let Some(json) = line.strip_prefix(INFO_PREFIX) {
        return OutputLine::Info(json.to_string());
    }

    if let Some(stage) = line.strip_prefix(STAGE_PREFIX) {
        let stage = stage.trim();
        if !stage.is_empty() {
            return OutputLine::Stage(stage.to_string());
        }
    }

    if let Some(path) = line.strip_prefix(FILE_PREFIX) {
        return OutputLine::File(PathBuf::from(path.trim()));
    }

    OutputLine::Other(line.to_string())
}

/// Turns a stream of stage lines into start/finish pairs.
#[derive(Debug, Default)]
struct StageTracker {
    current: Option<String>,
}

impl StageTracker {
    fn enter(&mut self, stage: String, observer: &dyn DownloadObserver) {
        if self.current.as_deref() == Some(stage.as_str()) {
            return;
        }
        self.finish(observer);
        observer.on_stage_start(&stage);
        self.current = Some(stage);
    }

    fn finish(&mut self, observer: &dyn DownloadObserver) {
        if let Some(stage) = self.current.take() {
            observer.on_stage_finish(&stage);
        }
    }
}

/// Downloads audio by running the external `yt-dlp` program.
pub struct YtDlpDownloader {
    program: String,
    home_dir: PathBuf,
    tmp_dir: Option<PathBuf>,
    proxy: Option<String>,
}

impl YtDlpDownloader {
    pub fn new(program: impl Into<String>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            home_dir: home_dir.into(),
            tmp_dir: None,
            proxy: None,
        }
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(tmp_dir.into());
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.is_empty());
        self
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(proxy) = &self.proxy {
            cmd.args(["--proxy", proxy]);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> DownloadError {
        DownloadError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Arguments for one yt-dlp run that reports the info JSON, then
    /// downloads and tags the audio.
    ///
    /// `--print` makes yt-dlp quiet, so progress is forced back on and stages
    /// are reported through `--print` hooks instead of its log lines.
    pub fn download_args(&self, track_id: &TrackId) -> Vec<String> {
        let mut args: Vec<String> = [
            "--format",
            "m4a/bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "m4a",
            "--embed-metadata",
            "--embed-thumbnail",
            "--replace-in-metadata",
            "artist",
            ",.*$",
            "",
            "--windows-filenames",
            "--no-playlist",
            "--no-warnings",
            "--newline",
            "--no-simulate",
            "--progress",
            "--progress-template",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        args.push(format!(
            "download:{PROGRESS_PREFIX}%(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.filename)s"
        ));
        for print in [
            format!("pre_process:{INFO_PREFIX}%()j"),
            format!("before_dl:{STAGE_PREFIX}{STAGE_DOWNLOAD}"),
            format!("post_process:{STAGE_PREFIX}{STAGE_MOVE}"),
            format!("after_move:{FILE_PREFIX}%(filepath)s"),
        ] {
            args.push("--print".to_string());
            args.push(print);
        }
        args.push("--output".to_string());
        args.push(OUTPUT_TEMPLATE.to_string());
        args.push("--paths".to_string());
        args.push(format!("home:{}", self.home_dir.display()));
        if let Some(tmp_dir) = &self.tmp_dir {
            args.push("--paths".to_string());
            args.push(format!("temp:{}", tmp_dir.display()));
        }
        args.push(track_id.url());
        args
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        track_id: &TrackId,
        observer: &dyn DownloadObserver,
    ) -> Result<DownloadOutcome, DownloadError> {
        let mut child = self
            .command()
            .args(self.download_args(track_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child.stdout.take().ok_or(DownloadError::MissingOutput)?;
        let mut stderr = child.stderr.take().ok_or(DownloadError::MissingOutput)?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut stages = StageTracker::default();
        let mut info = None;
        let mut path = None;

        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                OutputLine::Info(json) => {
                    let raw: RawInfo = serde_json::from_str(&json)?;
                    match raw.song_info() {
                        Some(song) => info = Some(song),
                        None => {
                            debug!("{} is not a song, stopping yt-dlp", track_id);
                            child.start_kill()?;
                            let _ = child.wait().await;
                            return Ok(DownloadOutcome::Filtered {
                                reason: NOT_A_SONG.to_string(),
                            });
                        }
                    }
                }
                OutputLine::Progress {
                    downloaded,
                    total,
                    filename,
                } => {
                    observer.on_download_progress(downloaded, total, &filename);
                    if total == Some(downloaded) {
                        stages.enter(STAGE_POSTPROCESS.to_string(), observer);
                    }
                }
                OutputLine::Stage(stage) => stages.enter(stage, observer),
                OutputLine::File(file) => {
                    stages.finish(observer);
                    path = Some(file);
                }
                OutputLine::Other(line) => debug!("yt-dlp: {}", line),
            }
        }

        let status = child.wait().await?;
        stages.finish(observer);
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(DownloadError::Process {
                status,
                stderr: stderr.trim().to_string(),
            });
        }

        match (info, path) {
            (Some(info), Some(path)) => Ok(DownloadOutcome::Downloaded { path, info }),
            _ => Err(DownloadError::MissingOutput),
        }
    }
}
