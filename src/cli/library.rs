use std::{path::Path, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use crate::{
    Res,
    cli::{
        progress::{TerminalObserver, print_summary},
        review::review_home_items,
    },
    config::{self, LibraryConfig},
    download::{
        BatchDownloader, BatchOptions, CancellationToken, Downloader, QueueResult, Retrying,
        TrackId, YtDlpDownloader,
    },
    error, info,
    management::{JsonCache, TokenManager, TrackCache},
    signal, success, utils, warning,
    youtube::discovery,
};

const DISCOVERY_WORKERS: usize = 4;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub limit: Option<usize>,
    pub skip_download: bool,
    pub retries: u32,
    pub each_playlist_limit: Option<usize>,
    /// Ask the user to review the home items filter before syncing.
    pub review: bool,
}

/// Downloads every new song found on the user's home into `dir`.
pub async fn update(dir: &Path, opts: UpdateOptions) {
    let (mut library, mut cache) = open_library(dir).await;
    let cancellation_token = install_signal_handler();

    let tracks = match discover(dir, &mut library, &cache, opts, &cancellation_token).await {
        Ok(tracks) => tracks,
        Err(e) => error!("Failed to load tracks from YouTube. Err: {}", e),
    };

    if cancellation_token.kill_requested() {
        warning!("Update cancelled before downloading.");
        close_cache(&mut cache).await;
        return;
    }
    if tracks.is_empty() {
        success!("Library is up to date.");
        close_cache(&mut cache).await;
        return;
    }
    info!("Found {} new tracks", tracks.len());

    let options = BatchOptions {
        limit: opts.limit,
        skip_download: opts.skip_download,
    };
    match run_batch(
        dir,
        &library,
        &mut cache,
        tracks,
        options,
        opts.retries,
        cancellation_token,
    )
    .await
    {
        Ok(result) => print_summary(&result),
        Err(e) => error!("Download batch aborted. Err: {}", e),
    }
}

/// Downloads the given tracks into `dir`, skipping the ones already cached.
pub async fn download(dir: &Path, track_ids: Vec<String>, retries: u32) {
    let (library, mut cache) = open_library(dir).await;
    let cancellation_token = install_signal_handler();

    let mut tracks: Vec<TrackId> = track_ids.into_iter().map(TrackId::from).collect();
    utils::remove_duplicate_tracks(&mut tracks);

    match run_batch(
        dir,
        &library,
        &mut cache,
        tracks,
        BatchOptions::default(),
        retries,
        cancellation_token,
    )
    .await
    {
        Ok(result) => print_summary(&result),
        Err(e) => error!("Download batch aborted. Err: {}", e),
    }
}

pub(crate) async fn open_library(dir: &Path) -> (LibraryConfig, JsonCache) {
    let library = match LibraryConfig::load(&LibraryConfig::config_path(dir)).await {
        Ok(library) => library,
        Err(e) => error!("Cannot load library config. Err: {}", e),
    };

    let cache = match JsonCache::open(JsonCache::cache_path(dir)).await {
        Ok(cache) => cache,
        Err(e) => error!("Cannot open track cache. Err: {}", e),
    };
    log::info!(
        "opened library {} with {} cached tracks",
        dir.display(),
        cache.len()
    );

    (library, cache)
}

fn install_signal_handler() -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    if let Err(e) = signal::install(cancellation_token.clone()) {
        warning!("Cannot listen for shutdown signals. Err: {}", e);
    }
    cancellation_token
}

async fn discover(
    dir: &Path,
    library: &mut LibraryConfig,
    cache: &JsonCache,
    opts: UpdateOptions,
    cancellation_token: &CancellationToken,
) -> Res<Vec<TrackId>> {
    let mut token_mgr = match TokenManager::load().await {
        Ok(t) => t,
        Err(e) => error!("Failed to load token. Please run musync auth\n Error: {}", e),
    };
    let token = token_mgr.get_valid_token().await;
    let client = Client::new();

    let mut pb = spinner("Loading playlists and subscriptions...");

    let home_items = match discovery::home_items(&client, &token).await {
        Ok(items) => items,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };

    if opts.review {
        pb.finish_and_clear();
        log::debug!("home items filter before review: {:?}", library.home_items_filter);
        if review_home_items(&home_items, &mut library.home_items_filter).await? {
            library.save(&LibraryConfig::config_path(dir)).await?;
            success!("Saved home items filter.");
        }
        log::debug!("home items filter after review: {:?}", library.home_items_filter);
        pb = spinner("Loading playlists...");
    }
    if cancellation_token.kill_requested() {
        pb.finish_and_clear();
        return Ok(Vec::new());
    }

    let home_items = home_items.filtered(&library.home_items_filter);
    log::info!(
        "home items: {} playlists, {} channels",
        home_items.playlists.len(),
        home_items.channels.len()
    );

    let sources = home_items.sources(&library.extra_playlists);
    pb.set_message(format!("Loading tracks of {} playlists...", sources.len()));

    let tracks = discovery::collect_tracks(
        &client,
        &token,
        sources,
        opts.each_playlist_limit.unwrap_or(library.each_playlist_limit),
        DISCOVERY_WORKERS,
        cache,
        cancellation_token,
    )
    .await;

    pb.finish_and_clear();
    Ok(tracks)
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

async fn run_batch(
    dir: &Path,
    library: &LibraryConfig,
    cache: &mut JsonCache,
    tracks: Vec<TrackId>,
    options: BatchOptions,
    retries: u32,
    cancellation_token: CancellationToken,
) -> Res<QueueResult> {
    let tmp_dir = dir.join(".musync").join("tmp");
    clean_partial_files(dir, &tmp_dir).await;

    let ytdlp = YtDlpDownloader::new(config::ytdlp_path(), dir)
        .with_tmp_dir(&tmp_dir)
        .with_proxy(library.proxy.clone());
    let downloader: Box<dyn Downloader> = if retries > 0 {
        Box::new(Retrying::new(
            ytdlp,
            utils::attempts_for_retries(retries),
            RETRY_BASE_DELAY,
            cancellation_token.clone(),
        ))
    } else {
        Box::new(ytdlp)
    };

    let observer = TerminalObserver::new(tracks.len());
    let result = BatchDownloader::new(downloader.as_ref(), cache, cancellation_token)
        .with_observer(&observer)
        .with_options(options)
        .run(tracks)
        .await;
    observer.finish();

    close_cache(cache).await;
    clean_partial_files(dir, &tmp_dir).await;

    Ok(result?)
}

async fn close_cache(cache: &mut JsonCache) {
    if let Err(e) = cache.close().await {
        warning!("Failed to write track cache. Err: {}", e);
    }
}

async fn clean_partial_files(dir: &Path, tmp_dir: &Path) {
    for d in [dir, tmp_dir] {
        match utils::clean_partial_files(d).await {
            Ok(0) => {}
            Ok(n) => log::info!("removed {} partial files from {}", n, d.display()),
            Err(e) => warning!("Cannot clean up {}. Err: {}", d.display(), e),
        }
    }
}
