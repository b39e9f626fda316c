use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;

use crate::{
    config::HomeItemsFilter,
    download::{CancellationToken, TrackId},
    management::TrackCache,
    types::{Channel, HomeItemTableRow, Playlist},
    utils, warning,
    youtube::{playlists, subscriptions},
};

/// Id of the built-in playlist of liked videos.
pub const LIKES_PLAYLIST_ID: &str = "LL";
pub const LIKES_PLAYLIST_TITLE: &str = "Your Likes";

/// Sources of candidate tracks, as shown on the user's home.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeItems {
    pub playlists: Vec<Playlist>,
    pub channels: Vec<Channel>,
}

impl HomeItems {
    /// Copy that keeps only the items whose titles pass `filter`.
    pub fn filtered(&self, filter: &HomeItemsFilter) -> HomeItems {
        HomeItems {
            playlists: self
                .playlists
                .iter()
                .filter(|p| filter.allows_playlist(&p.title))
                .cloned()
                .collect(),
            channels: self
                .channels
                .iter()
                .filter(|c| filter.allows_channel(&c.title))
                .cloned()
                .collect(),
        }
    }

    /// One row per item, marking whether `filter` lets it through.
    pub fn review_rows(&self, filter: &HomeItemsFilter) -> Vec<HomeItemTableRow> {
        let synced = |allowed: bool| if allowed { "yes" } else { "no" }.to_string();

        let playlists = self.playlists.iter().map(|p| HomeItemTableRow {
            kind: "Playlist".to_string(),
            title: p.title.clone(),
            synced: synced(filter.allows_playlist(&p.title)),
        });
        let channels = self.channels.iter().map(|c| HomeItemTableRow {
            kind: "Channel".to_string(),
            title: c.title.clone(),
            synced: synced(filter.allows_channel(&c.title)),
        });
        playlists.chain(channels).collect()
    }

    pub fn remove_duplicates(&mut self) {
        utils::dedupe_by_key(&mut self.playlists, |p| p.id.clone());
        utils::dedupe_by_key(&mut self.channels, |c| c.id.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty() && self.channels.is_empty()
    }

    /// Playlist ids to read tracks from: the playlists themselves, the upload
    /// playlists of the channels and `extra` ids, without duplicates.
    pub fn sources(&self, extra: &[String]) -> Vec<String> {
        let mut sources: Vec<String> = self.playlists.iter().map(|p| p.id.clone()).collect();
        sources.extend(
            self.channels
                .iter()
                .filter_map(|c| playlists::uploads_playlist_id(&c.id)),
        );
        sources.extend(extra.iter().cloned());
        utils::dedupe_by_key(&mut sources, |s| s.clone());
        sources
    }
}

/// Fetches the user's playlists (plus liked videos) and subscriptions.
pub async fn home_items(client: &Client, token: &str) -> Result<HomeItems, reqwest::Error> {
    let mut items = HomeItems {
        playlists: vec![Playlist {
            id: LIKES_PLAYLIST_ID.to_string(),
            title: LIKES_PLAYLIST_TITLE.to_string(),
        }],
        channels: Vec::new(),
    };
    items.playlists.extend(playlists::mine(client, token).await?);
    items.channels = subscriptions::mine(client, token).await?;
    items.remove_duplicates();
    Ok(items)
}

/// Reads up to `each_limit` tracks from every source with at most `workers`
/// requests in flight. All requests are finished before this returns.
///
/// The result keeps source order and first occurrence of each track, without
/// the tracks `cache` already knows. Sources that fail are reported and skipped.
pub async fn collect_tracks<C: TrackCache + ?Sized>(
    client: &Client,
    token: &str,
    sources: Vec<String>,
    each_limit: usize,
    workers: usize,
    cache: &C,
    cancellation_token: &CancellationToken,
) -> Vec<TrackId> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::new();

    for source in sources {
        let client = client.clone();
        let token = token.to_string();
        let semaphore = Arc::clone(&semaphore);
        let cancellation_token = cancellation_token.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            let fetch = playlists::items(&client, &token, &source, each_limit);
            let items = tokio::select! {
                biased;
                _ = cancellation_token.killed() => None,
                items = fetch => Some(items),
            }?;
            Some((source.clone(), items))
        });
        handles.push(handle);
    }

    let mut tracks = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some((_, Ok(items)))) => tracks.extend(items),
            Ok(Some((source, Err(e)))) => {
                warning!("Failed to load tracks of playlist {}: {}", source, e);
                log::warn!("cannot load playlist {}: {}", source, e);
            }
            Ok(None) => {}
            Err(e) => warning!("Task join error: {}", e),
        }
    }

    utils::dedupe_by_key(&mut tracks, |t| t.clone());
    cache.filter_cached(tracks)
}
