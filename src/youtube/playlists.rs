use reqwest::Client;

use crate::{
    download::TrackId,
    types::{Playlist, PlaylistItemListResponse, PlaylistListResponse},
};

const PAGE_SIZE: &str = "50";

/// Playlists owned by the authorized user.
pub async fn mine(client: &Client, token: &str) -> Result<Vec<Playlist>, reqwest::Error> {
    let mut playlists = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query = vec![("part", "snippet"), ("mine", "true"), ("maxResults", PAGE_SIZE)];
        if let Some(page) = &page_token {
            query.push(("pageToken", page.as_str()));
        }

        let res: PlaylistListResponse = super::get_json(client, token, "playlists", &query).await?;
        playlists.extend(res.items.into_iter().map(|p| Playlist {
            id: p.id,
            title: p.snippet.title,
        }));

        match res.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(playlists)
}

/// Video ids of a playlist, in playlist order, at most `limit` of them.
pub async fn items(
    client: &Client,
    token: &str,
    playlist_id: &str,
    limit: usize,
) -> Result<Vec<TrackId>, reqwest::Error> {
    let mut tracks = Vec::new();
    let mut page_token: Option<String> = None;

    while tracks.len() < limit {
        let mut query = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(page) = &page_token {
            query.push(("pageToken", page.as_str()));
        }

        let res: PlaylistItemListResponse =
            super::get_json(client, token, "playlistItems", &query).await?;
        tracks.extend(
            res.items
                .into_iter()
                .map(|item| TrackId::new(item.content_details.video_id)),
        );

        match res.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    tracks.truncate(limit);
    Ok(tracks)
}

/// Id of the playlist holding all uploads of a channel (`UC…` → `UU…`).
pub fn uploads_playlist_id(channel_id: &str) -> Option<String> {
    channel_id
        .strip_prefix("UC")
        .map(|rest| format!("UU{}", rest))
}
