use std::path::Path;

use tabled::Table;

use crate::{
    cli::library::open_library,
    download::TrackId,
    management::{CachedTrack, TrackCache},
    types::CachedTrackTableRow,
    warning,
};

/// Lists cached tracks with their metadata, optionally narrowed down by a
/// search term or to filtered tracks only.
pub async fn list_cache(dir: &Path, search: Option<String>, filtered_only: bool) {
    let (_, cache) = open_library(dir).await;

    let mut rows: Vec<CachedTrackTableRow> = cache
        .track_ids()
        .into_iter()
        .filter_map(|id| cache.get(&id).map(|cached| (id, cached)))
        .filter(|(_, cached)| !filtered_only || cached.is_filtered())
        .map(|(id, cached)| table_row(&cache, &id, &cached))
        .collect();

    if let Some(term) = search {
        let term = term.to_lowercase();
        rows.retain(|r| {
            r.track.to_lowercase().contains(&term)
                || r.artist.to_lowercase().contains(&term)
                || r.title.to_lowercase().contains(&term)
        });
    }

    if rows.is_empty() {
        warning!("No cached tracks found.");
        return;
    }

    // sort by artist, then title
    rows.sort_by(|a, b| {
        a.artist
            .to_lowercase()
            .cmp(&b.artist.to_lowercase())
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });

    let count = rows.len();
    println!("{}", Table::new(rows));
    println!("{} tracks", count);
}

fn table_row<C: TrackCache + ?Sized>(
    cache: &C,
    id: &TrackId,
    cached: &CachedTrack,
) -> CachedTrackTableRow {
    let info = cache.metadata(id);
    let status = match &cached.filtered_reason {
        Some(reason) => format!("filtered: {}", reason),
        None => "downloaded".to_string(),
    };

    CachedTrackTableRow {
        track: id.to_string(),
        artist: info.as_ref().map(|i| i.artist.clone()).unwrap_or_default(),
        title: info.map(|i| i.title).unwrap_or_default(),
        status,
    }
}
