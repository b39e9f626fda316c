use std::io::IsTerminal;

use tabled::Table;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{Res, config::HomeItemsFilter, info, youtube::discovery::HomeItems};

/// Shows which home items will be synced and lets the user edit the filter.
///
/// Returns whether the filter was changed. Without a terminal on stdin the
/// filter is only shown.
pub(crate) async fn review_home_items(
    items: &HomeItems,
    filter: &mut HomeItemsFilter,
) -> Res<bool> {
    println!("{}", Table::new(items.review_rows(filter)));

    info!(
        "Playlists synced: {}",
        HomeItemsFilter::describe(&filter.playlists)
    );
    info!(
        "Channels synced: {}",
        HomeItemsFilter::describe(&filter.channels)
    );

    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }

    println!("Enter keeps a filter, * syncs everything, or list titles separated by commas.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut changed = false;
    for (label, list) in [
        ("Playlists", &mut filter.playlists),
        ("Channels", &mut filter.channels),
    ] {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{}: ", label).as_bytes()).await?;
        stdout.flush().await?;

        let answer = lines.next_line().await?.unwrap_or_default();
        changed |= HomeItemsFilter::apply_answer(list, &answer);
    }

    Ok(changed)
}
