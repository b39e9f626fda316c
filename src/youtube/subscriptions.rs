use reqwest::Client;

use crate::types::{Channel, SubscriptionListResponse};

/// Channels the authorized user is subscribed to.
pub async fn mine(client: &Client, token: &str) -> Result<Vec<Channel>, reqwest::Error> {
    let mut channels = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut query = vec![("part", "snippet"), ("mine", "true"), ("maxResults", "50")];
        if let Some(page) = &page_token {
            query.push(("pageToken", page.as_str()));
        }

        let res: SubscriptionListResponse =
            super::get_json(client, token, "subscriptions", &query).await?;
        channels.extend(res.items.into_iter().map(|s| Channel {
            id: s.snippet.resource_id.channel_id,
            title: s.snippet.title,
        }));

        match res.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(channels)
}
