//! # YouTube Integration Module
//!
//! Thin client for the YouTube Data API v3, used to discover candidate tracks
//! for a library update.
//!
//! ```text
//! CLI (library update)
//!          ↓
//! discovery ── home items (playlists, subscribed channels) → track ids
//!     ├── auth (OAuth 2.0 PKCE loopback flow)
//!     ├── playlists (own playlists, playlist items)
//!     └── subscriptions (subscribed channels)
//!          ↓
//! reqwest (JSON)
//! ```
//!
//! All requests are authenticated with the bearer token managed by
//! [`crate::management::TokenManager`]. Transient gateway errors are retried a
//! few times; everything else is returned to the caller.

pub mod auth;
pub mod discovery;
pub mod playlists;
pub mod subscriptions;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::config;

const MAX_ATTEMPTS: u32 = 3;

/// Sends a GET request to `{api}/{resource}` and decodes the JSON body.
async fn get_json<T: DeserializeOwned>(
    client: &Client,
    token: &str,
    resource: &str,
    query: &[(&str, &str)],
) -> Result<T, reqwest::Error> {
    let api_url = format!(
        "{uri}/{resource}",
        uri = config::youtube_api_url(),
        resource = resource
    );

    let mut attempt = 1;
    loop {
        let response = client
            .get(&api_url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        match response.error_for_status() {
            Ok(valid_response) => return valid_response.json::<T>().await,
            Err(err) => {
                let retry = matches!(
                    err.status(),
                    Some(StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE)
                );
                if retry && attempt < MAX_ATTEMPTS {
                    attempt += 1;
                    sleep(Duration::from_secs(10)).await;
                    continue;
                }
                return Err(err);
            }
        }
    }
}
