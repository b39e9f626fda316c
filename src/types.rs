use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

impl Token {
    /// Google omits the refresh token on refresh responses; carry the old one
    /// over in that case.
    pub fn keep_refresh_token(mut self, previous: &Token) -> Token {
        if self.refresh_token.is_empty() {
            self.refresh_token = previous.refresh_token.clone();
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistResource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: TitleSnippet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleSnippet {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItemResource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionListResponse {
    #[serde(default)]
    pub items: Vec<SubscriptionResource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResource {
    pub snippet: SubscriptionSnippet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnippet {
    pub title: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub channel_id: String,
}

#[derive(Tabled)]
pub struct HomeItemTableRow {
    pub kind: String,
    pub title: String,
    pub synced: String,
}

#[derive(Tabled)]
pub struct OutcomeTableRow {
    pub result: String,
    pub count: usize,
}

#[derive(Tabled)]
pub struct FailureTableRow {
    pub track: String,
    pub error: String,
}

#[derive(Tabled)]
pub struct CachedTrackTableRow {
    pub track: String,
    pub artist: String,
    pub title: String,
    pub status: String,
}
