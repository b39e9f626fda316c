mod auth;
mod cache;

pub use auth::TokenManager;
pub use cache::CachedTrack;
pub use cache::JsonCache;
pub use cache::MemoryCache;
pub use cache::TrackCache;
