use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    download::{TrackId, TrackInfo},
    error::CacheError,
};

/// Durable fact about a track: it was downloaded (`filtered_reason` is `None`)
/// or classified as not being music.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTrack {
    pub track_id: TrackId,
    pub filtered_reason: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl CachedTrack {
    pub fn is_filtered(&self) -> bool {
        self.filtered_reason.is_some()
    }
}

/// Store of already processed tracks.
///
/// Each write is durable on its own; there is no multi-call transaction.
#[async_trait]
pub trait TrackCache: Send + Sync {
    fn contains(&self, track_id: &TrackId) -> bool;

    fn get(&self, track_id: &TrackId) -> Option<CachedTrack>;

    fn metadata(&self, track_id: &TrackId) -> Option<TrackInfo>;

    /// All known track ids, sorted.
    fn track_ids(&self) -> Vec<TrackId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn record_outcome(
        &mut self,
        track_id: &TrackId,
        filtered_reason: Option<String>,
    ) -> Result<(), CacheError>;

    async fn record_metadata(&mut self, info: TrackInfo) -> Result<(), CacheError>;

    /// Flushes pending data. Calling it more than once is harmless.
    async fn close(&mut self) -> Result<(), CacheError>;

    /// Drops every track that is already cached, keeping the input order.
    fn filter_cached(&self, tracks: Vec<TrackId>) -> Vec<TrackId> {
        tracks.into_iter().filter(|t| !self.contains(t)).collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    tracks: BTreeMap<TrackId, CachedTrack>,
    #[serde(default)]
    infos: BTreeMap<TrackId, TrackInfo>,
}

/// Cache kept in a single JSON file inside the library directory.
pub struct JsonCache {
    path: PathBuf,
    data: CacheData,
    dirty: bool,
}

impl JsonCache {
    /// Location of the cache file for a library rooted at `home_dir`.
    pub fn cache_path(home_dir: &Path) -> PathBuf {
        home_dir.join(".musync").join("cache.json")
    }

    /// Loads the cache file, starting empty when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let data = match async_fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => CacheData::default(),
            Err(e) => return Err(CacheError::Io(e)),
        };

        Ok(Self {
            path,
            data,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch file a write goes to before it replaces the cache file.
    pub fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn persist(&mut self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // write aside and rename, so an interrupted write never leaves a
        // truncated cache behind
        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp_path = Self::tmp_path(&self.path);
        async_fs::write(&tmp_path, json).await?;
        async_fs::rename(&tmp_path, &self.path).await?;
        self.dirty = false;
        Ok(())
    }
}

#[async_trait]
impl TrackCache for JsonCache {
    fn contains(&self, track_id: &TrackId) -> bool {
        self.data.tracks.contains_key(track_id)
    }

    fn get(&self, track_id: &TrackId) -> Option<CachedTrack> {
        self.data.tracks.get(track_id).cloned()
    }

    fn metadata(&self, track_id: &TrackId) -> Option<TrackInfo> {
        self.data.infos.get(track_id).cloned()
    }

    fn track_ids(&self) -> Vec<TrackId> {
        self.data.tracks.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.data.tracks.len()
    }

    async fn record_outcome(
        &mut self,
        track_id: &TrackId,
        filtered_reason: Option<String>,
    ) -> Result<(), CacheError> {
        self.data.tracks.insert(
            track_id.clone(),
            CachedTrack {
                track_id: track_id.clone(),
                filtered_reason,
                last_modified: Utc::now(),
            },
        );
        self.dirty = true;
        self.persist().await
    }

    async fn record_metadata(&mut self, info: TrackInfo) -> Result<(), CacheError> {
        self.data.infos.insert(info.id.clone(), info);
        self.dirty = true;
        self.persist().await
    }

    async fn close(&mut self) -> Result<(), CacheError> {
        if self.dirty {
            self.persist().await?;
        }
        Ok(())
    }
}

/// In-memory cache, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    tracks: HashMap<TrackId, CachedTrack>,
    infos: HashMap<TrackId, TrackInfo>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackCache for MemoryCache {
    fn contains(&self, track_id: &TrackId) -> bool {
        self.tracks.contains_key(track_id)
    }

    fn get(&self, track_id: &TrackId) -> Option<CachedTrack> {
        self.tracks.get(track_id).cloned()
    }

    fn metadata(&self, track_id: &TrackId) -> Option<TrackInfo> {
        self.infos.get(track_id).cloned()
    }

    fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn len(&self) -> usize {
        self.tracks.len()
    }

    async fn record_outcome(
        &mut self,
        track_id: &TrackId,
        filtered_reason: Option<String>,
    ) -> Result<(), CacheError> {
        self.tracks.insert(
            track_id.clone(),
            CachedTrack {
                track_id: track_id.clone(),
                filtered_reason,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn record_metadata(&mut self, info: TrackInfo) -> Result<(), CacheError> {
        self.infos.insert(info.id.clone(), info);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), CacheError> {
        Ok(())
    }
}
