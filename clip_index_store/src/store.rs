use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clip_locator_core::{build_index_record, IndexRecord, SegmentHasherConfig, VideoId};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{IndexStoreError, StoreResult};
use crate::fs_cache::FsCache;

/// Source mtimes are compared with this much slack, since some filesystems
/// (network mounts in particular) round trip a modification time with less
/// precision than it was written with.
const DURATION_TOLERANCE_SECS: i64 = 2;

#[derive(Clone, Serialize, Deserialize)]
struct StoredRecord {
    source_mtime: SystemTime,
    record: IndexRecord,
}

enum UpdateAction {
    UpToDate(IndexRecord),
    Stale(SystemTime),
    Missing,
}

/// A disk-backed cache of [`IndexRecord`]s keyed by [`VideoId`], with
/// modification-time-based staleness invalidation: a source video whose mtime
/// has moved since it was indexed is re-indexed transparently on the next
/// [`ClipIndexStore::fetch_update`] call.
pub struct ClipIndexStore {
    cache: FsCache<StoredRecord>,
}

impl ClipIndexStore {
    pub fn open(cache_path: PathBuf) -> StoreResult<Self> {
        Ok(Self {
            cache: FsCache::new(cache_path)?,
        })
    }

    pub fn save(&self) -> StoreResult<()> {
        self.cache.save()
    }

    pub fn contains_key(&self, video_id: &VideoId) -> bool {
        self.cache.contains_key(video_id)
    }

    pub fn keys(&self) -> Vec<VideoId> {
        self.cache.keys()
    }

    pub fn fetch(&self, video_id: &VideoId) -> StoreResult<IndexRecord> {
        self.cache.fetch(video_id).map(|stored| stored.record)
    }

    pub fn remove(&self, video_id: &VideoId) -> StoreResult<()> {
        self.cache.remove(video_id)
    }

    /// Atomic replace of `video_id`'s record, stamped with the current time
    /// as its `source_mtime`. This is the direct `put` operation; callers
    /// that want mtime-based staleness tracking against an actual source
    /// file should go through [`ClipIndexStore::fetch_update`] instead.
    pub fn put(&self, video_id: &VideoId, record: IndexRecord) -> StoreResult<()> {
        self.cache.insert(
            video_id.clone(),
            StoredRecord {
                source_mtime: SystemTime::now(),
                record,
            },
        )
    }

    /// Returns the full corpus as `VideoId -> IndexRecord`, for feeding
    /// straight into the coarse ranker and orchestrator.
    pub fn get_all(&self) -> HashMap<VideoId, IndexRecord> {
        self.cache
            .entries()
            .into_iter()
            .map(|(id, stored)| (id, stored.record))
            .collect()
    }

    /// Ensures `video_id`'s entry reflects the current state of `src_path` on
    /// disk: inserts it if missing, re-indexes it if the source's mtime has
    /// moved, and otherwise returns the cached record untouched.
    pub fn fetch_update(
        &self,
        video_id: &VideoId,
        src_path: &Path,
        hasher_config: SegmentHasherConfig,
    ) -> StoreResult<Option<IndexRecord>> {
        match self.update_action(video_id, src_path)? {
            UpdateAction::UpToDate(record) => Ok(Some(record)),
            UpdateAction::Stale(mtime) => {
                self.force_update(video_id, src_path, mtime, hasher_config)
                    .map(Some)
            }
            UpdateAction::Missing => {
                self.remove(video_id)?;
                Ok(None)
            }
        }
    }

    fn force_update(
        &self,
        video_id: &VideoId,
        src_path: &Path,
        source_mtime: SystemTime,
        hasher_config: SegmentHasherConfig,
    ) -> StoreResult<IndexRecord> {
        info!("indexing {video_id} from {}", src_path.display());
        let record = build_index_record(video_id, src_path, hasher_config).map_err(|source| {
            IndexStoreError::Indexing {
                video_id: video_id.clone(),
                path: src_path.to_path_buf(),
                source,
            }
        })?;

        self.cache.insert(
            video_id.clone(),
            StoredRecord {
                source_mtime,
                record: record.clone(),
            },
        )?;

        Ok(record)
    }

    fn update_action(&self, video_id: &VideoId, src_path: &Path) -> StoreResult<UpdateAction> {
        let fs_mtime = match fs::metadata(src_path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(UpdateAction::Missing),
            Err(source) => {
                return Err(IndexStoreError::CacheFileIo {
                    path: src_path.to_path_buf(),
                    source,
                })
            }
        };

        let cached = match self.cache.fetch(video_id) {
            Ok(stored) => stored,
            Err(_) => return Ok(UpdateAction::Stale(fs_mtime)),
        };

        if mtimes_match(cached.source_mtime, fs_mtime) {
            debug!("{video_id} is up to date in the index store");
            Ok(UpdateAction::UpToDate(cached.record))
        } else {
            Ok(UpdateAction::Stale(fs_mtime))
        }
    }
}

fn mtimes_match(cached: SystemTime, current: SystemTime) -> bool {
    let cached_secs = cached.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let current_secs = current.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    (cached_secs - current_secs).abs() <= DURATION_TOLERANCE_SECS
}
