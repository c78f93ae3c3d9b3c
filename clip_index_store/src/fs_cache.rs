use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{IndexStoreError, StoreResult};
use crate::VideoId;

/// Number of mutations accumulated before an automatic save to disk, rather
/// than saving on every single insert.
const AUTOSAVE_THRESHOLD: u32 = 20;

/// A flat on-disk cache of `VideoId -> T`, bincode-serialized as a whole and
/// written atomically (temp file then rename) to avoid truncating the cache
/// file if the process is killed mid-write.
///
/// Guards its table with `std::sync::RwLock`; `parking_lot` is not part of
/// this project's dependency stack.
pub struct FsCache<T> {
    cache_path: PathBuf,
    table: RwLock<HashMap<VideoId, T>>,
    dirty_count: AtomicU32,
}

impl<T> FsCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(cache_path: PathBuf) -> StoreResult<Self> {
        let table = load_cache_from_disk(&cache_path)?;
        Ok(Self {
            cache_path,
            table: RwLock::new(table),
            dirty_count: AtomicU32::new(0),
        })
    }

    pub fn fetch(&self, key: &VideoId) -> StoreResult<T> {
        self.table
            .read()
            .expect("index store lock poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| IndexStoreError::KeyMissing(key.clone()))
    }

    pub fn contains_key(&self, key: &VideoId) -> bool {
        self.table.read().expect("index store lock poisoned").contains_key(key)
    }

    pub fn keys(&self) -> Vec<VideoId> {
        self.table
            .read()
            .expect("index store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> HashMap<VideoId, T> {
        self.table.read().expect("index store lock poisoned").clone()
    }

    pub fn insert(&self, key: VideoId, value: T) -> StoreResult<()> {
        self.table
            .write()
            .expect("index store lock poisoned")
            .insert(key, value);
        self.update_dirty_count_and_save_if_necessary()
    }

    pub fn remove(&self, key: &VideoId) -> StoreResult<()> {
        self.table.write().expect("index store lock poisoned").remove(key);
        self.update_dirty_count_and_save_if_necessary()
    }

    fn update_dirty_count_and_save_if_necessary(&self) -> StoreResult<()> {
        let count = self.dirty_count.fetch_add(1, Ordering::AcqRel) + 1;
        if count >= AUTOSAVE_THRESHOLD {
            self.dirty_count.store(0, Ordering::Release);
            self.save()?;
        }
        Ok(())
    }

    /// Serializes the whole table and writes it via a temp-file-then-rename,
    /// so a crash mid-write never leaves a truncated cache file behind.
    pub fn save(&self) -> StoreResult<()> {
        let table = self.table.read().expect("index store lock poisoned").clone();
        let bytes =
            bincode::serialize(&table).map_err(|source| IndexStoreError::Serialization {
                path: self.cache_path.clone(),
                source,
            })?;

        let tmp_path = self.cache_path.with_extension("tmp");
        fs::write(&tmp_path, bytes).map_err(|source| IndexStoreError::CacheFileIo {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.cache_path).map_err(|source| IndexStoreError::CacheFileIo {
            path: self.cache_path.clone(),
            source,
        })?;

        Ok(())
    }
}

fn load_cache_from_disk<T>(cache_path: &PathBuf) -> StoreResult<HashMap<VideoId, T>>
where
    T: DeserializeOwned,
{
    match fs::read(cache_path) {
        Ok(bytes) => bincode::deserialize(&bytes).map_err(|source| IndexStoreError::Deserialization {
            path: cache_path.clone(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(source) => Err(IndexStoreError::CacheFileIo {
            path: cache_path.clone(),
            source,
        }),
    }
}
