use dircull_common::{Blake3Hash, CacheKey, DircullError};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, warn};

const CACHE_FILE_NAME: &str = "digest_cache.bin";

/// In-memory, disk-backed cache of file content digests, keyed by
/// path + mtime + size so stale entries never match.
pub struct DigestCache {
    cache_dir: PathBuf,
    entries: RwLock<HashMap<CacheKey, Blake3Hash>>,
}

impl DigestCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self, DircullError> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let mut entries = HashMap::new();

        let cache_file = cache_dir.join(CACHE_FILE_NAME);
        if cache_file.exists() {
            match fs::read(&cache_file) {
                Ok(data) => {
                    if let Ok(loaded) =
                        bincode::deserialize::<HashMap<CacheKey, Blake3Hash>>(&data)
                    {
                        entries = loaded;
                        debug!("Loaded {} digests from cache", entries.len());
                    }
                }
                Err(e) => {
                    warn!("Failed to load digest cache: {}", e);
                }
            }
        }

        Ok(Self {
            cache_dir,
            entries: RwLock::new(entries),
        })
    }

    pub fn get(&self, key: &CacheKey) -> Option<Blake3Hash> {
        self.entries.read().ok()?.get(key).copied()
    }

    pub fn put(&self, key: CacheKey, digest: Blake3Hash) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, digest);
        }
    }

    /// Persist the cache to disk. Written to a temporary file and renamed
    /// into place so an interrupted run cannot corrupt the cache.
    pub fn persist(&self) -> Result<(), DircullError> {
        let cache_file = self.cache_dir.join(CACHE_FILE_NAME);
        let temp_file = self.cache_dir.join(format!("{}.tmp", CACHE_FILE_NAME));

        let entries = self
            .entries
            .read()
            .map_err(|e| DircullError::Cache(format!("lock error: {}", e)))?;

        let data = bincode::serialize(&*entries)
            .map_err(|e| DircullError::Serialization(e.to_string()))?;

        fs::write(&temp_file, data)?;
        fs::rename(&temp_file, &cache_file)?;

        debug!("Persisted {} digests to disk", entries.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
