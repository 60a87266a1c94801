use crate::digest_cache::DigestCache;
use crate::progress::Progress;
use crate::reconcile::IdentifierIndex;
use dircull_common::{Blake3Hash, CacheKey, DigestRecord, DircullError, FileRecord, NamePolicy};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Cross-tree files sharing an identifier whose content digests disagree.
/// Both members of every differing pairing are flagged; the system cannot
/// tell which copy is canonical.
#[derive(Debug, Clone, Default)]
pub struct MismatchSet {
    pub mismatch_left: Vec<FileRecord>,
    pub mismatch_right: Vec<FileRecord>,
}

impl MismatchSet {
    pub fn is_empty(&self) -> bool {
        self.mismatch_left.is_empty() && self.mismatch_right.is_empty()
    }

    pub fn total(&self) -> usize {
        self.mismatch_left.len() + self.mismatch_right.len()
    }
}

/// Re-hashes name-matched files across the two trees
pub struct ContentVerifier {
    cache: Option<DigestCache>,
}

impl ContentVerifier {
    pub fn new() -> Self {
        Self { cache: None }
    }

    pub fn with_cache(cache: DigestCache) -> Self {
        Self { cache: Some(cache) }
    }

    pub fn persist_cache(&self) -> Result<(), DircullError> {
        match &self.cache {
            Some(cache) => cache.persist(),
            None => Ok(()),
        }
    }

    /// For every identifier present on both sides, digest every carrier and
    /// compare each left digest against each right digest. Carriers on the
    /// same side are never compared against each other. Files without a
    /// cross-side identifier match are left untouched.
    pub fn verify(
        &self,
        left: &[FileRecord],
        right: &[FileRecord],
        policy: NamePolicy,
        progress: &dyn Progress,
    ) -> Result<MismatchSet, DircullError> {
        let left_index = IdentifierIndex::build(left, policy);
        let right_index = IdentifierIndex::build(right, policy);

        let mut shared: Vec<&str> = left_index
            .identifiers()
            .filter(|id| right_index.contains(id))
            .collect();
        shared.sort_unstable();

        let total: usize = shared
            .iter()
            .map(|id| left_index.positions(id).len() + right_index.positions(id).len())
            .sum();
        info!(
            "Verifying {} shared identifiers ({} files to hash)",
            shared.len(),
            total
        );
        progress.begin("verify", total as u64);

        let mut flagged_left: BTreeSet<usize> = BTreeSet::new();
        let mut flagged_right: BTreeSet<usize> = BTreeSet::new();

        for identifier in shared {
            let left_digests = self.digest_positions(left, left_index.positions(identifier), progress)?;
            let right_digests =
                self.digest_positions(right, right_index.positions(identifier), progress)?;

            for (left_pos, left_digest) in &left_digests {
                for (right_pos, right_digest) in &right_digests {
                    if left_digest.digest != right_digest.digest {
                        debug!(
                            "Digest mismatch for '{}': {} vs {}",
                            identifier,
                            left_digest.record.path.display(),
                            right_digest.record.path.display()
                        );
                        flagged_left.insert(*left_pos);
                        flagged_right.insert(*right_pos);
                    }
                }
            }
        }

        progress.finish();

        Ok(MismatchSet {
            mismatch_left: flagged_left.iter().map(|&i| left[i].clone()).collect(),
            mismatch_right: flagged_right.iter().map(|&i| right[i].clone()).collect(),
        })
    }

    fn digest_positions(
        &self,
        inventory: &[FileRecord],
        positions: &[usize],
        progress: &dyn Progress,
    ) -> Result<Vec<(usize, DigestRecord)>, DircullError> {
        let mut digests = Vec::with_capacity(positions.len());
        for &pos in positions {
            let record = &inventory[pos];
            let digest = self.hash_file(&record.path)?;
            progress.inc(1);
            digests.push((
                pos,
                DigestRecord {
                    record: record.clone(),
                    digest,
                },
            ));
        }
        Ok(digests)
    }

    /// Compute the BLAKE3 digest of a file, streaming in fixed-size chunks
    /// so large files are never loaded whole. Digests depend only on
    /// content, never on path or name.
    pub fn hash_file(&self, path: &Path) -> Result<Blake3Hash, DircullError> {
        let wrap = |source: std::io::Error| DircullError::Hash {
            path: path.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(path).map_err(wrap)?;
        let cache_key = CacheKey {
            path: path.to_path_buf(),
            modified: metadata
                .modified()
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        };

        if let Some(cache) = &self.cache {
            if let Some(digest) = cache.get(&cache_key) {
                debug!("Digest cache hit for {}", path.display());
                return Ok(digest);
            }
        }

        let mut file = std::fs::File::open(path).map_err(wrap)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0; HASH_BUFFER_SIZE];

        loop {
            let n = file.read(&mut buffer).map_err(wrap)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let digest: Blake3Hash = hasher.finalize().into();

        if let Some(cache) = &self.cache {
            cache.put(cache_key, digest);
        }

        Ok(digest)
    }
}

impl Default for ContentVerifier {
    fn default() -> Self {
        Self::new()
    }
}
