use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Which of the two input trees a record was discovered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// A regular file discovered during an inventory walk.
///
/// Immutable once built; the side never changes for the lifetime of the
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path of the file as discovered
    pub path: PathBuf,
    /// File name including extension
    pub file_name: String,
    /// File name without its final extension
    pub stem: String,
    pub side: Side,
}

impl FileRecord {
    /// Build a record from a path. Returns `None` when the path has no
    /// final component (e.g. a bare root).
    pub fn from_path(path: PathBuf, side: Side) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        Some(Self {
            path,
            file_name,
            stem,
            side,
        })
    }
}

/// How a comparison identifier is derived from a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// File name without its final extension; "photo.jpg" and "photo.png"
    /// share an identifier
    #[default]
    Stem,
    /// Full file name; the extension is significant
    FullName,
}

impl NamePolicy {
    /// Derive the comparison identifier for a record. Pure; never looks at
    /// file content.
    pub fn identifier<'a>(&self, record: &'a FileRecord) -> &'a str {
        match self {
            NamePolicy::Stem => &record.stem,
            NamePolicy::FullName => &record.file_name,
        }
    }
}

/// Final classification of a quarantined file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bucket {
    UniqueLeft,
    UniqueRight,
    HashMismatchLeft,
    HashMismatchRight,
}

impl Bucket {
    pub fn unique(side: Side) -> Self {
        match side {
            Side::Left => Bucket::UniqueLeft,
            Side::Right => Bucket::UniqueRight,
        }
    }

    pub fn hash_mismatch(side: Side) -> Self {
        match side {
            Side::Left => Bucket::HashMismatchLeft,
            Side::Right => Bucket::HashMismatchRight,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Bucket::UniqueLeft | Bucket::HashMismatchLeft => Side::Left,
            Bucket::UniqueRight | Bucket::HashMismatchRight => Side::Right,
        }
    }

    pub fn is_hash_mismatch(self) -> bool {
        matches!(self, Bucket::HashMismatchLeft | Bucket::HashMismatchRight)
    }
}

/// A planned relocation: which file, why, and the directory it goes to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispositionEntry {
    pub record: FileRecord,
    pub bucket: Bucket,
    pub destination: PathBuf,
}

/// Content digest computed for a record during verification
#[derive(Debug, Clone)]
pub struct DigestRecord {
    pub record: FileRecord,
    pub digest: Blake3Hash,
}

/// BLAKE3 hash value (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<blake3::Hash> for Blake3Hash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Cache key for file digests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Immutable configuration for one run, fixed before the first phase
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub left_dir: PathBuf,
    pub right_dir: PathBuf,
    /// Directory under which quarantine folders are created
    pub trash_root: PathBuf,
    /// Folder name used in single-trash mode
    pub trash_name: String,
    /// One quarantine folder per source tree instead of a shared one
    pub separate_trash: bool,
    pub policy: NamePolicy,
    /// Re-hash name-matched files after the unique pass
    pub verify_content: bool,
    /// Gitignore-syntax patterns excluded from inventories
    pub ignore_patterns: Vec<String>,
    /// Plan and log without touching the filesystem
    pub dry_run: bool,
    pub cache_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(left_dir: PathBuf, right_dir: PathBuf) -> Self {
        Self {
            left_dir,
            right_dir,
            trash_root: PathBuf::from("."),
            trash_name: String::from("trash_files"),
            separate_trash: false,
            policy: NamePolicy::Stem,
            verify_content: false,
            ignore_patterns: Vec::new(),
            dry_run: false,
            cache_dir: None,
        }
    }

    pub fn dir(&self, side: Side) -> &Path {
        match side {
            Side::Left => &self.left_dir,
            Side::Right => &self.right_dir,
        }
    }
}

/// Persisted application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Ignore patterns (e.g., "*.o", "node_modules/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Default quarantine folder name
    #[serde(default)]
    pub trash_dir: Option<String>,

    /// Whether content verification runs by default
    #[serde(default)]
    pub verify_content: bool,

    /// Digest cache directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}
