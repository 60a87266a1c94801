use crate::reconcile::UniquePartition;
use crate::verify::MismatchSet;
use dircull_common::{Bucket, DispositionEntry, FileRecord, RunConfig, Side};
use std::path::{Path, PathBuf};

/// Destination directories for every bucket, derived once from the run
/// configuration. Pure planning; nothing here touches the filesystem.
#[derive(Debug, Clone)]
pub struct TrashLayout {
    unique_left: PathBuf,
    unique_right: PathBuf,
    mismatch_left: PathBuf,
    mismatch_right: PathBuf,
}

impl TrashLayout {
    pub fn from_config(config: &RunConfig) -> Self {
        let root = &config.trash_root;

        if config.separate_trash {
            let (left_label, right_label) = tree_labels(&config.left_dir, &config.right_dir);
            Self {
                unique_left: root.join(format!("trash_from_{}", left_label)),
                unique_right: root.join(format!("trash_from_{}", right_label)),
                mismatch_left: root.join(format!("hash_mismatch_from_{}", left_label)),
                mismatch_right: root.join(format!("hash_mismatch_from_{}", right_label)),
            }
        } else {
            let unique = root.join(&config.trash_name);
            let mismatch = root.join(format!("{}_hash_mismatch", config.trash_name));
            Self {
                unique_left: unique.clone(),
                unique_right: unique,
                mismatch_left: mismatch.clone(),
                mismatch_right: mismatch,
            }
        }
    }

    pub fn destination(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::UniqueLeft => &self.unique_left,
            Bucket::UniqueRight => &self.unique_right,
            Bucket::HashMismatchLeft => &self.mismatch_left,
            Bucket::HashMismatchRight => &self.mismatch_right,
        }
    }

    /// Whether a path sits inside one of the quarantine folders. Used to
    /// keep already-quarantined files out of rebuilt inventories.
    pub fn contains(&self, path: &Path) -> bool {
        [
            &self.unique_left,
            &self.unique_right,
            &self.mismatch_left,
            &self.mismatch_right,
        ]
        .iter()
        .any(|dir| path.starts_with(dir))
    }
}

/// Final component of a tree path, used in quarantine folder names. Equal
/// labels (same directory name under different parents) are disambiguated
/// by side so separate-trash mode never merges the two folders.
fn tree_labels(left_dir: &Path, right_dir: &Path) -> (String, String) {
    let left = tree_label(left_dir);
    let right = tree_label(right_dir);
    if left == right {
        (
            format!("{}_{}", left, Side::Left.label()),
            format!("{}_{}", right, Side::Right.label()),
        )
    } else {
        (left, right)
    }
}

fn tree_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().replace('/', "_").replace('\\', "_"))
}

fn entries_for(records: &[FileRecord], bucket: Bucket, layout: &TrashLayout) -> Vec<DispositionEntry> {
    records
        .iter()
        .map(|record| DispositionEntry {
            record: record.clone(),
            bucket,
            destination: layout.destination(bucket).to_path_buf(),
        })
        .collect()
}

/// Plan relocations for the unique-file pass
pub fn plan_uniques(partition: &UniquePartition, layout: &TrashLayout) -> Vec<DispositionEntry> {
    let mut entries = entries_for(&partition.unique_left, Bucket::UniqueLeft, layout);
    entries.extend(entries_for(
        &partition.unique_right,
        Bucket::UniqueRight,
        layout,
    ));
    entries
}

/// Plan relocations for the hash-mismatch pass
pub fn plan_mismatches(mismatches: &MismatchSet, layout: &TrashLayout) -> Vec<DispositionEntry> {
    let mut entries = entries_for(&mismatches.mismatch_left, Bucket::HashMismatchLeft, layout);
    entries.extend(entries_for(
        &mismatches.mismatch_right,
        Bucket::HashMismatchRight,
        layout,
    ));
    entries
}
