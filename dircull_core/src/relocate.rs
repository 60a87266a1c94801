use crate::progress::Progress;
use dircull_common::{DircullError, DispositionEntry};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of executing one disposition entry. Failures are data, not
/// control flow; a batch keeps going past them.
#[derive(Debug, Clone, Serialize)]
pub struct RelocationOutcome {
    pub entry: DispositionEntry,
    /// Where the file actually landed, including any collision suffix
    pub destination: Option<PathBuf>,
    pub error: Option<String>,
}

impl RelocationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Executes planned relocations: move-with-rename, cross-device fallback,
/// and collision-avoiding destination names.
pub struct RelocationEngine {
    dry_run: bool,
}

impl RelocationEngine {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Execute a batch sequentially. A failing entry is recorded and the
    /// rest of the batch proceeds.
    pub fn relocate_batch(
        &self,
        entries: &[DispositionEntry],
        progress: &dyn Progress,
    ) -> Vec<RelocationOutcome> {
        progress.begin("relocate", entries.len() as u64);

        let outcomes: Vec<RelocationOutcome> = entries
            .iter()
            .map(|entry| {
                let outcome = match self.relocate(entry) {
                    Ok(destination) => RelocationOutcome {
                        entry: entry.clone(),
                        destination: Some(destination),
                        error: None,
                    },
                    Err(e) => {
                        warn!(
                            "Failed to relocate {}: {}",
                            entry.record.path.display(),
                            e
                        );
                        RelocationOutcome {
                            entry: entry.clone(),
                            destination: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                progress.inc(1);
                outcome
            })
            .collect();

        progress.finish();
        outcomes
    }

    /// Move one file into its bucket folder, returning the path it landed
    /// at. Never overwrites: an occupied name gets a numeric suffix.
    pub fn relocate(&self, entry: &DispositionEntry) -> Result<PathBuf, DircullError> {
        let dest = unique_destination(&entry.destination, &entry.record.file_name);

        if self.dry_run {
            info!(
                "DRY RUN: would move {} to {}",
                entry.record.path.display(),
                dest.display()
            );
            return Ok(dest);
        }

        fs::create_dir_all(&entry.destination)?;
        self.move_file(&entry.record.path, &dest)?;
        Ok(dest)
    }

    fn move_file(&self, source: &Path, dest: &Path) -> Result<(), DircullError> {
        debug!("Moving {} to {}", source.display(), dest.display());

        match fs::rename(source, dest) {
            Ok(()) => {
                info!("Moved {} to {} (rename)", source.display(), dest.display());
                Ok(())
            }
            Err(e) => {
                // EXDEV on Unix, ERROR_NOT_SAME_DEVICE on Windows
                #[cfg(unix)]
                let is_cross_device = e.raw_os_error() == Some(18);

                #[cfg(windows)]
                let is_cross_device = e.raw_os_error() == Some(17);

                #[cfg(not(any(unix, windows)))]
                let is_cross_device = true;

                if !is_cross_device {
                    return Err(e.into());
                }

                debug!("Cross-filesystem move detected, using copy+delete fallback");
                fs::copy(source, dest)?;
                if let Ok(metadata) = fs::metadata(source) {
                    if let Ok(modified) = metadata.modified() {
                        let _ = filetime::set_file_mtime(
                            dest,
                            filetime::FileTime::from_system_time(modified),
                        );
                    }
                }
                fs::remove_file(source)?;
                info!(
                    "Moved {} to {} (copy+delete)",
                    source.display(),
                    dest.display()
                );
                Ok(())
            }
        }
    }
}

/// First free destination path for `file_name` under `dir`: the plain name
/// if unoccupied, otherwise "name (1).ext", "name (2).ext", and so on.
fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 1.. {
        let suffixed = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(suffixed);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use dircull_common::{Bucket, FileRecord, Side};
    use tempfile::TempDir;

    fn entry(source: PathBuf, destination: PathBuf) -> DispositionEntry {
        DispositionEntry {
            record: FileRecord::from_path(source, Side::Left).unwrap(),
            bucket: Bucket::UniqueLeft,
            destination,
        }
    }

    #[test]
    fn test_move_into_created_folder() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, b"content").unwrap();
        let trash = temp.path().join("trash");

        let engine = RelocationEngine::new(false);
        let dest = engine.relocate(&entry(source.clone(), trash.clone())).unwrap();

        assert!(!source.exists());
        assert_eq!(dest, trash.join("a.txt"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "content");
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let temp = TempDir::new().unwrap();
        let trash = temp.path().join("trash");
        fs::create_dir(&trash).unwrap();
        fs::write(trash.join("a.txt"), b"already here").unwrap();
        fs::write(trash.join("a (1).txt"), b"also here").unwrap();

        let source = temp.path().join("a.txt");
        fs::write(&source, b"incoming").unwrap();

        let engine = RelocationEngine::new(false);
        let dest = engine.relocate(&entry(source, trash.clone())).unwrap();

        assert_eq!(dest, trash.join("a (2).txt"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "incoming");
        // Nothing was overwritten
        assert_eq!(fs::read_to_string(trash.join("a.txt")).unwrap(), "already here");
    }

    #[test]
    fn test_collision_suffix_without_extension() {
        let temp = TempDir::new().unwrap();
        let trash = temp.path().join("trash");
        fs::create_dir(&trash).unwrap();
        fs::write(trash.join("README"), b"old").unwrap();

        let source = temp.path().join("README");
        fs::write(&source, b"new").unwrap();

        let engine = RelocationEngine::new(false);
        let dest = engine.relocate(&entry(source, trash.clone())).unwrap();
        assert_eq!(dest, trash.join("README (1)"));
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, b"content").unwrap();
        let trash = temp.path().join("trash");

        let engine = RelocationEngine::new(true);
        let dest = engine.relocate(&entry(source.clone(), trash.clone())).unwrap();

        assert!(source.exists());
        assert!(!trash.exists());
        assert_eq!(dest, trash.join("a.txt"));
    }

    #[test]
    fn test_batch_continues_past_failure() {
        let temp = TempDir::new().unwrap();
        let trash = temp.path().join("trash");

        let good = temp.path().join("good.txt");
        fs::write(&good, b"ok").unwrap();
        let missing = temp.path().join("vanished.txt");

        let entries = vec![
            entry(missing, trash.clone()),
            entry(good.clone(), trash.clone()),
        ];

        let engine = RelocationEngine::new(false);
        let outcomes = engine.relocate_batch(&entries, &NoProgress);

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].succeeded());
        assert!(outcomes[0].error.is_some());
        assert!(outcomes[1].succeeded());
        assert!(trash.join("good.txt").exists());
    }

    #[test]
    fn test_same_name_from_two_subfolders() {
        let temp = TempDir::new().unwrap();
        let trash = temp.path().join("trash");
        fs::create_dir_all(temp.path().join("one")).unwrap();
        fs::create_dir_all(temp.path().join("two")).unwrap();
        let first = temp.path().join("one/x.jpg");
        let second = temp.path().join("two/x.jpg");
        fs::write(&first, b"first").unwrap();
        fs::write(&second, b"second").unwrap();

        let entries = vec![entry(first, trash.clone()), entry(second, trash.clone())];
        let engine = RelocationEngine::new(false);
        let outcomes = engine.relocate_batch(&entries, &NoProgress);

        assert!(outcomes.iter().all(|o| o.succeeded()));
        assert!(trash.join("x.jpg").exists());
        assert!(trash.join("x (1).jpg").exists());
    }
}
