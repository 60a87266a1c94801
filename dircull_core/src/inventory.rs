use crate::natural::natural_cmp;
use dircull_common::{DircullError, FileRecord, RunConfig, Side};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::{Parallelism, WalkDir};
use std::path::Path;
use tracing::debug;

/// Walks one tree and produces its ordered file inventory
pub struct InventoryBuilder {
    custom_ignore: Option<Gitignore>,
}

impl InventoryBuilder {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            custom_ignore: Self::build_custom_ignore(&config.ignore_patterns),
        }
    }

    /// Build a Gitignore from custom ignore patterns
    fn build_custom_ignore(patterns: &[String]) -> Option<Gitignore> {
        if patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    /// Walk `root` recursively and return a record for every regular file,
    /// ordered naturally within each directory level. Read-only; an empty
    /// tree yields an empty inventory, which the pipeline treats as fatal.
    pub fn build(&self, root: &Path, side: Side) -> Result<Vec<FileRecord>, DircullError> {
        if !root.is_dir() {
            return Err(DircullError::NotADirectory(root.to_path_buf()));
        }

        let mut records = Vec::new();

        // The pipeline is a single-threaded sequence of phases, so the walk
        // runs serial as well.
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .follow_links(false)
            .skip_hidden(false);

        for entry in walker {
            let entry = entry.map_err(|e| DircullError::Walk(e.to_string()))?;

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(&path);
            if self.should_ignore(relative) {
                continue;
            }

            if let Some(record) = FileRecord::from_path(path, side) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| {
            a.path
                .parent()
                .cmp(&b.path.parent())
                .then_with(|| natural_cmp(&a.file_name, &b.file_name))
        });

        debug!(
            "Inventoried {} files from {} ({})",
            records.len(),
            root.display(),
            side.label()
        );
        Ok(records)
    }

    /// Check the path and all its parent directories against the ignore set
    fn should_ignore(&self, path: &Path) -> bool {
        let Some(ref ignore) = self.custom_ignore else {
            return false;
        };

        if ignore.matched(path, false).is_ignore() {
            return true;
        }

        let mut current = path;
        while let Some(parent) = current.parent() {
            if !parent.as_os_str().is_empty() && ignore.matched(parent, true).is_ignore() {
                return true;
            }
            current = parent;
        }
        false
    }
}
