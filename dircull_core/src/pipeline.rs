use crate::digest_cache::DigestCache;
use crate::inventory::InventoryBuilder;
use crate::partition::{plan_mismatches, plan_uniques, TrashLayout};
use crate::progress::Progress;
use crate::reconcile::reconcile;
use crate::relocate::{RelocationEngine, RelocationOutcome};
use crate::verify::ContentVerifier;
use dircull_common::{DircullError, FileRecord, RunConfig, Side};
use serde::Serialize;
use tracing::info;

/// Everything a run did: initial inventory sizes and the outcome of every
/// planned relocation, failures included.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub left_total: usize,
    pub right_total: usize,
    pub unique_outcomes: Vec<RelocationOutcome>,
    pub mismatch_outcomes: Vec<RelocationOutcome>,
}

impl RunReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &RelocationOutcome> {
        self.unique_outcomes.iter().chain(self.mismatch_outcomes.iter())
    }

    pub fn moved(&self) -> usize {
        self.outcomes().filter(|o| o.succeeded()).count()
    }

    pub fn failures(&self) -> Vec<&RelocationOutcome> {
        self.outcomes().filter(|o| !o.succeeded()).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes().any(|o| !o.succeeded())
    }

    /// Files that kept their place: everything inventoried minus everything
    /// planned for relocation.
    pub fn kept(&self) -> usize {
        (self.left_total + self.right_total)
            .saturating_sub(self.unique_outcomes.len() + self.mismatch_outcomes.len())
    }
}

/// Sequential run driver: inventory both trees, quarantine uniques, then
/// optionally verify name-matched pairs by content and quarantine
/// mismatches. Each phase runs to completion before the next starts.
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self, progress: &dyn Progress) -> Result<RunReport, DircullError> {
        let builder = InventoryBuilder::new(&self.config);

        let left = builder.build(&self.config.left_dir, Side::Left)?;
        let right = builder.build(&self.config.right_dir, Side::Right)?;

        // Empty trees abort before any destination folder exists
        if left.is_empty() {
            return Err(DircullError::EmptyInventory(self.config.left_dir.clone()));
        }
        if right.is_empty() {
            return Err(DircullError::EmptyInventory(self.config.right_dir.clone()));
        }

        info!(
            "Inventoried {} files left, {} files right",
            left.len(),
            right.len()
        );

        let layout = TrashLayout::from_config(&self.config);
        let engine = RelocationEngine::new(self.config.dry_run);

        let partition = reconcile(&left, &right, self.config.policy);
        info!(
            "{} unique files to quarantine ({} left, {} right)",
            partition.total(),
            partition.unique_left.len(),
            partition.unique_right.len()
        );

        let unique_entries = plan_uniques(&partition, &layout);
        let mut report = RunReport {
            left_total: left.len(),
            right_total: right.len(),
            unique_outcomes: engine.relocate_batch(&unique_entries, progress),
            mismatch_outcomes: Vec::new(),
        };

        if !self.config.verify_content {
            return Ok(report);
        }

        // The verification pass operates on the post-relocation state of
        // each tree; quarantine folders nested under an input tree are
        // filtered out rather than re-inventoried.
        let left = self.rebuild(&builder, &layout, Side::Left)?;
        let right = self.rebuild(&builder, &layout, Side::Right)?;

        let verifier = match &self.config.cache_dir {
            Some(dir) => ContentVerifier::with_cache(DigestCache::new(dir.clone())?),
            None => ContentVerifier::new(),
        };

        let mismatches = verifier.verify(&left, &right, self.config.policy, progress)?;
        info!("{} hash mismatches to quarantine", mismatches.total());

        let mismatch_entries = plan_mismatches(&mismatches, &layout);
        report.mismatch_outcomes = engine.relocate_batch(&mismatch_entries, progress);
        verifier.persist_cache()?;

        Ok(report)
    }

    fn rebuild(
        &self,
        builder: &InventoryBuilder,
        layout: &TrashLayout,
        side: Side,
    ) -> Result<Vec<FileRecord>, DircullError> {
        let mut records = builder.build(self.config.dir(side), side)?;
        records.retain(|record| !layout.contains(&record.path));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        left: PathBuf,
        right: PathBuf,
        out: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let left = temp.path().join("first");
            let right = temp.path().join("second");
            let out = temp.path().join("out");
            fs::create_dir(&left).unwrap();
            fs::create_dir(&right).unwrap();
            fs::create_dir(&out).unwrap();
            Self {
                _temp: temp,
                left,
                right,
                out,
            }
        }

        fn config(&self) -> RunConfig {
            let mut config = RunConfig::new(self.left.clone(), self.right.clone());
            config.trash_root = self.out.clone();
            config
        }

        fn write(&self, base: &Path, rel: &str, content: &str) {
            let path = base.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        fn trash(&self) -> PathBuf {
            self.out.join("trash_files")
        }
    }

    #[test]
    fn test_uniques_quarantined_shared_kept() {
        let fx = Fixture::new();
        fx.write(&fx.left, "shared.txt", "same");
        fx.write(&fx.left, "only_left.txt", "a");
        fx.write(&fx.right, "shared.txt", "same");
        fx.write(&fx.right, "only_right.txt", "b");

        let report = Pipeline::new(fx.config()).run(&NoProgress).unwrap();

        assert_eq!(report.moved(), 2);
        assert!(!report.has_failures());
        assert!(fx.trash().join("only_left.txt").exists());
        assert!(fx.trash().join("only_right.txt").exists());
        assert!(fx.left.join("shared.txt").exists());
        assert!(fx.right.join("shared.txt").exists());
        assert_eq!(report.kept(), 2);
    }

    #[test]
    fn test_empty_tree_aborts_without_folders() {
        let fx = Fixture::new();
        fx.write(&fx.left, "a.txt", "x");
        // right stays empty

        let err = Pipeline::new(fx.config()).run(&NoProgress).unwrap_err();
        assert!(matches!(err, DircullError::EmptyInventory(_)));
        assert!(!fx.trash().exists());
        assert!(fx.left.join("a.txt").exists());
    }

    #[test]
    fn test_no_differences_is_success() {
        let fx = Fixture::new();
        fx.write(&fx.left, "same.txt", "x");
        fx.write(&fx.right, "same.txt", "x");

        let report = Pipeline::new(fx.config()).run(&NoProgress).unwrap();
        assert_eq!(report.moved(), 0);
        assert!(!fx.trash().exists());
    }

    #[test]
    fn test_idempotent_rerun() {
        let fx = Fixture::new();
        fx.write(&fx.left, "shared.txt", "same");
        fx.write(&fx.left, "extra.txt", "a");
        fx.write(&fx.right, "shared.txt", "same");

        let pipeline = Pipeline::new(fx.config());
        let first = pipeline.run(&NoProgress).unwrap();
        assert_eq!(first.moved(), 1);

        let second = pipeline.run(&NoProgress).unwrap();
        assert_eq!(second.moved(), 0);
        assert!(second.unique_outcomes.is_empty());
    }

    #[test]
    fn test_verification_quarantines_both_sides() {
        let fx = Fixture::new();
        fx.write(&fx.left, "x.txt", "foo");
        fx.write(&fx.right, "x.txt", "bar");
        fx.write(&fx.left, "ok.txt", "same");
        fx.write(&fx.right, "ok.txt", "same");

        let mut config = fx.config();
        config.verify_content = true;
        let report = Pipeline::new(config).run(&NoProgress).unwrap();

        assert_eq!(report.mismatch_outcomes.len(), 2);
        assert!(!report.has_failures());

        let mismatch_dir = fx.out.join("trash_files_hash_mismatch");
        assert!(mismatch_dir.join("x.txt").exists());
        assert!(mismatch_dir.join("x (1).txt").exists());
        assert!(!fx.left.join("x.txt").exists());
        assert!(!fx.right.join("x.txt").exists());
        assert!(fx.left.join("ok.txt").exists());
        assert!(fx.right.join("ok.txt").exists());
    }

    #[test]
    fn test_separate_trash_mode() {
        let fx = Fixture::new();
        fx.write(&fx.left, "only_left.txt", "a");
        fx.write(&fx.left, "shared.txt", "s");
        fx.write(&fx.right, "only_right.txt", "b");
        fx.write(&fx.right, "shared.txt", "s");

        let mut config = fx.config();
        config.separate_trash = true;
        let report = Pipeline::new(config).run(&NoProgress).unwrap();

        assert_eq!(report.moved(), 2);
        assert!(fx.out.join("trash_from_first/only_left.txt").exists());
        assert!(fx.out.join("trash_from_second/only_right.txt").exists());
    }

    #[test]
    fn test_dry_run_plans_without_moving() {
        let fx = Fixture::new();
        fx.write(&fx.left, "only_left.txt", "a");
        fx.write(&fx.right, "other.txt", "b");

        let mut config = fx.config();
        config.dry_run = true;
        let report = Pipeline::new(config).run(&NoProgress).unwrap();

        assert_eq!(report.unique_outcomes.len(), 2);
        assert!(report.outcomes().all(|o| o.succeeded()));
        assert!(fx.left.join("only_left.txt").exists());
        assert!(!fx.trash().exists());
    }

    #[test]
    fn test_duplicate_stems_all_quarantined() {
        let fx = Fixture::new();
        fx.write(&fx.left, "one/x.jpg", "first copy");
        fx.write(&fx.left, "two/x.jpg", "second copy");
        fx.write(&fx.left, "shared.txt", "s");
        fx.write(&fx.right, "shared.txt", "s");

        let report = Pipeline::new(fx.config()).run(&NoProgress).unwrap();

        assert_eq!(report.moved(), 2);
        assert!(fx.trash().join("x.jpg").exists());
        assert!(fx.trash().join("x (1).jpg").exists());
        assert!(!fx.left.join("one/x.jpg").exists());
        assert!(!fx.left.join("two/x.jpg").exists());
    }
}
