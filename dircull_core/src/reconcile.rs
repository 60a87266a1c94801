use dircull_common::{FileRecord, NamePolicy};
use std::collections::HashMap;
use tracing::debug;

/// Identifier-to-records index for one side, built once per inventory so
/// lookups never rescan the full list.
pub struct IdentifierIndex {
    map: HashMap<String, Vec<usize>>,
}

impl IdentifierIndex {
    pub fn build(inventory: &[FileRecord], policy: NamePolicy) -> Self {
        let mut map: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in inventory.iter().enumerate() {
            map.entry(policy.identifier(record).to_string())
                .or_default()
                .push(idx);
        }
        Self { map }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.map.contains_key(identifier)
    }

    /// Positions of every record carrying `identifier`, in inventory order
    pub fn positions(&self, identifier: &str) -> &[usize] {
        self.map.get(identifier).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Files whose identifier exists on exactly one side. The two lists are
/// disjoint by construction.
#[derive(Debug, Clone, Default)]
pub struct UniquePartition {
    pub unique_left: Vec<FileRecord>,
    pub unique_right: Vec<FileRecord>,
}

impl UniquePartition {
    pub fn is_empty(&self) -> bool {
        self.unique_left.is_empty() && self.unique_right.is_empty()
    }

    pub fn total(&self) -> usize {
        self.unique_left.len() + self.unique_right.len()
    }
}

/// Compute the symmetric difference of the two trees' identifier sets and
/// map each unique identifier back to every record carrying it on the
/// owning side. Identifiers present on both sides are left for content
/// verification. Both lists empty is a valid outcome, not an error.
pub fn reconcile(
    left: &[FileRecord],
    right: &[FileRecord],
    policy: NamePolicy,
) -> UniquePartition {
    let left_index = IdentifierIndex::build(left, policy);
    let right_index = IdentifierIndex::build(right, policy);

    // Iterating the inventories rather than the index keeps output in
    // inventory order and picks up every duplicate carrier.
    let unique_left: Vec<FileRecord> = left
        .iter()
        .filter(|record| !right_index.contains(policy.identifier(record)))
        .cloned()
        .collect();

    let unique_right: Vec<FileRecord> = right
        .iter()
        .filter(|record| !left_index.contains(policy.identifier(record)))
        .cloned()
        .collect();

    debug!(
        "Reconciled {} left / {} right identifiers: {} unique left, {} unique right",
        left_index.len(),
        right_index.len(),
        unique_left.len(),
        unique_right.len()
    );

    UniquePartition {
        unique_left,
        unique_right,
    }
}
