pub mod digest_cache;
pub mod inventory;
pub mod natural;
pub mod partition;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod relocate;
pub mod verify;

pub use digest_cache::DigestCache;
pub use inventory::InventoryBuilder;
pub use partition::TrashLayout;
pub use pipeline::{Pipeline, RunReport};
pub use progress::{NoProgress, Progress};
pub use reconcile::{reconcile, IdentifierIndex, UniquePartition};
pub use relocate::{RelocationEngine, RelocationOutcome};
pub use verify::{ContentVerifier, MismatchSet};
