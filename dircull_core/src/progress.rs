/// Observer for long-running phases. Purely observational; implementations
/// must not influence pipeline behavior.
pub trait Progress {
    fn begin(&self, _phase: &str, _total: u64) {}
    fn inc(&self, _n: u64) {}
    fn finish(&self) {}
}

/// Default observer that reports nothing
pub struct NoProgress;

impl Progress for NoProgress {}
