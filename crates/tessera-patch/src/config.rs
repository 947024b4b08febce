//! Patch tuning parameters.

/// Configuration for the data-parallel kernels of a patch.
///
/// Only affects how work is scheduled, never the bytes produced: serial
/// and parallel kernels write identical output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchConfig {
    /// Minimum buffer size in bytes before a transpose splits its outer
    /// spatial loop across worker threads.
    ///
    /// Default: 4 MiB. Smaller buffers are cheaper to copy on one core
    /// than to hand out to threads.
    pub parallel_threshold_bytes: usize,

    /// Upper bound on worker threads per kernel invocation.
    ///
    /// Default: `std::thread::available_parallelism()`, or 1 if unknown.
    /// A value of 0 or 1 keeps every kernel on the calling thread.
    pub max_workers: usize,
}

impl PatchConfig {
    /// Default parallel threshold: 4 MiB.
    pub const DEFAULT_PARALLEL_THRESHOLD_BYTES: usize = 4 * 1024 * 1024;

    /// Create a config with default threshold and one worker per
    /// available core.
    pub fn new() -> Self {
        Self {
            parallel_threshold_bytes: Self::DEFAULT_PARALLEL_THRESHOLD_BYTES,
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// A config that never spawns worker threads.
    pub fn serial() -> Self {
        Self {
            parallel_threshold_bytes: usize::MAX,
            max_workers: 1,
        }
    }

    /// Number of workers to use for a buffer of `bytes` bytes split into
    /// at most `slabs` independent pieces.
    pub(crate) fn workers_for(&self, bytes: usize, slabs: usize) -> usize {
        if self.max_workers <= 1 || bytes < self.parallel_threshold_bytes {
            return 1;
        }
        self.max_workers.min(slabs).max(1)
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self::new()
    }
}
