//! Rayon thread pool configuration for simulation workloads.
//!
//! Use [WorkerPool::install] to run the draw simulator with a fixed number
//! of threads, or rely on Rayon's default (all CPU cores). Per-trial seeding
//! keeps results identical across worker counts.

use rayon::ThreadPoolBuilder;

use crate::error::EngineError;
use crate::provider::tables::GameSpec;
use crate::sim::engine::{simulate, SimulateParams};

/// Configures how many worker threads are used for trial execution.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use Rayon default (num_cpus).
    pub workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            workers: 0, // Rayon default
        }
    }
}

impl WorkerPool {
    /// Use exactly `n` worker threads.
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Worker count from `DRAWLAB_WORKERS`, falling back to the Rayon
    /// default when unset or unparseable.
    pub fn from_env() -> Self {
        let workers = std::env::var("DRAWLAB_WORKERS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);
        Self { workers }
    }

    /// Run a closure on a thread pool with this worker count. If
    /// [workers](WorkerPool::workers) is 0, uses the global Rayon pool (all
    /// cores). Otherwise builds a temporary pool with that many threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            f()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .expect("Rayon thread pool");
            pool.install(f)
        }
    }
}

/// Run the simulator inside `pool`. Convenience used by the server pipeline.
pub fn simulate_on_pool(
    spec: &GameSpec,
    params: SimulateParams,
    pool: &WorkerPool,
) -> Result<Vec<u64>, EngineError> {
    pool.install(|| simulate(spec, params))
}
