pub mod pool;

pub use pool::{simulate_on_pool, WorkerPool};
