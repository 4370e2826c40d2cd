pub mod engine;
pub mod rng;

pub use engine::{simulate, SimulateParams};
pub use rng::Rng;
