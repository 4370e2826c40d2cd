pub mod cli;
pub mod error;
pub mod parallel;
pub mod plot;
pub mod provider;
pub mod server;
pub mod sim;
pub mod stats;
