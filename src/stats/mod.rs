pub mod histogram;
pub mod summary;

pub use histogram::Histogram;
pub use summary::{fit_normal, summarize, FitResult, SummaryReport};
