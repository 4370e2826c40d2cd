pub mod cache;
pub mod store;
pub mod tables;

pub use cache::TableCache;
pub use store::{StoreError, TableStore};
pub use tables::GameSpec;
