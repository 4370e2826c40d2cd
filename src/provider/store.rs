//! Backing stores for probability tables.
//!
//! The server normally serves the built-in catalog; a deployment can point
//! `DRAWLAB_TABLES` at a JSON file (`{"<game_id>": [p1, p2, ...]}`) written
//! by the `generate_tables` bin or by an external precompute pipeline.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::provider::tables::{builtin_curve, validate_table};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound(u32),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(game_id) => write!(f, "no table for game id {game_id}"),
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read-only key lookup for per-game tables. A fetch either yields the
/// ordered probability sequence, reports the key missing, or reports the
/// store unreachable.
pub trait TableStore: Send + Sync {
    fn fetch(&self, game_id: u32) -> Result<Vec<f64>, StoreError>;
}

/// Tables computed on demand from the built-in pity curves.
#[derive(Debug, Default)]
pub struct BuiltinCatalog;

impl TableStore for BuiltinCatalog {
    fn fetch(&self, game_id: u32) -> Result<Vec<f64>, StoreError> {
        let curve = builtin_curve(game_id).ok_or(StoreError::NotFound(game_id))?;
        Ok(curve.success_table())
    }
}

/// File-backed store. The file is re-read per fetch; the cache in front of
/// the store means each game id is fetched at most once per process.
#[derive(Debug)]
pub struct JsonTableStore {
    path: PathBuf,
}

impl JsonTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableStore for JsonTableStore {
    fn fetch(&self, game_id: u32) -> Result<Vec<f64>, StoreError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", self.path.display())))?;
        let mut tables: HashMap<String, Vec<f64>> = serde_json::from_str(&raw)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", self.path.display())))?;
        tables
            .remove(&game_id.to_string())
            .ok_or(StoreError::NotFound(game_id))
    }
}

/// Fixed in-memory store for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<u32, Vec<f64>>,
}

impl InMemoryStore {
    pub fn new(tables: HashMap<u32, Vec<f64>>) -> Self {
        Self { tables }
    }

    pub fn insert(&mut self, game_id: u32, probs: Vec<f64>) {
        self.tables.insert(game_id, probs);
    }
}

impl TableStore for InMemoryStore {
    fn fetch(&self, game_id: u32) -> Result<Vec<f64>, StoreError> {
        self.tables
            .get(&game_id)
            .cloned()
            .ok_or(StoreError::NotFound(game_id))
    }
}

/// Validate a fetched table before it is admitted to the cache.
pub fn checked_fetch(store: &dyn TableStore, game_id: u32) -> Result<Vec<f64>, StoreError> {
    let probs = store.fetch(game_id)?;
    validate_table(&probs)
        .map_err(|reason| StoreError::Unavailable(format!("game {game_id}: {reason}")))?;
    Ok(probs)
}
