//! Process-wide table cache with single-flight fetch.
//!
//! Tables are write-once per key in the backing store, so cached entries
//! never go stale within a process lifetime. Concurrent lookups for the same
//! uncached key share one fetch: the map mutex guards only entry
//! lookup/insert, and the fetch itself runs inside the entry's `OnceLock`
//! initializer, which later callers block on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use log::debug;

use crate::provider::store::{checked_fetch, StoreError, TableStore};
use crate::provider::tables::GameSpec;

type Entry = Arc<OnceLock<Result<GameSpec, StoreError>>>;

pub struct TableCache {
    store: Arc<dyn TableStore>,
    entries: Mutex<HashMap<u32, Entry>>,
}

impl TableCache {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the table for `game_id`, fetching it at most once per process.
    /// Failed fetches are not cached; a later call retries the store.
    pub fn load(&self, game_id: u32) -> Result<GameSpec, StoreError> {
        let entry = {
            let mut entries = self.entries.lock().expect("table cache mutex");
            entries
                .entry(game_id)
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };

        let result = entry
            .get_or_init(|| {
                debug!("fetching table for game {game_id}");
                checked_fetch(self.store.as_ref(), game_id)
                    .map(|probs| GameSpec::new(game_id, probs))
            })
            .clone();

        if result.is_err() {
            let mut entries = self.entries.lock().expect("table cache mutex");
            // Drop the failed entry unless a retry already replaced it.
            if let Some(current) = entries.get(&game_id) {
                if Arc::ptr_eq(current, &entry) {
                    entries.remove(&game_id);
                }
            }
        }

        result
    }

    /// Number of resolved or in-flight entries. Test hook.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("table cache mutex").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        fetches: AtomicUsize,
        fail: bool,
    }

    impl TableStore for CountingStore {
        fn fetch(&self, game_id: u32) -> Result<Vec<f64>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Unavailable("down".to_string()))
            } else if game_id == 1 {
                Ok(vec![0.5, 1.0])
            } else {
                Err(StoreError::NotFound(game_id))
            }
        }
    }

    #[test]
    fn second_load_hits_the_cache() {
        let store = Arc::new(CountingStore {
            fetches: AtomicUsize::new(0),
            fail: false,
        });
        let cache = TableCache::new(store.clone());
        let a = cache.load(1).unwrap();
        let b = cache.load(1).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_loads_share_one_fetch() {
        let store = Arc::new(CountingStore {
            fetches: AtomicUsize::new(0),
            fail: false,
        });
        let cache = Arc::new(TableCache::new(store.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.load(1).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_fetch_is_retried() {
        let store = Arc::new(CountingStore {
            fetches: AtomicUsize::new(0),
            fail: true,
        });
        let cache = TableCache::new(store.clone());
        assert!(cache.load(1).is_err());
        assert!(cache.load(1).is_err());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn not_found_propagates() {
        let store = Arc::new(CountingStore {
            fetches: AtomicUsize::new(0),
            fail: false,
        });
        let cache = TableCache::new(store);
        assert_eq!(cache.load(42), Err(StoreError::NotFound(42)));
    }
}
