//! In-memory caching using moka
//!
//! Presets are read far more often than they are saved, so both the preset
//! list and individual presets are cached and invalidated on every write.

use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::pricing::requests::FormValues;

const PRESET_LIST_KEY: &str = "presets:all";

/// Application cache holding presets
#[derive(Clone)]
pub struct AppCache {
    /// Presets (name -> form values)
    pub presets: Cache<String, Arc<FormValues>>,
    /// Preset names, sorted (single entry)
    pub preset_names: Cache<String, Arc<Vec<String>>>,
    /// Bumped on every preset write
    preset_generation: Arc<AtomicU64>,
}

impl AppCache {
    /// Create a new cache instance with configured TTLs
    pub fn new() -> Self {
        Self {
            // Presets: 200 entries, 30 min TTL, 10 min idle
            presets: Cache::builder()
                .max_capacity(200)
                .time_to_live(Duration::from_secs(30 * 60))
                .time_to_idle(Duration::from_secs(10 * 60))
                .build(),

            // Preset listing: 1 entry, 15 min TTL
            preset_names: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(15 * 60))
                .build(),

            preset_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            presets_size: self.presets.entry_count(),
            preset_names_cached: self.preset_names.entry_count() > 0,
        }
    }

    /// Invalidate a preset and the listing that may include it
    pub async fn invalidate_preset(&self, name: &str) {
        self.preset_generation.fetch_add(1, Ordering::SeqCst);
        self.presets.invalidate(name).await;
        self.preset_names.invalidate(PRESET_LIST_KEY).await;
        info!("Cache invalidated for preset: {}", name);
    }

    pub async fn cached_preset_names(&self) -> Option<Arc<Vec<String>>> {
        self.preset_names.get(PRESET_LIST_KEY).await
    }

    /// Current preset write generation, read before querying the listing
    pub fn preset_generation(&self) -> u64 {
        self.preset_generation.load(Ordering::SeqCst)
    }

    /// Cache a listing read at `generation`.
    ///
    /// The listing is dropped again if a preset was written since, so a
    /// list read before a concurrent save never outlives that save.
    pub async fn store_preset_names(&self, names: Vec<String>, generation: u64) -> bool {
        self.preset_names
            .insert(PRESET_LIST_KEY.to_string(), Arc::new(names))
            .await;

        if self.preset_generation() != generation {
            self.preset_names.invalidate(PRESET_LIST_KEY).await;
            debug!("Preset listing changed while loading, not cached");
            return false;
        }
        true
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub presets_size: u64,
    pub preset_names_cached: bool,
}
