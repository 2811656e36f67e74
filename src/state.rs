use std::time::Duration;

use crate::config::CONFIG;
use crate::utils::cache::ResponseCache;

/// Shared router state. The service is stateless across requests except for
/// the generation cache, which lives here rather than in a global so tests
/// can build isolated instances.
pub struct AppState {
    pub generation_cache: ResponseCache,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            generation_cache: ResponseCache::new(Duration::from_secs(CONFIG.cache_ttl_seconds)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
