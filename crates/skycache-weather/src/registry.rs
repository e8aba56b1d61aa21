//! Maps API keys to their live [`CityCache`].
//!
//! Requesting a key whose cache was deactivated transparently creates a new
//! one. Deactivated caches are dropped from the map whenever it is touched.
//! Removing a cache unregisters and deactivates it.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;
use skycache_core::Config;

use crate::cache::CityCache;
use crate::error::WeatherError;
use crate::types::RefreshMode;

/// Builds the cache for a newly registered key.
pub type CacheFactory =
    Box<dyn Fn(&str, RefreshMode) -> Result<CityCache, WeatherError> + Send + Sync>;

pub struct CacheRegistry {
    caches: Mutex<HashMap<String, CityCache>>,
    default_mode: RefreshMode,
    factory: CacheFactory,
}

impl CacheRegistry {
    /// Registry whose caches talk to OpenWeather as configured.
    pub fn new(config: Config) -> Self {
        let default_mode = config.cache.default_mode;
        Self::with_factory(default_mode, move |api_key, mode| {
            CityCache::open_weather(api_key, mode, &config)
        })
    }

    /// Registry with a custom cache factory.
    pub fn with_factory<F>(default_mode: RefreshMode, factory: F) -> Self
    where
        F: Fn(&str, RefreshMode) -> Result<CityCache, WeatherError> + Send + Sync + 'static,
    {
        Self {
            caches: Mutex::new(HashMap::new()),
            default_mode,
            factory: Box::new(factory),
        }
    }

    /// The live cache for `api_key`, created in the default mode if needed.
    pub fn get(&self, api_key: &str) -> Result<CityCache, WeatherError> {
        self.get_with_mode(api_key, self.default_mode)
    }

    /// The live cache for `api_key`.
    ///
    /// `mode` only applies when a new cache has to be created; a live cache is
    /// returned as it is.
    pub fn get_with_mode(&self, api_key: &str, mode: RefreshMode) -> Result<CityCache, WeatherError> {
        if api_key.is_empty() {
            return Err(WeatherError::invalid("API key must not be empty"));
        }

        let mut caches = self.caches.lock();
        prune(&mut caches);
        if let Some(cache) = caches.get(api_key) {
            return Ok(cache.clone());
        }

        let cache = (self.factory)(api_key, mode)?;
        tracing::info!("Created {:?} weather cache", mode);
        caches.insert(api_key.to_string(), cache.clone());
        Ok(cache)
    }

    /// Unregister `cache` and deactivate it.
    ///
    /// Returns `false` and leaves everything alone unless `cache` is the one
    /// registered under its key. A retired handle never touches the cache
    /// that replaced it.
    pub fn remove(&self, cache: &CityCache) -> bool {
        let mut caches = self.caches.lock();
        let registered = caches
            .get(cache.api_key())
            .is_some_and(|registered| registered.same_cache(cache));
        if !registered {
            return false;
        }

        caches.remove(cache.api_key());
        drop(caches);
        cache.deactivate();
        tracing::info!("Removed weather cache");
        true
    }

    /// Number of live registered caches.
    pub fn len(&self) -> usize {
        let mut caches = self.caches.lock();
        prune(&mut caches);
        caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop caches that were deactivated, along with their cached cities.
fn prune(caches: &mut HashMap<String, CityCache>) {
    caches.retain(|_, cache| cache.is_active());
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.len())
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

/// Process-wide registry
static GLOBAL: OnceLock<CacheRegistry> = OnceLock::new();

/// The process-wide registry, built from the default config on first use.
pub fn global() -> &'static CacheRegistry {
    GLOBAL.get_or_init(|| CacheRegistry::new(Config::default()))
}

/// Install `registry` as the process-wide one.
///
/// Fails, handing the registry back, if one is already in place.
pub fn install_global(registry: CacheRegistry) -> Result<(), CacheRegistry> {
    GLOBAL.set(registry)
}
