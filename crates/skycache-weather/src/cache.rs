//! Bounded per-key city cache with lazy and background refresh.
//!
//! A [`CityCache`] holds at most `capacity` cities, evicted strictly in
//! insertion order. Every lookup refreshes its city when the cached weather is
//! older than the freshness window. In [`RefreshMode::Polling`] the first
//! successful lookup also launches a background task that re-applies the same
//! freshness check to every cached city on a fixed interval.
//!
//! All state sits behind one async mutex held for the whole lookup or refresh
//! cycle, remote calls included.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use skycache_core::{CacheConfig, Config};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::WeatherError;
use crate::geocode::{GeoResolver, OpenWeatherGeocoder};
use crate::http;
use crate::provider::{OpenWeatherProvider, WeatherFetcher};
use crate::types::{Coordinates, RefreshMode, WeatherReport};

/// Result of the last successful fetch for a city.
#[derive(Debug, Clone)]
struct Observation {
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
    report: WeatherReport,
}

impl Observation {
    fn now(report: WeatherReport) -> Self {
        Self {
            fetched_at: Instant::now(),
            fetched_at_utc: Utc::now(),
            report,
        }
    }
}

#[derive(Debug)]
struct CityEntry {
    coordinates: Coordinates,
    /// `None` until the first fetch succeeds; such an entry is always stale.
    observation: Option<Observation>,
}

impl CityEntry {
    fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            observation: None,
        }
    }

    /// The cached report, if it is younger than `settings.freshness_window()`.
    fn fresh_report(&self, settings: &CacheConfig) -> Option<&WeatherReport> {
        self.observation
            .as_ref()
            .filter(|obs| obs.fetched_at.elapsed() < settings.freshness_window())
            .map(|obs| &obs.report)
    }
}

/// Entries plus their insertion order. Both always hold the same names.
#[derive(Debug)]
struct CacheState {
    entries: HashMap<String, CityEntry>,
    order: VecDeque<String>,
    capacity: usize,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert a city not yet present, dropping the oldest one if full.
    fn admit(&mut self, name: &str, coordinates: Coordinates) -> &mut CityEntry {
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::info!("Evicted {} to make room for {}", oldest, name);
            }
        }

        self.order.push_back(name.to_string());
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| CityEntry::new(coordinates))
    }
}

/// Point-in-time view of one cached city.
#[derive(Debug, Clone, PartialEq)]
pub struct CitySnapshot {
    pub name: String,
    pub coordinates: Coordinates,
    /// Wall-clock time of the last successful fetch
    pub last_update: Option<DateTime<Utc>>,
    pub report: Option<WeatherReport>,
}

struct CacheInner {
    api_key: String,
    mode: RefreshMode,
    settings: CacheConfig,
    geo: Arc<dyn GeoResolver>,
    fetcher: Arc<dyn WeatherFetcher>,
    state: Mutex<CacheState>,
    active: AtomicBool,
    polling_started: AtomicBool,
    shutdown: CancellationToken,
}

impl CacheInner {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> Result<(), WeatherError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(WeatherError::StaleHandle)
        }
    }

    fn deactivate(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            tracing::info!("City cache deactivated");
        }
        self.shutdown.cancel();
    }

    /// Return the entry's report, fetching a new one first if it is stale.
    ///
    /// A failed fetch leaves the entry exactly as it was.
    async fn refresh_entry(
        &self,
        name: &str,
        entry: &mut CityEntry,
    ) -> Result<WeatherReport, WeatherError> {
        if let Some(report) = entry.fresh_report(&self.settings) {
            tracing::debug!("{} is fresh, serving cached weather", name);
            return Ok(report.clone());
        }

        let report = self.fetcher.fetch(entry.coordinates).await?;
        tracing::debug!("Fetched weather for {}", name);
        entry.observation = Some(Observation::now(report.clone()));
        Ok(report)
    }

    /// One background cycle: apply the freshness check to every cached city.
    async fn refresh_all(&self) -> Result<(), WeatherError> {
        let mut state = self.state.lock().await;
        let names: Vec<String> = state.order.iter().cloned().collect();

        for name in names {
            if !self.is_active() {
                break;
            }
            if let Some(entry) = state.entries.get_mut(&name) {
                self.refresh_entry(&name, entry).await?;
            }
        }
        Ok(())
    }

    async fn run_refresher(self: Arc<Self>) {
        tracing::info!(
            "Background refresh started (every {:?})",
            self.settings.poll_interval()
        );

        while self.is_active() {
            if let Err(e) = self.refresh_all().await {
                let failure = WeatherError::BackgroundTaskFailure(Box::new(e));
                tracing::error!("{}; deactivating cache", failure);
                self.deactivate();
                break;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval()) => {}
            }
        }

        tracing::info!("Background refresh stopped");
    }
}

/// Handle to a bounded, thread-safe weather cache for one API key.
///
/// Cloning the handle shares the same cache.
#[derive(Clone)]
pub struct CityCache {
    inner: Arc<CacheInner>,
}

impl CityCache {
    /// Create an active cache around the given boundary collaborators.
    pub fn new(
        api_key: impl Into<String>,
        mode: RefreshMode,
        settings: CacheConfig,
        geo: Arc<dyn GeoResolver>,
        fetcher: Arc<dyn WeatherFetcher>,
    ) -> Self {
        let state = CacheState::new(settings.capacity);
        Self {
            inner: Arc::new(CacheInner {
                api_key: api_key.into(),
                mode,
                settings,
                geo,
                fetcher,
                state: Mutex::new(state),
                active: AtomicBool::new(true),
                polling_started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Create a cache backed by the OpenWeather geocoding and weather endpoints.
    pub fn open_weather(
        api_key: &str,
        mode: RefreshMode,
        config: &Config,
    ) -> Result<Self, WeatherError> {
        let client = http::build_client(&config.openweather)
            .map_err(WeatherError::ClientSetup)?;
        let client = Arc::new(client);

        let geo = OpenWeatherGeocoder::new(Arc::clone(&client), &config.openweather, api_key);
        let fetcher = OpenWeatherProvider::new(client, &config.openweather, api_key);

        Ok(Self::new(
            api_key,
            mode,
            config.cache.clone(),
            Arc::new(geo),
            Arc::new(fetcher),
        ))
    }

    /// Current weather for `city`, served from cache while fresh.
    ///
    /// Admits the city (resolving its coordinates) if it is not cached yet,
    /// refetches its weather if stale, and in polling mode makes sure the
    /// background refresher is running.
    #[instrument(skip(self), level = "debug")]
    pub async fn lookup(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        self.inner.ensure_active()?;
        if city.is_empty() {
            return Err(WeatherError::invalid("city name must not be empty"));
        }

        let report = {
            let mut state = self.inner.state.lock().await;
            // Deactivation may have happened while we waited for the lock.
            self.inner.ensure_active()?;

            match state.entries.get_mut(city) {
                Some(entry) => self.inner.refresh_entry(city, entry).await?,
                None => {
                    let coordinates = self.inner.geo.resolve(city).await?;
                    tracing::info!("Caching {} at {}", city, coordinates);
                    let entry = state.admit(city, coordinates);
                    self.inner.refresh_entry(city, entry).await?
                }
            }
        };

        self.start_polling();
        Ok(report)
    }

    /// Launch the background refresher, at most once per cache.
    fn start_polling(&self) {
        if self.inner.mode != RefreshMode::Polling {
            return;
        }
        if self
            .inner
            .polling_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run_refresher());
    }

    /// Permanently retire this cache. Later lookups fail with `StaleHandle`
    /// and the background refresher, if any, stops.
    pub fn deactivate(&self) {
        self.inner.deactivate();
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Whether the background refresher has been launched.
    ///
    /// Never resets: it stays `true` after the refresher stops, so check
    /// [`is_active`](Self::is_active) to tell whether it is still running.
    pub fn is_polling(&self) -> bool {
        self.inner.polling_started.load(Ordering::Acquire)
    }

    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    pub fn mode(&self) -> RefreshMode {
        self.inner.mode
    }

    /// Whether both handles point at the same cache.
    pub fn same_cache(&self, other: &CityCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached cities, oldest first.
    pub async fn snapshot(&self) -> Vec<CitySnapshot> {
        let state = self.inner.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|name| {
                state.entries.get(name).map(|entry| CitySnapshot {
                    name: name.clone(),
                    coordinates: entry.coordinates,
                    last_update: entry.observation.as_ref().map(|obs| obs.fetched_at_utc),
                    report: entry.observation.as_ref().map(|obs| obs.report.clone()),
                })
            })
            .collect()
    }
}

impl fmt::Debug for CityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CityCache")
            .field("mode", &self.inner.mode)
            .field("active", &self.is_active())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}
