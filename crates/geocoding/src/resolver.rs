use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use foundation::math::LatLon;
use futures_util::future::{join_all, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::{CoordKey, GeocodeCache, Slot};
use crate::config::GeocoderConfig;
use crate::error::{GeocodeError, ResolutionError};
use crate::format::{coordinate_fallback, with_region};
use crate::provider::{BoxFuture, NominatimClient, Place, ReverseGeocoder};
use crate::request::RequestId;

/// One provider round trip, awaited by every caller that asked for its key.
/// `None` means the provider had no usable answer.
type SharedLookup = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    joined: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time resolver counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStats {
    /// Reverse lookups sent to the provider.
    pub requests: u64,
    pub cache_hits: u64,
    /// Calls that attached to a request already in flight.
    pub joined: u64,
    /// Lookups that ended in the coordinate fallback.
    pub failures: u64,
    pub entries: usize,
}

struct Inner {
    config: GeocoderConfig,
    provider: Arc<dyn ReverseGeocoder>,
    cache: Arc<Mutex<GeocodeCache<SharedLookup>>>,
    counters: Arc<Counters>,
}

/// Coordinates to display addresses, cached per quantized coordinate.
///
/// Cloning is cheap and every clone shares the same cache, so one resolver
/// built at startup can be handed to each popup and form that needs it.
/// Concurrent `resolve` calls for the same key share one provider request and
/// all settle with its result.
#[derive(Clone)]
pub struct AddressResolver {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AddressResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolver")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl AddressResolver {
    pub fn new(config: GeocoderConfig, provider: Arc<dyn ReverseGeocoder>) -> Self {
        let cache = GeocodeCache::new(config.max_entries);
        Self {
            inner: Arc::new(Inner {
                config,
                provider,
                cache: Arc::new(Mutex::new(cache)),
                counters: Arc::default(),
            }),
        }
    }

    /// Resolver backed by the Nominatim HTTP API.
    pub fn nominatim(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = NominatimClient::new(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.inner.config
    }

    fn key(&self, point: LatLon) -> CoordKey {
        CoordKey::quantize(point, self.inner.config.key_decimals())
    }

    /// Display address for `(lat, lon)`.
    ///
    /// Provider failures never surface here: the caller gets the coordinates
    /// of the key as `lat, lon` instead, and the next call for the key tries
    /// again. Only non-finite input is an error.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<String, ResolutionError> {
        let address = self.lookup(lat, lon).await?;
        Ok(address.unwrap_or_else(|| self.coordinates(LatLon::new(lat, lon))))
    }

    /// Like `resolve`, but reports a failed lookup as `Ok(None)` instead of
    /// substituting the coordinates.
    pub async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<String>, ResolutionError> {
        let point = LatLon::new(lat, lon);
        if !point.is_finite() {
            return Err(ResolutionError::InvalidCoordinate);
        }
        let key = self.key(point);

        let lookup = {
            let mut cache = self.inner.cache.lock();
            match cache.lookup(&key) {
                Slot::Resolved(address) => {
                    self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    trace!("geocode cache hit for {key}");
                    return Ok(Some(address));
                }
                Slot::Pending(lookup) => {
                    self.inner.counters.joined.fetch_add(1, Ordering::Relaxed);
                    debug!("joining in-flight geocode request for {key}");
                    lookup
                }
                Slot::Vacant => match cache.begin(key, |req| self.request(key, point, req)) {
                    Some(lookup) => lookup,
                    // Vacant under the same lock, so `begin` cannot refuse.
                    None => return Ok(None),
                },
            }
        };

        Ok(lookup.await)
    }

    /// Builds the shared request future for `key`. It holds only a weak
    /// reference to the cache, which in turn stores the future.
    fn request(&self, key: CoordKey, point: LatLon, req: RequestId) -> SharedLookup {
        let provider = self.inner.provider.clone();
        let cache: Weak<Mutex<GeocodeCache<SharedLookup>>> = Arc::downgrade(&self.inner.cache);
        let counters = self.inner.counters.clone();
        let region = self.inner.config.region.clone();

        let fut: BoxFuture<'static, Option<String>> = Box::pin(async move {
            counters.requests.fetch_add(1, Ordering::Relaxed);
            debug!("reverse geocoding {key} ({req:?})");

            let outcome = match provider.reverse(point).await {
                Ok(response) => response
                    .short_address()
                    .map(|address| with_region(address, point, region.as_ref())),
                Err(err) => {
                    warn!("reverse geocoding {key} failed: {err}");
                    None
                }
            };
            if outcome.is_none() {
                counters.failures.fetch_add(1, Ordering::Relaxed);
            }

            if let Some(cache) = cache.upgrade() {
                cache.lock().complete(&key, req, outcome.clone());
            }
            outcome
        });
        fut.shared()
    }

    /// `lat, lon` text for the key `point` falls on, never finer than the key,
    /// so every point sharing a key gets the same string.
    pub fn coordinates(&self, point: LatLon) -> String {
        let key = self.key(point);
        let decimals = self.inner.config.fallback_decimals.min(key.decimals() as usize);
        coordinate_fallback(key.point(), decimals)
    }

    /// Resolved address if one is cached, without touching the network.
    pub fn cached(&self, lat: f64, lon: f64) -> Option<String> {
        let point = LatLon::new(lat, lon);
        if !point.is_finite() {
            return None;
        }
        let key = self.key(point);
        self.inner.cache.lock().value(&key).map(str::to_string)
    }

    /// Resolves every point concurrently. Duplicate keys cost one request.
    /// Results are in input order.
    pub async fn resolve_many(
        &self,
        points: impl IntoIterator<Item = LatLon>,
    ) -> Vec<Result<String, ResolutionError>> {
        join_all(points.into_iter().map(|p| self.resolve(p.lat, p.lon))).await
    }

    /// Forward place search. Queries shorter than `min_query_len` characters
    /// return no places without asking the provider.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let query = query.trim();
        if query.chars().count() < self.inner.config.min_query_len {
            return Ok(Vec::new());
        }
        self.inner
            .provider
            .search(query, self.inner.config.search_limit)
            .await
    }

    pub fn stats(&self) -> ResolverStats {
        let c = &self.inner.counters;
        ResolverStats {
            requests: c.requests.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            joined: c.joined.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            entries: self.inner.cache.lock().len(),
        }
    }

    /// Forgets every entry. Requests still in flight finish for their callers
    /// but no longer write to the cache.
    pub fn clear_cache(&self) {
        self.inner.cache.lock().clear();
    }
}
