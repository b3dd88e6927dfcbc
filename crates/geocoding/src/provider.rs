use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use foundation::math::LatLon;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::error::GeocodeError;
use crate::format::ReverseResponse;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type Limiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// A place returned by forward search.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub position: LatLon,
}

/// Geocoding service the resolver talks to.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait ReverseGeocoder: Send + Sync {
    /// Structured address for a point. A service-side miss is
    /// `Err(GeocodeError::NoResult)`; any other error the service reports in
    /// its body is `Err(GeocodeError::Provider(_))`.
    fn reverse(&self, point: LatLon) -> BoxFuture<'_, Result<ReverseResponse, GeocodeError>>;

    /// Places matching free text, best first, at most `limit`.
    fn search(&self, query: &str, limit: usize) -> BoxFuture<'_, Result<Vec<Place>, GeocodeError>>;
}

/// Nominatim over HTTP (`/reverse` and `/search`, JSON format).
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
    limiter: Limiter,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    display_name: String,
    lat: String,
    lon: String,
}

impl NominatimClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let per_second = NonZeroU32::new(config.requests_per_second()).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    /// Shares an existing limiter, e.g. with another client for the same host.
    pub fn with_limiter(mut self, limiter: Limiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn limiter(&self) -> Limiter {
        self.limiter.clone()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GeocodeError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{path}", self.base_url);
        debug!("GET {url} {query:?}");
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&self, point: LatLon) -> BoxFuture<'_, Result<ReverseResponse, GeocodeError>> {
        let query = [
            ("format", "json".to_string()),
            ("lat", point.lat.to_string()),
            ("lon", point.lon.to_string()),
            ("addressdetails", "1".to_string()),
        ];
        Box::pin(async move {
            let body: ReverseResponse = self.get_json("reverse", &query).await?;
            reverse_outcome(body).inspect_err(|err| debug!("reverse geocode at {point:?}: {err}"))
        })
    }

    fn search(&self, query: &str, limit: usize) -> BoxFuture<'_, Result<Vec<Place>, GeocodeError>> {
        let params = [
            ("format", "json".to_string()),
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("addressdetails", "1".to_string()),
        ];
        Box::pin(async move {
            let hits: Vec<SearchHit> = self.get_json("search", &params).await?;
            Ok(places_from_hits(hits, limit))
        })
    }
}

const MISS_MESSAGE: &str = "Unable to geocode";

/// An `error`-only body is a miss when it is Nominatim's "nothing here"
/// message and a provider error otherwise.
fn reverse_outcome(body: ReverseResponse) -> Result<ReverseResponse, GeocodeError> {
    match body.error {
        Some(msg) if body.display_name.is_none() && body.address.is_none() => {
            if msg.trim().eq_ignore_ascii_case(MISS_MESSAGE) {
                Err(GeocodeError::NoResult)
            } else {
                Err(GeocodeError::Provider(msg))
            }
        }
        _ => Ok(body),
    }
}

/// Nominatim sends coordinates as strings; hits that do not parse are skipped.
fn places_from_hits(hits: Vec<SearchHit>, limit: usize) -> Vec<Place> {
    hits.into_iter()
        .filter_map(|hit| {
            let lat = hit.lat.trim().parse::<f64>().ok()?;
            let lon = hit.lon.trim().parse::<f64>().ok()?;
            let position = LatLon::new(lat, lon);
            position.is_valid().then_some(Place {
                display_name: hit.display_name,
                position,
            })
        })
        .take(limit)
        .collect()
}
