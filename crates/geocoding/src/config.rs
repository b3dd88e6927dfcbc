use std::env;
use std::str::FromStr;

use foundation::bounds::LatLonBounds;
use foundation::math::LatLon;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("incident-map/", env!("CARGO_PKG_VERSION"));

/// Region whose name is appended to addresses that fall inside it.
///
/// Used when the map targets one country and short addresses would otherwise
/// be ambiguous ("Main St, Springfield").
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionHint {
    pub name: String,
    pub bounds: LatLonBounds,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Nominatim rejects requests without an identifying user agent.
    pub user_agent: String,
    pub requests_per_second: u32,
    pub timeout_ms: u64,
    /// Cache key precision; clamped to 4..=6 decimals.
    pub key_decimals: u32,
    /// Decimals in the `lat, lon` fallback string, never more than the key's.
    pub fallback_decimals: usize,
    pub region: Option<RegionHint>,
    /// Recency cap on cache entries. `None` keeps everything for the session.
    pub max_entries: Option<usize>,
    pub search_limit: usize,
    pub min_query_len: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            requests_per_second: 1,
            timeout_ms: 10_000,
            key_decimals: 5,
            fallback_decimals: 6,
            region: None,
            max_entries: None,
            search_limit: 5,
            min_query_len: 3,
        }
    }
}

impl GeocoderConfig {
    /// Reads `GEOCODER_*` environment variables. Unset or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let region = match (
            lookup("GEOCODER_REGION_NAME"),
            lookup("GEOCODER_REGION_BBOX").and_then(|v| parse_bbox(&v)),
        ) {
            (Some(name), Some(bounds)) if !name.trim().is_empty() => Some(RegionHint {
                name: name.trim().to_string(),
                bounds,
            }),
            _ => None,
        };

        Self {
            base_url: lookup("GEOCODER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            user_agent: lookup("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            requests_per_second: parse_or(
                &lookup,
                "GEOCODER_RATE_PER_SEC",
                defaults.requests_per_second,
            ),
            timeout_ms: parse_or(&lookup, "GEOCODER_TIMEOUT_MS", defaults.timeout_ms),
            key_decimals: parse_or(&lookup, "GEOCODER_KEY_DECIMALS", defaults.key_decimals),
            fallback_decimals: parse_or(
                &lookup,
                "GEOCODER_FALLBACK_DECIMALS",
                defaults.fallback_decimals,
            ),
            region,
            max_entries: lookup("GEOCODER_MAX_ENTRIES").and_then(|v| v.parse().ok()),
            search_limit: parse_or(&lookup, "GEOCODER_SEARCH_LIMIT", defaults.search_limit),
            min_query_len: parse_or(&lookup, "GEOCODER_MIN_QUERY_LEN", defaults.min_query_len),
        }
    }

    pub fn key_decimals(&self) -> u32 {
        self.key_decimals.clamp(4, 6)
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second.max(1)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// `south,west,north,east` in degrees.
fn parse_bbox(raw: &str) -> Option<LatLonBounds> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let [south, west, north, east] = parts[..] else {
        return None;
    };
    let sw = LatLon::new(south, west);
    let ne = LatLon::new(north, east);
    if !sw.is_valid() || !ne.is_valid() {
        return None;
    }
    Some(LatLonBounds::new(sw, ne))
}
