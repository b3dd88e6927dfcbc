use thiserror::Error;

/// Failures talking to the geocoding provider.
///
/// `AddressResolver::resolve` absorbs all of these into the coordinate
/// fallback; only place search hands them to the caller.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoding service answered with status {0}")]
    Status(u16),

    #[error("failed to decode geocoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no result for this location")]
    NoResult,

    #[error("provider error: {0}")]
    Provider(String),
}

/// Caller-side misuse of `AddressResolver::resolve`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("coordinates must be finite numbers")]
    InvalidCoordinate,
}
