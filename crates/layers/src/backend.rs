//! Seam to the external map engine.
//!
//! Tile fetching, projection and drawing live behind `MapBackend`; this
//! workspace only decides *what* should be on the map. Implementations wrap a
//! concrete engine (a JS map library over wasm-bindgen, a native widget, or the
//! recording backend used in tests).

use foundation::bounds::LatLonBounds;
use foundation::math::LatLon;

use crate::popup::PopupContent;

/// Opaque id the backend hands out for each marker it creates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub u64);

/// Options for creating the one underlying map instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLon,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// The view may not be panned outside this box.
    pub max_bounds: LatLonBounds,
    /// When `false` the engine must not render horizontal world copies.
    pub world_wrap: bool,
}

#[derive(Debug)]
pub struct BackendError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Operations the map logic needs from a rendering engine.
///
/// All calls happen on the host's single UI thread. Marker and input events
/// flow the other way: the host forwards them to `MapSurface` methods.
pub trait MapBackend {
    /// Creates the underlying map instance.
    fn init(&mut self, options: &MapOptions) -> Result<(), BackendError>;

    fn set_view(&mut self, center: LatLon, zoom: f64);

    fn add_marker(&mut self, position: LatLon, popup: &PopupContent) -> MarkerHandle;

    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Frames the view around `bounds` (already padded by the caller).
    fn fit_bounds(&mut self, bounds: LatLonBounds);

    /// Starts or stops forwarding pointer/context events to the surface.
    fn set_input_listening(&mut self, listening: bool);

    /// Short vibration on long press. Engines without haptics ignore it.
    fn haptic_pulse(&mut self, _duration_ms: u32) {}

    /// Tears down the map instance. Must tolerate a failed or missing `init`.
    fn release(&mut self);
}
