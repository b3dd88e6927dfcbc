//! Headless map engine: keeps marker state in memory and logs every call.

use std::collections::BTreeMap;

use foundation::bounds::LatLonBounds;
use foundation::math::LatLon;
use layers::backend::{BackendError, MapBackend, MapOptions, MarkerHandle};
use layers::popup::PopupContent;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct TraceBackend {
    live: bool,
    next_handle: u64,
    markers: BTreeMap<MarkerHandle, LatLon>,
    last_fit: Option<LatLonBounds>,
}

impl TraceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fit(&self) -> Option<LatLonBounds> {
        self.last_fit
    }
}

impl MapBackend for TraceBackend {
    fn init(&mut self, options: &MapOptions) -> Result<(), BackendError> {
        if options.min_zoom > options.max_zoom {
            return Err(BackendError::new("min zoom above max zoom"));
        }
        self.live = true;
        info!(
            "map init center={:?} zoom={} range={}..={}",
            options.center, options.zoom, options.min_zoom, options.max_zoom
        );
        Ok(())
    }

    fn set_view(&mut self, center: LatLon, zoom: f64) {
        debug!("view -> {center:?} z{zoom}");
    }

    fn add_marker(&mut self, position: LatLon, popup: &PopupContent) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.markers.insert(handle, position);
        debug!("marker {} at {position:?}: {}", handle.0, popup.title);
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            debug!("marker {} removed", handle.0);
        }
    }

    fn fit_bounds(&mut self, bounds: LatLonBounds) {
        debug!("fit {:?} .. {:?}", bounds.south_west, bounds.north_east);
        self.last_fit = Some(bounds);
    }

    fn set_input_listening(&mut self, listening: bool) {
        debug!("input listening: {listening}");
    }

    fn release(&mut self) {
        if self.live {
            info!("map released with {} markers left", self.markers.len());
        }
        self.live = false;
        self.markers.clear();
    }
}
