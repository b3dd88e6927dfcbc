//! In-memory `MapBackend` that records every call.

use std::collections::BTreeMap;

use foundation::bounds::LatLonBounds;
use foundation::math::LatLon;

use crate::backend::{BackendError, MapBackend, MapOptions, MarkerHandle};
use crate::popup::PopupContent;

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub fail_init: bool,
    pub init_calls: usize,
    pub release_calls: usize,
    pub live: bool,
    pub options: Option<MapOptions>,
    pub view: Option<(LatLon, f64)>,
    pub markers: BTreeMap<MarkerHandle, (LatLon, PopupContent)>,
    pub added: usize,
    pub removed: usize,
    pub fits: Vec<LatLonBounds>,
    pub listening: bool,
    pub listening_changes: usize,
    pub haptic_pulses: Vec<u32>,
    next_handle: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn marker_positions(&self) -> Vec<LatLon> {
        self.markers.values().map(|(p, _)| *p).collect()
    }
}

impl MapBackend for RecordingBackend {
    fn init(&mut self, options: &MapOptions) -> Result<(), BackendError> {
        self.init_calls += 1;
        if self.fail_init {
            return Err(BackendError::new("no rendering context"));
        }
        self.live = true;
        self.options = Some(options.clone());
        self.view = Some((options.center, options.zoom));
        Ok(())
    }

    fn set_view(&mut self, center: LatLon, zoom: f64) {
        self.view = Some((center, zoom));
    }

    fn add_marker(&mut self, position: LatLon, popup: &PopupContent) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.markers.insert(handle, (position, popup.clone()));
        self.added += 1;
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            self.removed += 1;
        }
    }

    fn fit_bounds(&mut self, bounds: LatLonBounds) {
        self.fits.push(bounds);
    }

    fn set_input_listening(&mut self, listening: bool) {
        self.listening_changes += 1;
        self.listening = listening;
    }

    fn haptic_pulse(&mut self, duration_ms: u32) {
        self.haptic_pulses.push(duration_ms);
    }

    fn release(&mut self) {
        self.release_calls += 1;
        self.live = false;
        self.options = None;
    }
}
