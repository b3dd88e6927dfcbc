use foundation::bounds::LatLonBounds;
use foundation::math::LatLon;
use layers::backend::MapOptions;
use layers::markers::FitPolicy;
use serde::Deserialize;

use crate::gesture::GestureConfig;

/// Everything `MapSurface` needs to set up the map and interpret input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub center: LatLon,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Panning stops at this box.
    pub max_bounds: LatLonBounds,
    pub world_wrap: bool,
    pub long_press_ms: u64,
    /// Pointer travel, in meters on the ground, that turns a press into a drag.
    pub move_tolerance_m: f64,
    pub fit_padding: f64,
    /// Keep the configured framing instead of fitting to markers.
    pub pin_view: bool,
    /// Vibration on long press; 0 disables it.
    pub haptic_ms: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            center: LatLon::new(37.7749, -122.4194),
            zoom: 12.0,
            min_zoom: 2.0,
            max_zoom: 19.0,
            max_bounds: LatLonBounds::world(),
            world_wrap: false,
            long_press_ms: 500,
            move_tolerance_m: 20.0,
            fit_padding: 0.1,
            pin_view: false,
            haptic_ms: 50,
        }
    }
}

impl SurfaceConfig {
    /// Zoom limits in ascending order, whatever order they were configured in.
    pub fn zoom_range(&self) -> (f64, f64) {
        (
            self.min_zoom.min(self.max_zoom),
            self.min_zoom.max(self.max_zoom),
        )
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let (lo, hi) = self.zoom_range();
        if zoom.is_finite() { zoom.clamp(lo, hi) } else { lo }
    }

    pub fn clamp_center(&self, center: LatLon) -> LatLon {
        if center.is_finite() {
            self.max_bounds.clamp(center)
        } else {
            self.max_bounds.center()
        }
    }

    pub fn map_options(&self) -> MapOptions {
        let (min_zoom, max_zoom) = self.zoom_range();
        MapOptions {
            center: self.clamp_center(self.center),
            zoom: self.clamp_zoom(self.zoom),
            min_zoom,
            max_zoom,
            max_bounds: self.max_bounds,
            world_wrap: self.world_wrap,
        }
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            long_press_ms: self.long_press_ms,
            move_tolerance_m: self.move_tolerance_m,
            haptic_ms: self.haptic_ms,
        }
    }

    pub fn fit_policy(&self) -> FitPolicy {
        FitPolicy {
            pinned: self.pin_view,
            padding: self.fit_padding,
        }
    }
}
