use std::rc::Rc;

use foundation::ids::EventId;
use foundation::math::LatLon;
use foundation::time::TimeMs;
use geocoding::AddressResolver;
use layers::backend::{MapBackend, MarkerHandle};
use layers::event::Event;
use layers::markers::{MarkerSyncEngine, ReconcileSummary, SelectCallback};
use layers::popup::PopupContent;
use runtime::metrics::{Metrics, MetricsSnapshot};
use tracing::{debug, info, warn};

use crate::config::SurfaceConfig;
use crate::error::SurfaceError;
use crate::gesture::{Gesture, GestureRecognizer, InputResponse};

/// Receives map coordinates when a long press (or right-click) completes.
pub type LongPressCallback = Rc<dyn Fn(LatLon)>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed; the backend has not been asked for a map yet.
    Pending,
    Live,
    /// `create` failed. The backend may hold partial state until `destroy`.
    Failed,
    Destroyed,
}

/// One map instance plus everything drawn on it and every input read from it.
///
/// Single-threaded: all calls come from the host's UI thread, and callbacks
/// run synchronously inside the call that triggered them.
pub struct MapSurface<B: MapBackend> {
    backend: B,
    config: SurfaceConfig,
    lifecycle: Lifecycle,
    view: (LatLon, f64),
    markers: MarkerSyncEngine,
    gestures: GestureRecognizer,
    on_long_press: Option<LongPressCallback>,
    /// Latest event list, replayed when the map is (re)created.
    events: Vec<Event>,
    metrics: Metrics,
}

impl<B: MapBackend> MapSurface<B> {
    pub fn new(backend: B, config: SurfaceConfig, on_select: SelectCallback) -> Self {
        let markers = MarkerSyncEngine::new(on_select).with_fit_policy(config.fit_policy());
        let gestures = GestureRecognizer::new(config.gesture_config());
        let view = (config.clamp_center(config.center), config.clamp_zoom(config.zoom));
        Self {
            backend,
            config,
            lifecycle: Lifecycle::Pending,
            view,
            markers,
            gestures,
            on_long_press: None,
            events: Vec::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Live
    }

    /// Creates the underlying map. Calling it on a live surface does nothing.
    /// After a failed attempt the partial map is released before retrying.
    ///
    /// Events passed to `update_events` before creation are drawn as soon as
    /// the map exists.
    pub fn create(&mut self) -> Result<(), SurfaceError> {
        if self.is_live() {
            debug!("map surface already created");
            return Ok(());
        }
        if self.lifecycle == Lifecycle::Failed {
            self.backend.release();
            debug!("released partially initialized map before retrying");
        }

        let mut options = self.config.map_options();
        (options.center, options.zoom) = self.view;
        if let Err(err) = self.backend.init(&options) {
            warn!("map backend failed to initialize: {err}");
            self.lifecycle = Lifecycle::Failed;
            return Err(SurfaceError::BackendUnavailable(err));
        }

        self.lifecycle = Lifecycle::Live;
        info!(
            "map created at {:?} zoom {} ({} events)",
            options.center,
            options.zoom,
            self.events.len()
        );
        if self.gestures.long_press_enabled() {
            self.backend.set_input_listening(true);
        }
        if !self.events.is_empty() {
            let events = std::mem::take(&mut self.events);
            self.reconcile(&events);
            self.events = events;
        }
        Ok(())
    }

    /// Makes the markers match `events`. Safe with any length, including
    /// empty. Before `create` the list is only remembered.
    pub fn update_events(&mut self, events: &[Event]) -> ReconcileSummary {
        self.events = events.to_vec();
        if !self.is_live() {
            debug!("map not live; holding {} events", events.len());
            return ReconcileSummary::default();
        }
        self.reconcile(events)
    }

    fn reconcile(&mut self, events: &[Event]) -> ReconcileSummary {
        let summary = self.markers.reconcile(&mut self.backend, events);
        self.metrics.inc_counter("reconciles", 1);
        self.metrics.inc_counter("markers_added", summary.added.len() as u64);
        self.metrics.inc_counter("markers_removed", summary.removed.len() as u64);
        self.metrics.inc_counter("events_skipped", summary.skipped.len() as u64);
        self.metrics.set_gauge("markers_live", self.markers.len() as i64);
        summary
    }

    /// Moves the view without touching the map instance or its markers.
    /// Center and zoom are clamped to the configured limits.
    pub fn set_view(&mut self, center: LatLon, zoom: f64) {
        let view = (self.config.clamp_center(center), self.config.clamp_zoom(zoom));
        if view != (center, zoom) {
            debug!("view {center:?} zoom {zoom} clamped to {:?} zoom {}", view.0, view.1);
        }
        self.view = view;
        if self.is_live() {
            self.backend.set_view(view.0, view.1);
        }
    }

    pub fn view(&self) -> (LatLon, f64) {
        self.view
    }

    /// Stops (or resumes) fitting the view to the markers after each update.
    pub fn pin_view(&mut self, pinned: bool) {
        self.markers.set_pinned(pinned);
    }

    /// Routes long presses to `callback`; `None` detaches it.
    ///
    /// Switching between two callbacks swaps the target without touching the
    /// map's input listeners.
    pub fn enable_long_press(&mut self, callback: Option<LongPressCallback>) {
        let enable = callback.is_some();
        self.on_long_press = callback;
        if self.gestures.long_press_enabled() == enable {
            return;
        }
        self.gestures.set_long_press_enabled(enable);
        if self.is_live() {
            self.backend.set_input_listening(enable);
        }
        debug!("long press {}", if enable { "enabled" } else { "disabled" });
    }

    pub fn long_press_enabled(&self) -> bool {
        self.gestures.long_press_enabled()
    }

    /// Forwarded by the backend when a marker (or its popup action) is
    /// clicked. Returns `false` for markers that are already gone.
    pub fn on_marker_click(&mut self, handle: MarkerHandle) -> bool {
        let hit = self.markers.click(handle);
        if hit {
            self.metrics.inc_counter("marker_clicks", 1);
        }
        hit
    }

    pub fn on_pointer_down(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        if !self.is_live() {
            return InputResponse::default();
        }
        let resp = self.gestures.on_pointer_down(position, now);
        self.dispatch(resp)
    }

    pub fn on_pointer_move(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        if !self.is_live() {
            return InputResponse::default();
        }
        let resp = self.gestures.on_pointer_move(position, now);
        self.dispatch(resp)
    }

    pub fn on_pointer_up(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        if !self.is_live() {
            return InputResponse::default();
        }
        let resp = self.gestures.on_pointer_up(position, now);
        self.dispatch(resp)
    }

    pub fn on_pointer_cancel(&mut self) {
        self.gestures.on_pointer_cancel();
    }

    pub fn on_context_request(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        if !self.is_live() {
            return InputResponse::default();
        }
        let resp = self.gestures.on_context_request(position, now);
        self.dispatch(resp)
    }

    /// Lets a pending long-press timer fire. Hosts call this at
    /// `next_deadline()`.
    pub fn tick(&mut self, now: TimeMs) -> InputResponse {
        let resp = self.gestures.tick(now);
        self.dispatch(resp)
    }

    pub fn next_deadline(&self) -> Option<TimeMs> {
        self.gestures.next_deadline()
    }

    fn dispatch(&mut self, resp: InputResponse) -> InputResponse {
        match resp.gesture {
            Some(Gesture::LongPress(position)) => {
                self.metrics.inc_counter("long_presses", 1);
                if let Some(ms) = resp.haptic_ms {
                    self.backend.haptic_pulse(ms);
                }
                if let Some(callback) = self.on_long_press.clone() {
                    callback(position);
                }
            }
            Some(Gesture::Click(_)) => self.metrics.inc_counter("map_clicks", 1),
            Some(Gesture::Drag) => self.metrics.inc_counter("drags", 1),
            None => {}
        }
        resp
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_ids(&self) -> Vec<EventId> {
        self.markers.ids().collect()
    }

    pub fn marker_handle(&self, id: EventId) -> Option<MarkerHandle> {
        self.markers.marker(id).map(|m| m.handle())
    }

    /// Popup for a live marker, with the address line filled in only if it is
    /// already cached.
    pub fn popup_content(&self, id: EventId, resolver: &AddressResolver) -> Option<PopupContent> {
        let marker = self.markers.marker(id)?;
        let content = PopupContent::for_event(marker.event());
        let position = marker.position();
        Some(match resolver.cached(position.lat, position.lon) {
            Some(address) => content.with_address(address),
            None => content,
        })
    }

    /// Popup for a live marker with its address resolved through `resolver`.
    pub async fn popup(&self, id: EventId, resolver: &AddressResolver) -> Option<PopupContent> {
        let marker = self.markers.marker(id)?;
        let content = PopupContent::for_event(marker.event());
        let position = marker.position();
        match resolver.resolve(position.lat, position.lon).await {
            Ok(address) => Some(content.with_address(address)),
            Err(err) => {
                warn!("no address for event {id}: {err}");
                Some(content)
            }
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Releases markers, listeners and the map instance. Repeated calls, and
    /// calls after a failed `create`, are safe.
    pub fn destroy(&mut self) {
        match self.lifecycle {
            Lifecycle::Live => {
                let released = self.markers.clear(&mut self.backend);
                if self.gestures.long_press_enabled() {
                    self.backend.set_input_listening(false);
                }
                self.backend.release();
                self.metrics.set_gauge("markers_live", 0);
                info!("map destroyed ({released} markers released)");
            }
            Lifecycle::Failed => {
                self.backend.release();
                debug!("released partially initialized map");
            }
            Lifecycle::Pending | Lifecycle::Destroyed => {
                debug!("map surface not live; nothing to destroy");
                return;
            }
        }
        self.gestures.reset();
        self.gestures.set_long_press_enabled(false);
        self.on_long_press = None;
        self.lifecycle = Lifecycle::Destroyed;
    }
}

impl<B: MapBackend> Drop for MapSurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
