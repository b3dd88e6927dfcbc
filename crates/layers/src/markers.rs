use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use foundation::bounds::LatLonBounds;
use foundation::ids::EventId;
use foundation::math::LatLon;
use tracing::{debug, warn};

use crate::backend::{MapBackend, MarkerHandle};
use crate::event::{Event, SkipReason};
use crate::popup::PopupContent;

/// Invoked with the full event when its marker (or popup action) is clicked.
pub type SelectCallback = Rc<dyn Fn(&Event)>;

/// How the view reacts after a reconcile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitPolicy {
    /// The caller framed the view on purpose; never auto-fit.
    pub pinned: bool,
    /// Fraction of the marker extent added on every side.
    pub padding: f64,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            pinned: false,
            padding: 0.1,
        }
    }
}

/// One live marker on the map.
pub struct Marker {
    event: Event,
    position: LatLon,
    handle: MarkerHandle,
    on_click: Box<dyn Fn()>,
}

impl Marker {
    pub fn event_id(&self) -> EventId {
        self.event.id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn position(&self) -> LatLon {
        self.position
    }

    pub fn handle(&self) -> MarkerHandle {
        self.handle
    }

    pub fn click(&self) {
        (self.on_click)();
    }
}

impl std::fmt::Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("event_id", &self.event.id)
            .field("position", &self.position)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileSummary {
    /// In input order.
    pub added: Vec<EventId>,
    /// In ascending id order.
    pub removed: Vec<EventId>,
    pub kept: Vec<EventId>,
    pub skipped: Vec<(EventId, SkipReason)>,
    /// Padded extent handed to the backend, if the view was fitted.
    pub fitted: Option<LatLonBounds>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Keeps the map's marker set equal to the image of the mappable events.
///
/// Ordering contract:
/// - Markers are stored by `EventId`, so iteration is in ascending id order.
/// - New markers are created in the order their events appear in the input.
///
/// Markers present before and after a reconcile are never touched, even if the
/// event's coordinates changed: events are immutable once reported.
pub struct MarkerSyncEngine {
    on_select: SelectCallback,
    fit: FitPolicy,
    markers: BTreeMap<EventId, Marker>,
    by_handle: HashMap<MarkerHandle, EventId>,
}

impl MarkerSyncEngine {
    pub fn new(on_select: SelectCallback) -> Self {
        Self {
            on_select,
            fit: FitPolicy::default(),
            markers: BTreeMap::new(),
            by_handle: HashMap::new(),
        }
    }

    pub fn with_fit_policy(mut self, fit: FitPolicy) -> Self {
        self.fit = fit;
        self
    }

    pub fn fit_policy(&self) -> FitPolicy {
        self.fit
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.fit.pinned = pinned;
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.markers.keys().copied()
    }

    pub fn marker(&self, id: EventId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn marker_by_handle(&self, handle: MarkerHandle) -> Option<&Marker> {
        self.by_handle
            .get(&handle)
            .and_then(|id| self.markers.get(id))
    }

    /// Fires the bound callback of the marker behind `handle`.
    ///
    /// Returns `false` for handles this engine does not own (stale clicks that
    /// raced a removal).
    pub fn click(&self, handle: MarkerHandle) -> bool {
        match self.marker_by_handle(handle) {
            Some(marker) => {
                marker.click();
                true
            }
            None => {
                debug!("ignoring click on unknown marker {handle:?}");
                false
            }
        }
    }

    /// Extent of all live markers, unpadded.
    pub fn extent(&self) -> Option<LatLonBounds> {
        LatLonBounds::from_points(self.markers.values().map(|m| m.position))
    }

    /// Applies the add/remove diff between the live markers and `events`.
    pub fn reconcile<B: MapBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        events: &[Event],
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let mut target: Vec<(&Event, LatLon)> = Vec::with_capacity(events.len());
        let mut target_ids: HashSet<EventId> = HashSet::with_capacity(events.len());
        for event in events {
            let position = match event.position() {
                Ok(p) => p,
                Err(reason) => {
                    warn!("event {} not mapped: {reason}", event.id);
                    summary.skipped.push((event.id, reason));
                    continue;
                }
            };
            if !target_ids.insert(event.id) {
                warn!("event {} not mapped: {}", event.id, SkipReason::DuplicateId);
                summary.skipped.push((event.id, SkipReason::DuplicateId));
                continue;
            }
            target.push((event, position));
        }

        let stale: Vec<EventId> = self
            .markers
            .keys()
            .filter(|id| !target_ids.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(marker) = self.markers.remove(&id) {
                backend.remove_marker(marker.handle);
                self.by_handle.remove(&marker.handle);
                summary.removed.push(id);
            }
        }

        for (event, position) in target {
            if self.markers.contains_key(&event.id) {
                summary.kept.push(event.id);
                continue;
            }

            let popup = PopupContent::for_event(event);
            let handle = backend.add_marker(position, &popup);

            let on_select = Rc::clone(&self.on_select);
            let bound = event.clone();
            let marker = Marker {
                event: event.clone(),
                position,
                handle,
                on_click: Box::new(move || on_select(&bound)),
            };

            self.by_handle.insert(handle, event.id);
            self.markers.insert(event.id, marker);
            summary.added.push(event.id);
        }

        if !self.fit.pinned
            && let Some(extent) = self.extent()
        {
            let padded = extent.pad(self.fit.padding);
            backend.fit_bounds(padded);
            summary.fitted = Some(padded);
        }

        debug!(
            "reconciled markers: +{} -{} ={} skipped={}",
            summary.added.len(),
            summary.removed.len(),
            summary.kept.len(),
            summary.skipped.len()
        );
        summary
    }

    /// Removes every marker from the map. Returns how many were released.
    pub fn clear<B: MapBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let count = self.markers.len();
        for marker in std::mem::take(&mut self.markers).into_values() {
            backend.remove_marker(marker.handle);
        }
        self.by_handle.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::{FitPolicy, MarkerSyncEngine, SelectCallback};
    use crate::event::{Event, SkipReason};
    use crate::testing::RecordingBackend;
    use chrono::{TimeZone, Utc};
    use foundation::ids::EventId;
    use foundation::math::LatLon;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ev(id: u64, lat: f64, lon: f64) -> Event {
        Event::new(id, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()).at(lat, lon)
    }

    fn new_engine() -> (MarkerSyncEngine, Rc<RefCell<Vec<EventId>>>) {
        let selected = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&selected);
        let cb: SelectCallback = Rc::new(move |e: &Event| sink.borrow_mut().push(e.id));
        (MarkerSyncEngine::new(cb), selected)
    }

    fn ids(engine: &MarkerSyncEngine) -> Vec<u64> {
        engine.ids().map(|id| id.0).collect()
    }

    #[test]
    fn reconcile_replaces_only_the_difference() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        engine.reconcile(&mut map, &[ev(1, 1.0, 1.0), ev(2, 2.0, 2.0), ev(3, 3.0, 3.0)]);
        let handle_2 = engine.marker(EventId(2)).unwrap().handle();

        let summary = engine.reconcile(&mut map, &[ev(2, 2.0, 2.0), ev(4, 10.0, 20.0)]);

        assert_eq!(ids(&engine), vec![2, 4]);
        assert_eq!(summary.removed, vec![EventId(1), EventId(3)]);
        assert_eq!(summary.added, vec![EventId(4)]);
        assert_eq!(summary.kept, vec![EventId(2)]);
        assert_eq!(engine.marker(EventId(2)).unwrap().handle(), handle_2);
        assert_eq!(engine.marker(EventId(4)).unwrap().position(), LatLon::new(10.0, 20.0));
        assert_eq!(map.markers.len(), 2);
        assert_eq!(map.added, 4);
        assert_eq!(map.removed, 2);
    }

    #[test]
    fn kept_markers_do_not_follow_moved_coordinates() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        engine.reconcile(&mut map, &[ev(1, 1.0, 1.0)]);
        let summary = engine.reconcile(&mut map, &[ev(1, 5.0, 5.0)]);

        assert!(summary.is_noop());
        assert_eq!(engine.marker(EventId(1)).unwrap().position(), LatLon::new(1.0, 1.0));
        assert_eq!(map.marker_positions(), vec![LatLon::new(1.0, 1.0)]);
    }

    #[test]
    fn unusable_events_are_skipped_without_aborting() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        let mut missing = ev(2, 0.0, 0.0);
        missing.longitude = None;

        let summary = engine.reconcile(
            &mut map,
            &[
                ev(1, f64::INFINITY, 0.0),
                missing,
                ev(3, 3.0, 3.0),
                ev(3, 9.0, 9.0),
                ev(4, f64::NAN, f64::NAN),
                ev(5, 5.0, 5.0),
            ],
        );

        assert_eq!(ids(&engine), vec![3, 5]);
        assert_eq!(
            summary.skipped,
            vec![
                (EventId(1), SkipReason::NonFiniteCoordinate),
                (EventId(2), SkipReason::MissingCoordinate),
                (EventId(3), SkipReason::DuplicateId),
                (EventId(4), SkipReason::NonFiniteCoordinate),
            ]
        );
        assert_eq!(engine.marker(EventId(3)).unwrap().position(), LatLon::new(3.0, 3.0));
    }

    #[test]
    fn live_set_tracks_every_update() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        let updates: Vec<Vec<Event>> = vec![
            vec![ev(1, 1.0, 1.0), ev(2, 2.0, 2.0)],
            vec![],
            vec![ev(3, 3.0, 3.0), ev(1, 1.0, 1.0), ev(7, f64::NAN, 0.0)],
            vec![ev(3, 3.0, 3.0)],
            vec![ev(9, 9.0, 9.0), ev(8, 8.0, 8.0), ev(3, 3.0, 3.0)],
        ];

        for events in &updates {
            engine.reconcile(&mut map, events);
            let mut expected: Vec<u64> = events
                .iter()
                .filter(|e| e.is_mappable())
                .map(|e| e.id.0)
                .collect();
            expected.sort_unstable();
            expected.dedup();
            assert_eq!(ids(&engine), expected);
            assert_eq!(map.markers.len(), expected.len());
        }
    }

    #[test]
    fn click_invokes_callback_with_bound_event() {
        let (mut engine, selected) = new_engine();
        let mut map = RecordingBackend::new();
        engine.reconcile(&mut map, &[ev(1, 1.0, 1.0), ev(2, 2.0, 2.0)]);

        let handle = engine.marker(EventId(2)).unwrap().handle();
        assert!(engine.click(handle));
        engine.reconcile(&mut map, &[ev(1, 1.0, 1.0)]);
        assert!(!engine.click(handle));

        assert_eq!(*selected.borrow(), vec![EventId(2)]);
    }

    #[test]
    fn fits_padded_extent_unless_pinned() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        let summary = engine.reconcile(&mut map, &[ev(1, 0.0, 0.0), ev(2, 10.0, 20.0)]);

        let fitted = summary.fitted.unwrap();
        assert_eq!(fitted.south_west, LatLon::new(-1.0, -2.0));
        assert_eq!(fitted.north_east, LatLon::new(11.0, 22.0));
        assert_eq!(map.fits.len(), 1);

        engine.reconcile(&mut map, &[]);
        assert_eq!(map.fits.len(), 1, "no fit without markers");

        let (engine, _) = new_engine();
        let mut pinned = engine.with_fit_policy(FitPolicy {
            pinned: true,
            padding: 0.1,
        });
        let mut map = RecordingBackend::new();
        let summary = pinned.reconcile(&mut map, &[ev(1, 0.0, 0.0)]);
        assert!(summary.fitted.is_none());
        assert!(map.fits.is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let (mut engine, _) = new_engine();
        let mut map = RecordingBackend::new();
        engine.reconcile(&mut map, &[ev(1, 1.0, 1.0), ev(2, 2.0, 2.0)]);
        assert_eq!(engine.clear(&mut map), 2);
        assert!(engine.is_empty());
        assert!(map.markers.is_empty());
        assert_eq!(engine.clear(&mut map), 0);
    }
}
