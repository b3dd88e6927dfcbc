use std::collections::BTreeMap;

use foundation::math::LatLon;
use tracing::debug;

use crate::request::RequestId;
use crate::state::EntryState;

/// Coordinate rounded to a fixed number of decimals.
///
/// Nearby lookups (GPS jitter, repeated reports from the same corner) collapse
/// onto one key. The precision is part of the key so entries written under a
/// different precision never alias.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoordKey {
    lat_e: i64,
    lon_e: i64,
    decimals: u32,
}

impl CoordKey {
    pub fn quantize(point: LatLon, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            lat_e: (point.lat * scale).round() as i64,
            lon_e: (point.lon * scale).round() as i64,
            decimals,
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Center of the quantization cell.
    pub fn point(&self) -> LatLon {
        let scale = 10f64.powi(self.decimals as i32);
        LatLon::new(self.lat_e as f64 / scale, self.lon_e as f64 / scale)
    }
}

impl std::fmt::Display for CoordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.point();
        let d = self.decimals as usize;
        write!(f, "{:.d$},{:.d$}", p.lat, p.lon)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<F> {
    state: EntryState,
    value: Option<String>,
    in_flight: Option<(RequestId, F)>,
    last_used_tick: u64,
}

/// Result of looking up a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<F> {
    Resolved(String),
    /// A request is in flight; join it instead of issuing another.
    Pending(F),
    /// Nothing usable: never seen, or the last request failed.
    Vacant,
}

/// What happened to a request completion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The entry no longer waits for this request; the result was dropped.
    Superseded,
}

/// Session-lifetime geocode cache, generic over the in-flight handle `F`.
///
/// Invariants:
/// - At most one request is in flight per key.
/// - A `Resolved` entry never goes back to `Pending`.
/// - With a `max_entries` cap, settled entries are evicted least-recently-used
///   first (tie-break by key ordering); pending entries are never evicted.
#[derive(Debug)]
pub struct GeocodeCache<F> {
    entries: BTreeMap<CoordKey, CacheEntry<F>>,
    max_entries: Option<usize>,
    tick: u64,
    next_request: u64,
}

impl<F: Clone> GeocodeCache<F> {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_entries,
            tick: 0,
            next_request: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self, key: &CoordKey) -> Option<EntryState> {
        self.entries.get(key).map(|e| e.state)
    }

    /// Resolved value without touching recency.
    pub fn value(&self, key: &CoordKey) -> Option<&str> {
        self.entries
            .get(key)
            .filter(|e| e.state == EntryState::Resolved)
            .and_then(|e| e.value.as_deref())
    }

    pub fn in_flight(&self, key: &CoordKey) -> Option<RequestId> {
        self.entries
            .get(key)
            .and_then(|e| e.in_flight.as_ref().map(|(id, _)| *id))
    }

    pub fn lookup(&mut self, key: &CoordKey) -> Slot<F> {
        self.tick += 1;
        let Some(entry) = self.entries.get_mut(key) else {
            return Slot::Vacant;
        };
        entry.last_used_tick = self.tick;
        match (entry.state, &entry.value, &entry.in_flight) {
            (EntryState::Resolved, Some(v), _) => Slot::Resolved(v.clone()),
            (EntryState::Pending, _, Some((_, f))) => Slot::Pending(f.clone()),
            _ => Slot::Vacant,
        }
    }

    /// Marks `key` pending and stores the handle built by `make` for it.
    ///
    /// Returns `None` (and does not call `make`) if the key is already pending
    /// or resolved: callers must `lookup` first.
    pub fn begin(&mut self, key: CoordKey, make: impl FnOnce(RequestId) -> F) -> Option<F> {
        self.tick += 1;
        if let Some(existing) = self.entries.get(&key)
            && existing.state != EntryState::Failed
        {
            return None;
        }

        let req = RequestId(self.next_request);
        self.next_request += 1;
        let handle = make(req);

        self.entries.insert(
            key,
            CacheEntry {
                state: EntryState::Pending,
                value: None,
                in_flight: Some((req, handle.clone())),
                last_used_tick: self.tick,
            },
        );
        Some(handle)
    }

    /// Records the outcome of request `req`: `Some(address)` resolves the entry,
    /// `None` marks it failed.
    pub fn complete(
        &mut self,
        key: &CoordKey,
        req: RequestId,
        outcome: Option<String>,
    ) -> Completion {
        let Some(entry) = self.entries.get_mut(key) else {
            debug!("dropping result of {req:?} for {key}: entry gone");
            return Completion::Superseded;
        };
        if entry.state != EntryState::Pending
            || entry.in_flight.as_ref().map(|(id, _)| *id) != Some(req)
        {
            debug!("dropping result of {req:?} for {key}: superseded");
            return Completion::Superseded;
        }

        entry.in_flight = None;
        match outcome {
            Some(v) => {
                entry.state = EntryState::Resolved;
                entry.value = Some(v);
            }
            None => {
                entry.state = EntryState::Failed;
                entry.value = None;
            }
        }

        self.evict_as_needed(key);
        Completion::Applied
    }

    /// Drops every entry. In-flight requests keep running but their results
    /// are discarded on completion.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_as_needed(&mut self, protected: &CoordKey) {
        let Some(max) = self.max_entries else {
            return;
        };
        while self.entries.len() > max {
            let pick = |exclude: Option<&CoordKey>| {
                self.entries
                    .iter()
                    .filter(|(k, e)| e.state.is_settled() && exclude.is_none_or(|p| p != *k))
                    .min_by(|(ka, ea), (kb, eb)| {
                        ea.last_used_tick
                            .cmp(&eb.last_used_tick)
                            .then_with(|| ka.cmp(kb))
                    })
                    .map(|(k, _)| *k)
            };

            let Some(victim) = pick(Some(protected)).or_else(|| pick(None)) else {
                // Everything left is pending.
                return;
            };
            debug!("evicting geocode entry {victim}");
            self.entries.remove(&victim);
        }
    }
}
