//! Click / long-press / drag recognition over raw pointer input.
//!
//! Desktop right-click and touch press-and-hold both end up as `LongPress`, so
//! callers handle one event no matter the input device. Time never comes from
//! a clock: every input carries the host's timestamp and the host calls
//! `tick` (or forwards any later input) to let the long-press timer fire.

use foundation::math::LatLon;
use foundation::time::TimeMs;
use runtime::timer::{TimerId, TimerQueue};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Gesture {
    Click(LatLon),
    LongPress(LatLon),
    Drag,
}

/// What the host should do with one input.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct InputResponse {
    pub gesture: Option<Gesture>,
    /// Swallow the platform's click or context menu for this input.
    pub suppress_default: bool,
    /// Vibrate for this many milliseconds.
    pub haptic_ms: Option<u32>,
}

impl InputResponse {
    fn emit(mut self, gesture: Gesture) -> Self {
        self.gesture = Some(gesture);
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GestureConfig {
    pub long_press_ms: u64,
    pub move_tolerance_m: f64,
    pub haptic_ms: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 500,
            move_tolerance_m: 20.0,
            haptic_ms: 50,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    /// Pointer is down and has not moved past the tolerance.
    Pressing,
    Dragging,
    /// Long press emitted; waiting for the pointer to lift.
    Fired,
}

#[derive(Debug, Copy, Clone)]
struct GestureSession {
    start: LatLon,
    started_at: TimeMs,
    timer: Option<TimerId>,
}

/// Emits at most one of `Click` / `LongPress` per down-to-up interaction, and
/// never `LongPress` once the pointer has moved past the tolerance.
///
/// Only one session exists at a time; extra pointers are ignored.
#[derive(Debug)]
pub struct GestureRecognizer {
    config: GestureConfig,
    long_press_enabled: bool,
    phase: GesturePhase,
    session: Option<GestureSession>,
    timers: TimerQueue<()>,
}

impl GestureRecognizer {
    /// Long press starts disabled.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            long_press_enabled: false,
            phase: GesturePhase::Idle,
            session: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn long_press_enabled(&self) -> bool {
        self.long_press_enabled
    }

    /// Disabling mid-press cancels the pending timer; the press can still
    /// end as a click.
    pub fn set_long_press_enabled(&mut self, enabled: bool) {
        if self.long_press_enabled == enabled {
            return;
        }
        self.long_press_enabled = enabled;
        if !enabled {
            self.cancel_timer();
        }
    }

    /// When the host should call `tick` next, if a timer is armed.
    pub fn next_deadline(&self) -> Option<TimeMs> {
        self.timers.next_deadline()
    }

    pub fn on_pointer_down(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        let out = self.tick(now);
        if self.phase != GesturePhase::Idle {
            debug!("ignoring pointer down at {position:?}: gesture already in progress");
            return out;
        }

        let timer = self
            .long_press_enabled
            .then(|| self.timers.schedule(now.after(self.config.long_press_ms), ()));
        self.session = Some(GestureSession {
            start: position,
            started_at: now,
            timer,
        });
        self.phase = GesturePhase::Pressing;
        out
    }

    pub fn on_pointer_move(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        let out = self.tick(now);
        if self.moved_too_far(position) {
            self.cancel_timer();
            self.phase = GesturePhase::Dragging;
            return out.emit(Gesture::Drag);
        }
        out
    }

    pub fn on_pointer_up(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        let mut out = self.tick(now);
        match self.phase {
            GesturePhase::Idle => return out,
            GesturePhase::Pressing if self.moved_too_far(position) => {
                out = out.emit(Gesture::Drag);
            }
            GesturePhase::Pressing => {
                if let Some(session) = self.session {
                    out = out.emit(Gesture::Click(session.start));
                }
            }
            GesturePhase::Fired => out.suppress_default = true,
            GesturePhase::Dragging => {}
        }
        self.end_session();
        out
    }

    /// The platform's pointer-cancel: the interaction ends with no gesture.
    pub fn on_pointer_cancel(&mut self) {
        self.end_session();
    }

    /// Desktop right-click. Emits `LongPress` at once when long press is
    /// enabled, otherwise the platform menu is left alone.
    pub fn on_context_request(&mut self, position: LatLon, now: TimeMs) -> InputResponse {
        let mut out = self.tick(now);
        if !self.long_press_enabled {
            return out;
        }
        out.suppress_default = true;
        match self.phase {
            GesturePhase::Idle => out.emit(Gesture::LongPress(position)),
            // Touch browsers raise a context request during press-and-hold.
            GesturePhase::Pressing => {
                self.cancel_timer();
                self.phase = GesturePhase::Fired;
                out.emit(Gesture::LongPress(position))
            }
            GesturePhase::Fired | GesturePhase::Dragging => out,
        }
    }

    /// Fires the long-press timer if it is due at `now`.
    pub fn tick(&mut self, now: TimeMs) -> InputResponse {
        let mut out = InputResponse::default();
        for (id, ()) in self.timers.pop_due(now) {
            let Some(session) = self.session.as_mut() else {
                continue;
            };
            if self.phase != GesturePhase::Pressing || session.timer != Some(id) {
                continue;
            }
            session.timer = None;
            self.phase = GesturePhase::Fired;
            debug!(
                "long press at {:?} after {}ms",
                session.start,
                now.since(session.started_at)
            );
            out = out.emit(Gesture::LongPress(session.start));
            out.haptic_ms = (self.config.haptic_ms > 0).then_some(self.config.haptic_ms);
        }
        out
    }

    /// Drops any session and timer without emitting.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.session = None;
        self.phase = GesturePhase::Idle;
    }

    fn moved_too_far(&self, position: LatLon) -> bool {
        self.phase == GesturePhase::Pressing
            && self
                .session
                .is_some_and(|s| s.start.distance_m(position) > self.config.move_tolerance_m)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.session.as_mut().and_then(|s| s.timer.take()) {
            self.timers.cancel(timer);
        }
    }

    fn end_session(&mut self) {
        self.cancel_timer();
        self.session = None;
        self.phase = GesturePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::{Gesture, GestureConfig, GesturePhase, GestureRecognizer, InputResponse};
    use foundation::math::LatLon;
    use foundation::time::TimeMs;

    const START: LatLon = LatLon {
        lat: 50.45,
        lon: 30.52,
    };

    fn recognizer() -> GestureRecognizer {
        let mut r = GestureRecognizer::new(GestureConfig::default());
        r.set_long_press_enabled(true);
        r
    }

    fn north(meters: f64) -> LatLon {
        START.offset_north_m(meters)
    }

    #[test]
    fn quick_release_is_a_click() {
        let mut r = recognizer();
        assert_eq!(r.on_pointer_down(START, TimeMs(0)), InputResponse::default());
        let up = r.on_pointer_up(north(3.0), TimeMs(120));
        assert_eq!(up.gesture, Some(Gesture::Click(START)));
        assert!(!up.suppress_default);
        assert_eq!(r.phase(), GesturePhase::Idle);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn hold_within_tolerance_fires_at_deadline() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        assert_eq!(r.on_pointer_move(north(5.0), TimeMs(200)).gesture, None);
        assert_eq!(r.next_deadline(), Some(TimeMs(500)));
        assert_eq!(r.tick(TimeMs(499)).gesture, None);

        let fired = r.tick(TimeMs(500));
        assert_eq!(fired.gesture, Some(Gesture::LongPress(START)));
        assert_eq!(fired.haptic_ms, Some(50));
        assert_eq!(r.phase(), GesturePhase::Fired);

        let up = r.on_pointer_up(START, TimeMs(900));
        assert_eq!(up.gesture, None);
        assert!(up.suppress_default);
    }

    #[test]
    fn moving_past_tolerance_cancels_long_press() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        let moved = r.on_pointer_move(north(50.0), TimeMs(100));
        assert_eq!(moved.gesture, Some(Gesture::Drag));
        assert_eq!(r.next_deadline(), None);

        assert_eq!(r.tick(TimeMs(600)).gesture, None);
        assert_eq!(r.on_pointer_move(north(80.0), TimeMs(700)).gesture, None);
        assert_eq!(r.on_pointer_up(north(80.0), TimeMs(2000)), InputResponse::default());
    }

    #[test]
    fn late_input_fires_due_timer_first() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        let up = r.on_pointer_up(START, TimeMs(650));
        assert_eq!(up.gesture, Some(Gesture::LongPress(START)));
        assert!(up.suppress_default);
        assert_eq!(r.phase(), GesturePhase::Idle);
    }

    #[test]
    fn second_pointer_is_ignored() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        assert_eq!(r.on_pointer_down(north(500.0), TimeMs(50)), InputResponse::default());
        assert_eq!(r.next_deadline(), Some(TimeMs(500)));
        assert_eq!(r.on_pointer_up(START, TimeMs(100)).gesture, Some(Gesture::Click(START)));
    }

    #[test]
    fn context_request_depends_on_enablement() {
        let mut r = recognizer();
        let here = north(10.0);
        let resp = r.on_context_request(here, TimeMs(0));
        assert_eq!(resp.gesture, Some(Gesture::LongPress(here)));
        assert!(resp.suppress_default);
        assert_eq!(resp.haptic_ms, None);

        r.set_long_press_enabled(false);
        assert_eq!(r.on_context_request(here, TimeMs(10)), InputResponse::default());
    }

    #[test]
    fn context_request_during_hold_is_the_only_long_press() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        assert_eq!(
            r.on_context_request(START, TimeMs(450)).gesture,
            Some(Gesture::LongPress(START))
        );
        assert_eq!(r.tick(TimeMs(600)).gesture, None);
        assert_eq!(r.on_context_request(START, TimeMs(650)).gesture, None);
        assert!(r.on_pointer_up(START, TimeMs(700)).suppress_default);
    }

    #[test]
    fn disabled_long_press_still_clicks_and_drags() {
        let mut r = GestureRecognizer::new(GestureConfig::default());
        r.on_pointer_down(START, TimeMs(0));
        assert_eq!(r.next_deadline(), None);
        assert_eq!(r.tick(TimeMs(5000)).gesture, None);
        assert_eq!(r.on_pointer_up(START, TimeMs(5001)).gesture, Some(Gesture::Click(START)));

        r.on_pointer_down(START, TimeMs(6000));
        assert_eq!(r.on_pointer_move(north(30.0), TimeMs(6100)).gesture, Some(Gesture::Drag));
    }

    #[test]
    fn disabling_mid_press_cancels_timer() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        r.set_long_press_enabled(false);
        assert_eq!(r.next_deadline(), None);
        assert_eq!(r.tick(TimeMs(800)).gesture, None);
        assert_eq!(r.on_pointer_up(START, TimeMs(900)).gesture, Some(Gesture::Click(START)));
    }

    #[test]
    fn release_far_away_is_a_drag_not_a_click() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        assert_eq!(r.on_pointer_up(north(40.0), TimeMs(100)).gesture, Some(Gesture::Drag));
    }

    #[test]
    fn cancel_and_reset_drop_the_session() {
        let mut r = recognizer();
        r.on_pointer_down(START, TimeMs(0));
        r.on_pointer_cancel();
        assert_eq!(r.phase(), GesturePhase::Idle);
        assert_eq!(r.tick(TimeMs(1000)).gesture, None);

        r.on_pointer_down(START, TimeMs(2000));
        r.reset();
        assert_eq!(r.next_deadline(), None);
        assert_eq!(r.on_pointer_up(START, TimeMs(2100)), InputResponse::default());
    }

    #[test]
    fn one_interaction_never_yields_both_click_and_long_press() {
        for move_at in [50u64, 300, 499, 500, 700] {
            for distance in [0.0, 5.0, 19.0, 21.0, 100.0] {
                for up_at in [100u64, 499, 500, 501, 1500] {
                    let mut r = recognizer();
                    let mut seen = Vec::new();
                    let mut record = |resp: InputResponse| seen.extend(resp.gesture);

                    record(r.on_pointer_down(START, TimeMs(0)));
                    if move_at < up_at {
                        record(r.on_pointer_move(north(distance), TimeMs(move_at)));
                    }
                    record(r.tick(TimeMs(up_at.saturating_sub(1))));
                    record(r.on_pointer_up(north(distance), TimeMs(up_at)));

                    let clicks = seen.iter().filter(|g| matches!(g, Gesture::Click(_))).count();
                    let presses = seen
                        .iter()
                        .filter(|g| matches!(g, Gesture::LongPress(_)))
                        .count();
                    assert!(
                        clicks + presses <= 1,
                        "move_at={move_at} distance={distance} up_at={up_at}: {seen:?}"
                    );

                    let dragged_before_deadline =
                        distance > 20.0 && move_at < 500 && move_at < up_at;
                    if dragged_before_deadline {
                        assert_eq!(presses, 0, "long press after drag: {seen:?}");
                    }
                }
            }
        }
    }
}
