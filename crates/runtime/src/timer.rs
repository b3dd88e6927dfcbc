use foundation::time::TimeMs;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug)]
struct Pending<T> {
    id: TimerId,
    deadline: TimeMs,
    payload: T,
}

/// Deterministic queue of cancellable deferred actions.
///
/// Key properties:
/// - Due timers pop in `(deadline, id)` order, so equal deadlines fire in
///   scheduling order.
/// - Cancellation removes the timer; a cancelled timer never fires.
/// - No clock is read: the owner advances time by calling `pop_due(now)`.
///
/// Vec-backed because only a handful of timers are ever live at once.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedules `payload` to become due at `deadline`.
    pub fn schedule(&mut self, deadline: TimeMs, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push(Pending {
            id,
            deadline,
            payload,
        });
        id
    }

    /// Cancels a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(idx) = self.pending.iter().position(|p| p.id == id) else {
            return false;
        };
        self.pending.swap_remove(idx);
        true
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<TimeMs> {
        self.pending.iter().find(|p| p.id == id).map(|p| p.deadline)
    }

    /// Earliest pending deadline, for hosts that want to sleep until it.
    pub fn next_deadline(&self) -> Option<TimeMs> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    /// Removes and returns every timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: TimeMs) -> Vec<(TimerId, T)> {
        let mut due: Vec<Pending<T>> = Vec::new();
        let mut idx = 0;
        while idx < self.pending.len() {
            if self.pending[idx].deadline <= now {
                due.push(self.pending.swap_remove(idx));
            } else {
                idx += 1;
            }
        }
        due.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.id.cmp(&b.id)));
        due.into_iter().map(|p| (p.id, p.payload)).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
