/// Lifecycle of a geocode cache entry.
///
/// Vacant → Pending → Resolved (terminal for the session)
///                  ↘ Failed → Pending (retried on the next lookup)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Resolved,
    Failed,
}

impl EntryState {
    /// Settled entries have no request in flight and may be evicted.
    pub fn is_settled(self) -> bool {
        !matches!(self, EntryState::Pending)
    }
}
