/// Identifies one provider request issued for a cache entry.
///
/// A completion only lands if the entry still carries the same id; anything
/// else means the entry was reset while the request was in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);
