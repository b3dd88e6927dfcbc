/// Host-supplied monotonic timestamp in milliseconds.
///
/// Input handling never reads a clock itself; every pointer event and tick
/// carries the host's time so interactions replay deterministically.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeMs(pub u64);

impl TimeMs {
    pub const ZERO: TimeMs = TimeMs(0);

    pub fn after(self, ms: u64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier` (zero if `earlier` is in the future).
    pub fn since(self, earlier: TimeMs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeMs;

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(TimeMs(10).after(5), TimeMs(15));
        assert_eq!(TimeMs(u64::MAX).after(1), TimeMs(u64::MAX));
        assert_eq!(TimeMs(10).since(TimeMs(4)), 6);
        assert_eq!(TimeMs(4).since(TimeMs(10)), 0);
    }
}
