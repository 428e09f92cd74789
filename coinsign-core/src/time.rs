//! Monotonic millisecond timestamps
//!
//! All timing in the core uses one injected monotonic clock. Timestamps
//! wrap; the only valid comparison is wraparound-tolerant subtraction,
//! which stays correct across the u32 rollover (~49.7 days of uptime).

/// A point on the injected monotonic millisecond clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u32);

impl Instant {
    /// Construct from raw milliseconds since an arbitrary epoch
    pub const fn from_ms(ms: u32) -> Self {
        Self(ms)
    }

    /// Raw millisecond value
    pub const fn as_ms(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`
    ///
    /// Wraparound-tolerant: valid as long as the real distance is below
    /// half the u32 range.
    pub const fn ms_since(self, earlier: Instant) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        let t0 = Instant::from_ms(1_000);
        let t1 = Instant::from_ms(4_500);
        assert_eq!(t1.ms_since(t0), 3_500);
        assert_eq!(t0.ms_since(t0), 0);
    }

    #[test]
    fn test_elapsed_across_rollover() {
        let before = Instant::from_ms(u32::MAX - 99);
        let after = Instant::from_ms(400);
        assert_eq!(after.ms_since(before), 500);
    }
}
