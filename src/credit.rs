/// Credit counter, always within `0..=max`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CreditTracker {
    available: u8,
    max: u8,
}

impl CreditTracker {
    pub const fn new() -> Self {
        Self {
            available: 0,
            max: 0,
        }
    }

    /// Set the absolute credit count and the upper bound, as reported by `DeviceStarted`.
    pub fn reset(&mut self, credits: u8) {
        self.available = credits;
        self.max = credits;
    }

    /// Take one credit. Returns `false` if none is left, in which case nothing may be sent.
    pub fn try_reserve(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    /// Return `n` credits, clamped to the declared maximum.
    pub fn grant(&mut self, n: u8) {
        self.available = self.available.saturating_add(n).min(self.max);
    }

    pub fn available(&self) -> u8 {
        self.available
    }

    pub fn max(&self) -> u8 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_until_empty() {
        let mut credits = CreditTracker::new();
        assert!(!credits.try_reserve());

        credits.reset(2);
        assert!(credits.try_reserve());
        assert!(credits.try_reserve());
        assert!(!credits.try_reserve());
        assert_eq!(credits.available(), 0);
    }

    #[test]
    fn test_burst_succeeds_min_of_requests_and_credits() {
        for k in 0..5u8 {
            for n in 0..8usize {
                let mut credits = CreditTracker::new();
                credits.reset(k);
                let ok = (0..n).filter(|_| credits.try_reserve()).count();
                assert_eq!(ok, n.min(k as usize));
                assert!(credits.available() <= credits.max());
            }
        }
    }

    #[test]
    fn test_grant_is_clamped() {
        let mut credits = CreditTracker::new();
        credits.reset(3);
        credits.try_reserve();
        credits.grant(10);
        assert_eq!(credits.available(), 3);

        credits.grant(u8::MAX);
        assert_eq!(credits.available(), 3);
    }

    #[test]
    fn test_reset_replaces_count() {
        let mut credits = CreditTracker::new();
        credits.reset(4);
        credits.try_reserve();
        credits.reset(1);
        assert_eq!(credits.available(), 1);
        assert_eq!(credits.max(), 1);
    }
}
