use embassy_time::{Duration, Instant};

/// Time source used for the settle delays and for event timestamps.
pub trait Clock {
    /// Stall for `duration`. Only used for short, bounded settle periods.
    fn delay(&mut self, duration: Duration);

    fn now(&self) -> Instant;
}

/// [`Clock`] backed by the embassy time driver
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn delay(&mut self, duration: Duration) {
        embassy_time::block_for(duration);
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
