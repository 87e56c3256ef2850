use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use hal::clock::Monotonic;

/// Time since construction, backed by the OS monotonic clock
#[derive(Copy, Clone, Debug)]
pub struct StdClock {
    origin: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl StdClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Monotonic for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl<T: Into<u32>> DelayMs<T> for StdDelay {
    fn delay_ms(&mut self, ms: T) {
        let ms: u32 = ms.into();
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

impl<T: Into<u32>> DelayUs<T> for StdDelay {
    fn delay_us(&mut self, us: T) {
        let us: u32 = us.into();
        thread::sleep(Duration::from_micros(us as u64));
    }
}

mod test {
    #[test]
    fn test_monotonic() {
        use embedded_hal::blocking::delay::DelayMs;
        use hal::clock::Monotonic;

        use super::{StdClock, StdDelay};

        let clock = StdClock::new();
        let before = clock.now();
        StdDelay.delay_ms(2u8);
        assert!(clock.now() - before >= std::time::Duration::from_millis(2));
    }
}
