use std::time::{Duration, Instant};

/// Abstraction over a time source to improve testability.
///
/// Blocking primitives compute deadlines with `now()` and yield with
/// `sleep()` whenever the transport has nothing buffered; a test clock can
/// advance virtual time on `sleep()` so nothing really waits.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time instant.
    fn now(&self) -> Instant;

    /// Yields for the given duration.
    fn sleep(&self, duration: Duration);
}

/// System clock using `Instant::now()` and `thread::sleep`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
