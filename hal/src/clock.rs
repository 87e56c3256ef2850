use core::time::Duration;

/// Monotonic time source, never goes backwards.
pub trait Monotonic {
    fn now(&self) -> Duration;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
