//! Monotonic time source
//!
//! All handshake waits are bounded polling loops measured against this
//! clock rather than blocking OS waits.

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `start`
    fn elapsed_ms(&self, start: u64) -> u64 {
        self.now_ms().saturating_sub(start)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
