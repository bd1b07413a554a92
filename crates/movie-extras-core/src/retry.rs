use std::thread;
use std::time::Duration;

/// Fixed-delay retry budget; every pause is `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Metadata service requests.
    pub const fn metadata_default() -> Self {
        Self::new(4, Duration::from_secs(1))
    }

    /// Candidate metadata lookups: one try plus three retries.
    pub const fn resolve_default() -> Self {
        Self::new(4, Duration::from_secs(1))
    }

    /// Video downloads.
    pub const fn download_default() -> Self {
        Self::new(10, Duration::from_secs(3))
    }

    pub fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}
