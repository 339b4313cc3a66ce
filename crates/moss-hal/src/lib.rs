//! Hardware Abstraction Layer trait for Moss
//!
//! The pool layer itself never touches hardware. The kernel wrapper needs two
//! things from its platform: a monotonic clock to stamp commits with, and a
//! console to write debug lines to.
//!
//! # Platform Implementations
//!
//! - **Hosted tests**: [`TestHal`], a manually advanced clock and a silent console
//! - **Board support**: UART console and the platform timer

#![no_std]

/// Hardware Abstraction Layer trait
///
/// Implementations provide platform-specific functionality for:
/// - Time measurement
/// - Debug output
pub trait HAL: Send + Sync + 'static {
    // === Time ===

    /// Get current time in nanoseconds (monotonic)
    fn now_nanos(&self) -> u64;

    // === Debug ===

    /// Write a debug message to the platform's console/log
    fn debug_write(&self, msg: &str);
}

/// A minimal test HAL for unit testing
///
/// Time only moves when the test calls [`TestHal::advance`]; debug output is
/// discarded.
#[derive(Default)]
pub struct TestHal {
    time: core::sync::atomic::AtomicU64,
}

impl TestHal {
    pub fn new() -> Self {
        Self {
            time: core::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `nanos`
    pub fn advance(&self, nanos: u64) {
        self.time
            .fetch_add(nanos, core::sync::atomic::Ordering::SeqCst);
    }
}

impl HAL for TestHal {
    fn now_nanos(&self) -> u64 {
        self.time.load(core::sync::atomic::Ordering::SeqCst)
    }

    fn debug_write(&self, _msg: &str) {
        // No-op for tests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let hal = TestHal::new();
        assert_eq!(hal.now_nanos(), 0);
    }

    #[test]
    fn test_advance_is_cumulative() {
        let hal = TestHal::new();
        hal.advance(10);
        hal.advance(5);
        assert_eq!(hal.now_nanos(), 15);
    }

    #[test]
    fn test_debug_write_is_silent() {
        let hal = TestHal::default();
        hal.debug_write("[kernel] ignored");
        assert_eq!(hal.now_nanos(), 0);
    }
}
