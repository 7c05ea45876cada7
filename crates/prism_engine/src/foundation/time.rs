//! Time management utilities

use std::time::{Duration, Instant};

/// Simple stopwatch for measuring pipeline phases
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start_new()
    }
}

impl Stopwatch {
    /// Create a stopwatch that starts counting immediately
    #[must_use]
    pub fn start_new() -> Self {
        Self { started: Instant::now() }
    }

    /// Time since the stopwatch was started or last restarted
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in milliseconds
    #[must_use]
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

/// Convert a seconds value from configuration into a [`Duration`]
///
/// Negative and non-finite inputs clamp to zero.
#[must_use]
pub fn duration_from_secs(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f32(secs)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_counts_up() {
        let stopwatch = Stopwatch::start_new();
        std::thread::sleep(Duration::from_millis(2));
        assert!(stopwatch.elapsed() >= Duration::from_millis(2));
        assert!(stopwatch.elapsed_millis() >= 2.0);
    }

    #[test]
    fn test_duration_from_secs_clamps() {
        assert_eq!(duration_from_secs(-1.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f32::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(0.5), Duration::from_millis(500));
    }
}
