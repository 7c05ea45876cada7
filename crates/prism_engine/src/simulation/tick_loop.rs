//! Fixed-interval tick loop
//!
//! The loop is a small state machine the host drives with [`TickLoop::advance`].
//! Each call does one step and yields: first after rebuilding the index, then
//! after streaming and resolving the candidates. Between ticks it waits for a
//! monotonic deadline. [`TickLoop::run`] drives it on the current thread
//! until cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::SimulationConfig;
use crate::foundation::time::Stopwatch;
use crate::simulation::{PrismWorld, TickReport};

/// Longest single sleep while waiting, so cancellation is noticed promptly
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Where the loop is within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    /// Ready to start a tick
    Idle,
    /// Flags cleared and index rebuilt; candidates are next
    RebuildingIndex,
    /// Streaming pairs from the index
    GeneratingCandidates,
    /// Running narrow-phase tests and resolving hits
    TestingResolving,
    /// Tick finished; the next one starts at `until`
    Waiting {
        /// Deadline for the next tick
        until: Instant,
    },
}

/// Shared stop flag, settable from any thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`CancellationToken::cancel`] has been called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cooperative driver for [`PrismWorld`] ticks
#[derive(Debug)]
pub struct TickLoop {
    phase: TickPhase,
    interval: Duration,
    stopwatch: Stopwatch,
    last_report: Option<TickReport>,
}

impl TickLoop {
    /// Create an idle loop with the given interval between ticks
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            phase: TickPhase::Idle,
            interval,
            stopwatch: Stopwatch::start_new(),
            last_report: None,
        }
    }

    /// Create an idle loop using the configured interval
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.tick_interval())
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Interval between ticks
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Report of the most recently finished tick
    #[must_use]
    pub const fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    fn enter(&mut self, phase: TickPhase) {
        log::trace!("Tick phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn begin(&mut self, world: &mut PrismWorld) {
        self.stopwatch = Stopwatch::start_new();
        world.begin_tick();
        self.enter(TickPhase::RebuildingIndex);
    }

    /// Do one step and return the new phase
    ///
    /// From [`TickPhase::Idle`] the flags are cleared and the index rebuilt.
    /// The next call streams, tests and resolves every candidate, then waits
    /// for `interval` counted from when resolution finished (`now` plus the
    /// time spent resolving). Calls before that deadline change nothing; the
    /// first call after it starts the next tick.
    pub fn advance(&mut self, world: &mut PrismWorld, now: Instant) -> TickPhase {
        match self.phase {
            TickPhase::Idle => self.begin(world),
            TickPhase::RebuildingIndex | TickPhase::GeneratingCandidates | TickPhase::TestingResolving => {
                self.enter(TickPhase::GeneratingCandidates);
                self.enter(TickPhase::TestingResolving);
                let resolving = Stopwatch::start_new();
                self.last_report = Some(world.finish_tick(&self.stopwatch));

                // The pause starts once the candidate stream is exhausted
                let exhausted = now + resolving.elapsed();
                self.enter(TickPhase::Waiting {
                    until: exhausted + self.interval,
                });
            }
            TickPhase::Waiting { until } if now >= until => {
                self.enter(TickPhase::Idle);
                self.begin(world);
            }
            TickPhase::Waiting { .. } => {}
        }
        self.phase
    }

    /// Drive ticks on the current thread until `cancel` fires or
    /// `max_ticks` ticks have completed; returns the number completed
    pub fn run(&mut self, world: &mut PrismWorld, cancel: &CancellationToken, max_ticks: Option<u64>) -> u64 {
        self.run_with(world, cancel, max_ticks, |_| {})
    }

    /// Like [`TickLoop::run`], calling `on_tick` after every finished tick
    pub fn run_with<F>(
        &mut self,
        world: &mut PrismWorld,
        cancel: &CancellationToken,
        max_ticks: Option<u64>,
        mut on_tick: F,
    ) -> u64
    where
        F: FnMut(&TickReport),
    {
        let mut completed = 0;
        log::info!("Tick loop started ({:?} interval)", self.interval);

        while !cancel.is_cancelled() && max_ticks.map_or(true, |max| completed < max) {
            let was_waiting = matches!(self.phase, TickPhase::Waiting { .. });

            if let TickPhase::Waiting { until } = self.advance(world, Instant::now()) {
                if !was_waiting {
                    completed += 1;
                    if let Some(report) = &self.last_report {
                        on_tick(report);
                    }
                    if max_ticks.is_some_and(|max| completed >= max) {
                        break;
                    }
                }
                sleep_until(until, cancel);
            }
        }

        log::info!("Tick loop stopped after {completed} ticks");
        completed
    }
}

/// Sleep until `deadline` in short slices, returning early on cancellation
fn sleep_until(deadline: Instant, cancel: &CancellationToken) {
    while !cancel.is_cancelled() {
        match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => std::thread::sleep(remaining.min(CANCEL_POLL)),
            _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::{BodyRegistry, Prism};
    use crate::foundation::math::Vec3;

    fn overlapping_world(interval: f32) -> PrismWorld {
        let registry = BodyRegistry::from_prisms(vec![
            Prism::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).unwrap(),
            Prism::cuboid(Vec3::new(0.5, 0.0, 0.0), Vec3::new(1.5, 1.0, 1.0)).unwrap(),
        ]);
        let config = SimulationConfig::default().with_tick_interval(interval);
        PrismWorld::from_registry(config, registry).unwrap()
    }

    #[test]
    fn test_phase_transitions() {
        let mut world = overlapping_world(0.5);
        let mut tick_loop = TickLoop::from_config(world.config());
        assert_eq!(tick_loop.phase(), TickPhase::Idle);

        let start = Instant::now();
        assert_eq!(tick_loop.advance(&mut world, start), TickPhase::RebuildingIndex);
        assert_eq!(world.ticks_completed(), 0);

        let TickPhase::Waiting { until } = tick_loop.advance(&mut world, start) else {
            panic!("expected to wait after resolving");
        };
        assert!(until >= start + Duration::from_millis(500));
        assert!(until <= Instant::now() + Duration::from_millis(500));
        assert_eq!(world.ticks_completed(), 1);
        assert_eq!(tick_loop.last_report().map(|r| r.hits), Some(1));

        // Before the deadline nothing happens
        let early = until - Duration::from_millis(1);
        assert_eq!(tick_loop.advance(&mut world, early), TickPhase::Waiting { until });
        assert_eq!(world.ticks_completed(), 1);

        // After it, the next tick begins straight away
        assert_eq!(tick_loop.advance(&mut world, until), TickPhase::RebuildingIndex);
        assert!(world.collision_state().colliding_count() == 0);
    }

    #[test]
    fn test_wait_counts_from_end_of_resolution() {
        let mut world = overlapping_world(0.2);
        let mut tick_loop = TickLoop::from_config(world.config());

        let start = Instant::now();
        tick_loop.advance(&mut world, start);
        let before = Instant::now();
        let TickPhase::Waiting { until } = tick_loop.advance(&mut world, before) else {
            panic!("expected to wait after resolving");
        };
        let after = Instant::now();

        // The full interval remains after resolution, whatever it cost
        assert!(until >= before + Duration::from_millis(200));
        assert!(until <= after + Duration::from_millis(200));
    }

    #[test]
    fn test_run_stops_at_max_ticks() {
        let mut world = overlapping_world(0.005);
        let mut tick_loop = TickLoop::from_config(world.config());
        let mut reports = Vec::new();

        let completed = tick_loop.run_with(&mut world, &CancellationToken::new(), Some(3), |report| {
            reports.push(*report);
        });

        assert_eq!(completed, 3);
        assert_eq!(world.ticks_completed(), 3);
        assert_eq!(reports.iter().map(|r| r.tick).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancelled_token_stops_immediately() {
        let mut world = overlapping_world(0.5);
        let token = CancellationToken::new();
        token.cancel();

        let completed = TickLoop::from_config(world.config()).run(&mut world, &token, None);
        assert_eq!(completed, 0);
        assert_eq!(world.ticks_completed(), 0);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let mut world = overlapping_world(0.05);
        let token = CancellationToken::new();
        let remote = token.clone();

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(120));
            remote.cancel();
        });

        let started = Instant::now();
        let completed = TickLoop::from_config(world.config()).run(&mut world, &token, None);
        canceller.join().unwrap();

        assert!(completed >= 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
