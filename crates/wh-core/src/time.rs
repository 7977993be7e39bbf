//! Simulation time model.
//!
//! Time is a monotonically increasing `Tick` counter; one tick is one
//! constant-speed movement step for every agent.  The mapping to wall-clock
//! time is a single configured period held in `SimClock` — the simulation
//! itself never reads a wall clock, which keeps runs reproducible.

use std::fmt;
use std::time::Duration;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
///
/// Stored as `u64`; at one tick per millisecond a u64 lasts ~585 million
/// years, so overflow is not a practical concern.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tracks the current tick and the configured wall-clock period per tick.
///
/// Cheap to copy; holds no heap data.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Wall-clock duration of one tick.  Zero means "run as fast as possible"
    /// (used by tests and batch runs).
    pub tick_period: Duration,
    /// The current tick — advanced by [`SimClock::advance`] each iteration.
    pub current_tick: Tick,
}

impl SimClock {
    pub fn new(tick_period_ms: u64) -> Self {
        Self {
            tick_period: Duration::from_millis(tick_period_ms),
            current_tick: Tick::ZERO,
        }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = Tick(self.current_tick.0 + 1);
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.current_tick)
    }
}
