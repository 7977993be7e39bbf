//! Top-level simulation configuration and its environment loader.
//!
//! Every knob has a default so `SimConfig::from_env()` succeeds in an empty
//! environment.  Parsing is split from `std::env` access
//! ([`SimConfig::from_vars`]) so tests can feed key/value pairs without
//! mutating process state.

use crate::{CoreError, CoreResult};

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Simulation configuration, typically loaded from the environment by the
/// application binary and passed down by reference.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Grid width in cells.
    pub grid_width: i32,
    /// Grid height in cells.
    pub grid_height: i32,

    /// Number of agents.
    pub num_agents: usize,
    /// Number of stack sites.
    pub num_stacks: usize,
    /// Number of pickup zones.
    pub num_pickups: usize,
    /// Number of obstacle cells.
    pub num_obstacles: usize,

    /// Planning window in ticks: how far each per-agent search extends.
    pub planning_window: u64,
    /// Reservation horizon in ticks.  Must be >= `planning_window`.
    pub reservation_horizon: u64,
    /// Plan-in-the-past anchor offset `k` in ticks.
    pub replan_anchor: u64,
    /// Consecutive planner failures before an agent abandons its order.
    pub max_replan_failures: u32,

    /// Wall-clock milliseconds per tick.  0 = no sleeping (tests, batch).
    pub tick_period_ms: u64,
    /// Total ticks to simulate.  0 = run until stopped.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical runs.
    pub seed: u64,

    /// Probability that a generated order targets a pickup zone rather than
    /// another stack.
    pub pickup_probability: f64,
    /// Open-order cap: generation pauses while this many orders are open.
    pub max_open_orders: usize,
    /// Maximum pallets per stack.
    pub max_stack_depth: usize,

    /// Render transport address (`host:port`).  `None` runs headless.
    pub render_url: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_width: 18,
            grid_height: 12,
            num_agents: 4,
            num_stacks: 4,
            num_pickups: 3,
            num_obstacles: 8,
            planning_window: 16,
            reservation_horizon: 32,
            replan_anchor: 1,
            max_replan_failures: 5,
            tick_period_ms: 1_000,
            total_ticks: 0,
            seed: 42,
            pickup_probability: 0.5,
            max_open_orders: 16,
            max_stack_depth: 8,
            render_url: None,
        }
    }
}

impl SimConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit key/value stream.
    ///
    /// Unknown keys are ignored (the environment carries plenty of unrelated
    /// variables); known keys that fail to parse are errors.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> CoreResult<Self> {
        let mut config = Self::default();

        for (key, value) in vars {
            match key.as_str() {
                "GRID_WIDTH" => config.grid_width = parse(&key, &value)?,
                "GRID_HEIGHT" => config.grid_height = parse(&key, &value)?,
                "NUM_AGENTS" => config.num_agents = parse(&key, &value)?,
                "NUM_STACKS" => config.num_stacks = parse(&key, &value)?,
                "NUM_PICKUPS" => config.num_pickups = parse(&key, &value)?,
                "NUM_OBSTACLES" => config.num_obstacles = parse(&key, &value)?,
                "PLANNING_WINDOW" => config.planning_window = parse(&key, &value)?,
                "RESERVATION_HORIZON" => config.reservation_horizon = parse(&key, &value)?,
                "REPLAN_ANCHOR" => config.replan_anchor = parse(&key, &value)?,
                "MAX_REPLAN_FAILURES" => config.max_replan_failures = parse(&key, &value)?,
                "TICK_PERIOD_MS" => config.tick_period_ms = parse(&key, &value)?,
                "TOTAL_TICKS" => config.total_ticks = parse(&key, &value)?,
                "RANDOM_SEED" => config.seed = parse(&key, &value)?,
                "PICKUP_PROBABILITY" => config.pickup_probability = parse(&key, &value)?,
                "MAX_OPEN_ORDERS" => config.max_open_orders = parse(&key, &value)?,
                "MAX_STACK_DEPTH" => config.max_stack_depth = parse(&key, &value)?,
                "RENDER_TRANSPORT_URL" => {
                    config.render_url = (!value.is_empty()).then_some(value);
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> CoreResult<()> {
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(CoreError::Config(format!(
                "grid dimensions must be positive, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.num_agents == 0 {
            return Err(CoreError::Config("NUM_AGENTS must be at least 1".into()));
        }
        if self.num_stacks == 0 || self.num_pickups == 0 {
            return Err(CoreError::Config(
                "NUM_STACKS and NUM_PICKUPS must be at least 1".into(),
            ));
        }
        if self.planning_window == 0 {
            return Err(CoreError::Config("PLANNING_WINDOW must be at least 1".into()));
        }
        if self.reservation_horizon < self.planning_window {
            return Err(CoreError::Config(format!(
                "RESERVATION_HORIZON ({}) must be >= PLANNING_WINDOW ({})",
                self.reservation_horizon, self.planning_window
            )));
        }
        if self.replan_anchor >= self.planning_window {
            return Err(CoreError::Config(format!(
                "REPLAN_ANCHOR ({}) must be smaller than PLANNING_WINDOW ({})",
                self.replan_anchor, self.planning_window
            )));
        }
        if !(0.0..=1.0).contains(&self.pickup_probability) {
            return Err(CoreError::Config(format!(
                "PICKUP_PROBABILITY must be in [0, 1], got {}",
                self.pickup_probability
            )));
        }
        if self.max_stack_depth < 2 {
            return Err(CoreError::Config("MAX_STACK_DEPTH must be at least 2".into()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| CoreError::Parse {
        key: key.to_string(),
        message: e.to_string(),
    })
}
