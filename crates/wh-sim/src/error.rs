use thiserror::Error;

use wh_core::CoreError;
use wh_grid::GridError;
use wh_order::OrderError;
use wh_plan::PlanError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("layout error: {0}")]
    Layout(#[from] GridError),

    #[error("{what} length {got} does not match agent count {expected}")]
    CountMismatch {
        expected: usize,
        got: usize,
        what: &'static str,
    },

    /// A reservation commit conflicted.  The replan ordering guarantees this
    /// cannot happen, so it is a bug, not a recoverable condition.
    #[error("planner invariant violated: {0}")]
    Plan(#[from] PlanError),

    /// An inventory transition the state machine should have made impossible.
    #[error("order invariant violated: {0}")]
    Order(#[from] OrderError),

    /// Every agent has been stuck for longer than the retry budget.
    #[error("no agent could plan for {ticks} consecutive ticks")]
    Stalled { ticks: u64 },
}

pub type SimResult<T> = Result<T, SimError>;
