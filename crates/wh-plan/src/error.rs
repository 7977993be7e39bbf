use thiserror::Error;
use wh_core::{AgentId, Cell, Tick};

#[derive(Debug, Error)]
pub enum PlanError {
    /// No path to the goal exists within the search's reach — the agent is
    /// boxed in or the goal is disconnected.  Recoverable: the caller marks
    /// the agent stuck and retries with bumped priority.
    #[error("agent {agent}: no path to {goal} from {start} at {tick}")]
    Unreachable {
        agent: AgentId,
        start: Cell,
        goal: Cell,
        tick: Tick,
    },

    /// A commit tried to install an entry another agent already owns.  The
    /// search respects the table, so this indicates broken commit ordering
    /// and is fatal.
    #[error("reservation conflict: {cell} at {tick} already owned by {owner}")]
    ReservationConflict {
        owner: AgentId,
        cell: Cell,
        tick: Tick,
    },
}

pub type PlanResult<T> = Result<T, PlanError>;
