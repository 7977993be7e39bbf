//! Tasks and orders — the unit of agent work.

use std::collections::VecDeque;

use wh_core::{Cell, OrderId, PalletId, PickupId, StackId, Tick};
use wh_grid::Layout;

// ── Task ──────────────────────────────────────────────────────────────────────

/// One leg of an order, executed by a single agent from start to finish.
///
/// Matched exhaustively everywhere; adding a variant is a compile-time sweep
/// of every consumer.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Task {
    /// Move a blocking pallet off one stack onto another.
    FreeUp {
        pallet: PalletId,
        from: StackId,
        to: StackId,
    },
    /// Lift a pallet off the top of its stack into the carry slot.
    Pickup { pallet: PalletId, from: StackId },
    /// Carry the held pallet to a pickup zone and release it.
    Delivery { pallet: PalletId, to: PickupId },
}

impl Task {
    /// The pallet this task moves.
    pub fn pallet(&self) -> PalletId {
        match *self {
            Task::FreeUp { pallet, .. } | Task::Pickup { pallet, .. } | Task::Delivery { pallet, .. } => pallet,
        }
    }

    /// The cell the agent must reach to begin this task.
    ///
    /// For carrying tasks that start wherever the agent already is
    /// (`Delivery`), this is the destination's service cell.
    pub fn start_cell(&self, layout: &Layout) -> Cell {
        match *self {
            Task::FreeUp { from, .. } => layout.stack(from).service,
            Task::Pickup { from, .. } => layout.stack(from).service,
            Task::Delivery { to, .. } => layout.pickup(to).service,
        }
    }

    /// The cell where the task finishes (drop location), if it differs from
    /// [`start_cell`](Task::start_cell).
    pub fn end_cell(&self, layout: &Layout) -> Cell {
        match *self {
            Task::FreeUp { to, .. } => layout.stack(to).service,
            Task::Pickup { from, .. } => layout.stack(from).service,
            Task::Delivery { to, .. } => layout.pickup(to).service,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Task::FreeUp { pallet, from, to } => {
                write!(f, "free-up {pallet}: {from} -> {to}")
            }
            Task::Pickup { pallet, from } => write!(f, "pickup {pallet} from {from}"),
            Task::Delivery { pallet, to } => write!(f, "deliver {pallet} to {to}"),
        }
    }
}

// ── Order ─────────────────────────────────────────────────────────────────────

/// A sequence of tasks bound to one agent until completed or abandoned.
#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub created: Tick,
    /// Remaining tasks, front first.
    pub tasks: VecDeque<Task>,
}

impl Order {
    pub fn new(id: OrderId, created: Tick, tasks: impl Into<VecDeque<Task>>) -> Self {
        Self { id, created, tasks: tasks.into() }
    }

    /// The task the agent is (or will be) working on.
    #[inline]
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.front()
    }

    /// Complete the current task; `true` if tasks remain.
    pub fn advance(&mut self) -> bool {
        self.tasks.pop_front();
        !self.tasks.is_empty()
    }

    pub fn is_done(&self) -> bool {
        self.tasks.is_empty()
    }
}
