//! Per-agent state: lifecycle phase, committed path, position history.

use std::collections::VecDeque;

use wh_core::{AgentId, Cell, PalletId, Step, Tick};

// ── AgentPhase ────────────────────────────────────────────────────────────────

/// Where an agent is in its task lifecycle.
///
/// `Idle → MovingToSource → Grabbing → MovingToTarget → Dropping → Idle`,
/// with `Stuck` entered from any moving phase when planning fails.
/// Transitions are triggered by position equality with the current task's
/// endpoints; `Grabbing` and `Dropping` each take one tick, during which the
/// agent's padded plan holds its cell.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AgentPhase {
    /// No task; heading to (or parked at) the maintenance slot.
    Idle,
    /// En route to the current task's pickup endpoint.
    MovingToSource,
    /// Dwelling one tick at the source; the pallet mutation lands at the end.
    Grabbing,
    /// En route to the current task's drop endpoint.
    MovingToTarget,
    /// Dwelling one tick at the target.
    Dropping,
    /// Last plan failed; holding position, retried with bumped priority.
    Stuck,
}

// ── AgentState ────────────────────────────────────────────────────────────────

/// All mutable state of one agent.
///
/// References to pallets and tasks are by id; the inventory and order board
/// are the authorities they resolve against.
#[derive(Debug)]
pub struct AgentState {
    pub id: AgentId,
    /// Current cell; equals the committed path's entry for the current tick.
    pub pos: Cell,
    /// This agent's maintenance slot — the idle destination.
    pub home: Cell,
    pub carrying: Option<PalletId>,
    pub phase: AgentPhase,
    /// Where the current plan is headed (a service cell, or `home`).
    pub goal: Cell,
    /// Committed plan: consecutive ticks, starting at or before now.
    pub path: Vec<Step>,
    /// Ring of recent actual positions, oldest first, ending at the current
    /// tick.  Length is the replan anchor offset + 1.
    pub history: VecDeque<Step>,
    /// Consecutive planning failures; reset on any successful plan.
    pub failures: u32,
    /// Set whenever the goal changed or the plan was invalidated.
    pub needs_replan: bool,
}

impl AgentState {
    pub fn new(id: AgentId, start: Cell) -> Self {
        let mut history = VecDeque::new();
        history.push_back(Step::new(start, Tick::ZERO));
        Self {
            id,
            pos: start,
            home: start,
            carrying: None,
            phase: AgentPhase::Idle,
            goal: start,
            path: Vec::new(),
            history,
            failures: 0,
            needs_replan: true,
        }
    }

    /// The planned cell for `tick`, if the committed path covers it.
    pub fn step_at(&self, tick: Tick) -> Option<Cell> {
        let first = self.path.first()?.tick;
        if tick < first {
            return None;
        }
        self.path.get((tick - first) as usize).map(|s| s.cell)
    }

    /// The last tick the committed path covers, if any.
    pub fn plan_end(&self) -> Option<Tick> {
        self.path.last().map(|s| s.tick)
    }

    /// Future coverage of the plan beyond `now`, in ticks.
    pub fn coverage(&self, now: Tick) -> u64 {
        self.plan_end().map_or(0, |end| end.since(now))
    }

    /// Record the actual position for a tick, keeping the ring at `keep`
    /// entries.
    pub fn record(&mut self, step: Step, keep: usize) {
        self.history.push_back(step);
        while self.history.len() > keep {
            self.history.pop_front();
        }
    }

    /// History as a slice for the planner (oldest first).
    pub fn history_steps(&self) -> Vec<Step> {
        self.history.iter().copied().collect()
    }
}
