//! Windowed space-time A* — the per-agent path search.
//!
//! # Search space
//!
//! Nodes are `(cell, tick)` pairs.  From `(c, t)` the agent may move to any
//! passable 4-neighbor or stay put, arriving at `t + 1`; every step costs 1,
//! waits included.  A successor is only generated when the reservation table
//! shows the target cell free at `t + 1` and the traversed edge free at `t`
//! (in both directions, so head-on swaps are pruned at generation time).
//!
//! Because every step costs exactly 1, a node's g-value is determined by its
//! tick; no g-map or reopen handling is needed.
//!
//! # Termination
//!
//! 1. The goal cell is popped: reconstruct and return.
//! 2. The open set drains with the horizon reached: return the partial path
//!    to the best frontier node — minimal heuristic, ties to the longer
//!    path, then the smaller cell.
//! 3. The open set drains without the search ever leaving its anchor: the
//!    agent is boxed in, `Unreachable`.
//!
//! Successful and partial paths are tail-padded with waits at their final
//! cell up to the window end, stopping early only where another agent
//! already owns a later slot, so a committed plan covers the whole window.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, trace};

use wh_core::{AgentId, Cell, Step, Tick};
use wh_grid::Grid;

use crate::{PlanError, PlanResult, ReservationTable, TrueDistance};

// ── Open-set entry ────────────────────────────────────────────────────────────

#[derive(PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    /// Depth from the anchor, in ticks.
    g: u64,
    cell: Cell,
    tick: Tick,
}

impl OpenEntry {
    #[inline]
    fn h(&self) -> u32 {
        self.f - self.g as u32
    }
}

/// `BinaryHeap` is a max-heap, so "greater" means "expanded first": lower f,
/// then deeper (higher g), then smaller cell.
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then(self.g.cmp(&other.g))
            .then(other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ── Window search ─────────────────────────────────────────────────────────────

/// Plan a path for `agent` from `start` toward `goal`, covering at most
/// `window` ticks beyond the anchor.
///
/// The returned path begins exactly at `start` and has strictly consecutive
/// ticks.  The caller commits it to the table; the search itself only reads.
pub fn plan_window(
    grid: &Grid,
    table: &ReservationTable,
    heuristic: &mut TrueDistance,
    agent: AgentId,
    start: Step,
    goal: Cell,
    window: u64,
) -> PlanResult<Vec<Step>> {
    let horizon = start.tick + window;
    let unreachable = || PlanError::Unreachable {
        agent,
        start: start.cell,
        goal,
        tick: start.tick,
    };

    let h0 = heuristic
        .distance(grid, start.cell)
        .ok_or_else(unreachable)?;

    let mut open = BinaryHeap::new();
    open.push(OpenEntry { f: h0, g: 0, cell: start.cell, tick: start.tick });

    // Doubles as the "seen" set: a node gets exactly one parent because its
    // g-value is fixed by its tick.
    let mut came_from: HashMap<(Cell, Tick), (Cell, Tick)> = HashMap::new();

    // Best frontier node so far: (h, depth, cell).
    let mut best: Option<(u32, u64, Cell, Tick)> = None;

    while let Some(entry) = open.pop() {
        let (cell, tick) = (entry.cell, entry.tick);

        if cell == goal {
            let mut path = reconstruct(&came_from, cell, tick, start);
            pad_with_waits(&mut path, table, agent, horizon);
            trace!(%agent, %goal, len = path.len(), "goal reached");
            return Ok(path);
        }

        let better = match best {
            None => true,
            Some((bh, bg, bc, _)) => (entry.h(), Reverse(entry.g), cell) < (bh, Reverse(bg), bc),
        };
        if better {
            best = Some((entry.h(), entry.g, cell, tick));
        }

        if tick >= horizon {
            continue;
        }
        let next_tick = tick + 1;
        for target in grid.moves(cell) {
            if came_from.contains_key(&(target, next_tick)) {
                continue;
            }
            if !table.is_free(agent, target, next_tick) {
                continue;
            }
            if target != cell && !table.edge_free(agent, cell, target, tick) {
                continue;
            }
            let Some(h) = heuristic.distance(grid, target) else {
                continue;
            };
            came_from.insert((target, next_tick), (cell, tick));
            let g = next_tick - start.tick;
            open.push(OpenEntry { f: g as u32 + h, g, cell: target, tick: next_tick });
        }
    }

    // Window exhausted without touching the goal: commit to the best partial.
    match best {
        Some((_, depth, cell, tick)) if depth > 0 => {
            let mut path = reconstruct(&came_from, cell, tick, start);
            pad_with_waits(&mut path, table, agent, horizon);
            debug!(%agent, %goal, end = %cell, "window exhausted, partial path");
            Ok(path)
        }
        _ => Err(unreachable()),
    }
}

fn reconstruct(
    came_from: &HashMap<(Cell, Tick), (Cell, Tick)>,
    cell: Cell,
    tick: Tick,
    start: Step,
) -> Vec<Step> {
    let mut path = vec![Step::new(cell, tick)];
    let mut current = (cell, tick);
    while current != (start.cell, start.tick) {
        current = came_from[&current];
        path.push(Step::new(current.0, current.1));
    }
    path.reverse();
    path
}

/// Extend `path` with waits at its final cell up to `horizon`, stopping at
/// the first slot another agent already owns.
fn pad_with_waits(path: &mut Vec<Step>, table: &ReservationTable, agent: AgentId, horizon: Tick) {
    let last = *path.last().expect("path is never empty");
    let mut tick = last.tick;
    while tick < horizon {
        tick = tick + 1;
        if !table.is_free(agent, last.cell, tick) {
            break;
        }
        path.push(Step::new(last.cell, tick));
    }
}

// ── Plan-in-the-past anchoring ────────────────────────────────────────────────

/// Plan for `agent` with the anchor pushed `k` ticks into the past.
///
/// `history` holds the agent's recent actual positions in ascending tick
/// order, ending at (`now`, current cell).  Anchoring at `now − k` keeps the
/// agent's occupied pre-history inside its own reservations, which gives
/// replans a recovery buffer.  The first `k` steps of the result must match
/// what actually happened; when they cannot (another agent has since claimed
/// one of those slots), the plan falls back to anchoring at `now` with a
/// forced wait at the current cell.
pub fn plan_with_history(
    grid: &Grid,
    table: &ReservationTable,
    heuristic: &mut TrueDistance,
    agent: AgentId,
    now: Tick,
    k: u64,
    history: &[Step],
    goal: Cell,
    window: u64,
) -> PlanResult<Vec<Step>> {
    let current = history
        .last()
        .expect("history always holds the current position");
    debug_assert_eq!(current.tick, now);

    // Find the anchor step in history: `now - k`, clamped to what we have.
    let anchor = history
        .iter()
        .find(|s| s.tick + k >= now)
        .copied()
        .unwrap_or(*current);

    if anchor.tick < now {
        match plan_window(grid, table, heuristic, agent, anchor, goal, window) {
            Ok(path) => {
                let replay = &history[history.len() - ((now - anchor.tick) as usize + 1)..];
                let matches = replay
                    .iter()
                    .zip(path.iter())
                    .all(|(actual, planned)| actual == planned);
                if matches {
                    return Ok(path);
                }
                debug!(%agent, %now, "planned past diverges from history, re-anchoring at now");
            }
            // The pre-history slot may have been claimed since; the present
            // anchor can still work.
            Err(PlanError::Unreachable { .. }) => {
                debug!(%agent, %now, "past anchor is boxed in, re-anchoring at now");
            }
            Err(e) => return Err(e),
        }

        // Fallback: anchor at `now` with a forced wait at the current cell,
        // so the agent holds position while the recovered plan settles.
        let wait = Step::new(current.cell, now + 1);
        if window > 1 && table.is_free(agent, wait.cell, wait.tick) {
            let mut path = plan_window(grid, table, heuristic, agent, wait, goal, window - 1)?;
            path.insert(0, *current);
            return Ok(path);
        }
    }

    plan_window(grid, table, heuristic, agent, *current, goal, window)
}
