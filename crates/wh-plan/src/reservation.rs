//! The shared space-time occupancy index.
//!
//! # Why edges are reserved too
//!
//! Vertex reservations alone permit two agents to swap cells between `t` and
//! `t+1` — each moves into a cell the other is vacating, passing head-on.
//! Directed edge entries plus the reciprocal check in [`edge_free`]
//! (`ReservationTable::edge_free`) close that hole.
//!
//! # Ownership bookkeeping
//!
//! Every entry records its owning agent, and a per-agent index of installed
//! keys makes [`release`](ReservationTable::release) O(entries of that agent)
//! instead of a full-table sweep.  Commits are validate-then-install: a
//! conflicting path writes nothing.

use std::collections::HashMap;

use wh_core::{AgentId, Cell, Step, Tick};

use crate::{PlanError, PlanResult};

/// Key of a directed edge traversal: from, to, departure tick.
type EdgeKey = (Cell, Cell, Tick);

#[derive(Default)]
struct OwnedKeys {
    cells: Vec<(Cell, Tick)>,
    edges: Vec<EdgeKey>,
}

/// Index from `(cell, t)` and `(edge, t → t+1)` to the reserving agent.
#[derive(Default)]
pub struct ReservationTable {
    cells: HashMap<(Cell, Tick), AgentId>,
    edges: HashMap<EdgeKey, AgentId>,
    owned: HashMap<AgentId, OwnedKeys>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// `true` iff `(cell, t)` is unowned or owned by `agent` itself.
    #[inline]
    pub fn is_free(&self, agent: AgentId, cell: Cell, tick: Tick) -> bool {
        match self.cells.get(&(cell, tick)) {
            None => true,
            Some(&owner) => owner == agent,
        }
    }

    /// `true` iff moving `from → to` departing at `tick` collides with no
    /// other agent's edge reservation, in either direction.
    ///
    /// The reciprocal check (`to → from` at the same departure tick) is what
    /// forbids head-on swaps.
    #[inline]
    pub fn edge_free(&self, agent: AgentId, from: Cell, to: Cell, tick: Tick) -> bool {
        let foreign = |key: &EdgeKey| match self.edges.get(key) {
            None => false,
            Some(&owner) => owner != agent,
        };
        !foreign(&(from, to, tick)) && !foreign(&(to, from, tick))
    }

    /// The owner of `(cell, t)`, if any.
    #[inline]
    pub fn owner(&self, cell: Cell, tick: Tick) -> Option<AgentId> {
        self.cells.get(&(cell, tick)).copied()
    }

    /// Total number of live cell entries.
    pub fn cell_entries(&self) -> usize {
        self.cells.len()
    }

    /// Total number of live edge entries.
    pub fn edge_entries(&self) -> usize {
        self.edges.len()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Atomically install every `(cell, t)` and `(edge, t)` entry of `path`.
    ///
    /// The path must have strictly consecutive ticks.  On conflict nothing is
    /// written and the offending entry is reported.
    pub fn reserve(&mut self, agent: AgentId, path: &[Step]) -> PlanResult<()> {
        // Validate first: all entries must be free or already ours.
        for step in path {
            if let Some(&owner) = self.cells.get(&(step.cell, step.tick))
                && owner != agent
            {
                return Err(PlanError::ReservationConflict {
                    owner,
                    cell: step.cell,
                    tick: step.tick,
                });
            }
        }
        for pair in path.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            debug_assert_eq!(next.tick, prev.tick + 1, "path ticks must be consecutive");
            if prev.cell == next.cell {
                continue;
            }
            for key in [
                (prev.cell, next.cell, prev.tick),
                (next.cell, prev.cell, prev.tick),
            ] {
                if let Some(&owner) = self.edges.get(&key)
                    && owner != agent
                {
                    return Err(PlanError::ReservationConflict {
                        owner,
                        cell: key.0,
                        tick: key.2,
                    });
                }
            }
        }

        // Install.
        let owned = self.owned.entry(agent).or_default();
        for step in path {
            if self
                .cells
                .insert((step.cell, step.tick), agent)
                .is_none()
            {
                owned.cells.push((step.cell, step.tick));
            }
        }
        for pair in path.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.cell == next.cell {
                continue;
            }
            let key = (prev.cell, next.cell, prev.tick);
            if self.edges.insert(key, agent).is_none() {
                owned.edges.push(key);
            }
        }
        Ok(())
    }

    /// Remove every entry owned by `agent`.
    pub fn release(&mut self, agent: AgentId) {
        let Some(owned) = self.owned.remove(&agent) else {
            return;
        };
        for key in owned.cells {
            self.cells.remove(&key);
        }
        for key in owned.edges {
            self.edges.remove(&key);
        }
    }

    /// Drop all entries with `t < now`.
    pub fn advance(&mut self, now: Tick) {
        self.cells.retain(|&(_, t), _| t >= now);
        self.edges.retain(|&(_, _, t), _| t >= now);
        for owned in self.owned.values_mut() {
            owned.cells.retain(|&(_, t)| t >= now);
            owned.edges.retain(|&(_, _, t)| t >= now);
        }
    }
}
