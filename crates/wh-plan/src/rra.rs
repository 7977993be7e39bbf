//! Resumable backward true-distance heuristic.
//!
//! # Design
//!
//! One instance per agent, rooted at the agent's current goal.  The structure
//! runs a uniform-cost expansion *backward* from the goal over the static
//! grid (time and other agents ignored) and pauses as soon as the queried
//! cell is settled.  A later query for an already-settled cell is a map
//! lookup; a query for a new cell resumes expansion where the last one
//! stopped.  Over the many replans an agent performs toward one goal, the
//! full expansion cost is paid at most once.
//!
//! Distances are exact shortest-path lengths, so the forward space-time
//! search gets an admissible *and* consistent heuristic — much tighter than
//! Manhattan distance around obstacle fields.
//!
//! Invalidated (rebuilt by the caller) whenever the goal changes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use wh_core::Cell;
use wh_grid::Grid;

/// Resumable backward search from a fixed goal cell.
pub struct TrueDistance {
    goal: Cell,
    /// Min-heap of `(distance, cell)`; `Reverse` turns `BinaryHeap` into a
    /// min-heap, and the `Cell` component breaks ties deterministically.
    open: BinaryHeap<Reverse<(u32, Cell)>>,
    /// Best known distance per cell.  Settled cells hold their final value.
    dist: HashMap<Cell, u32>,
    /// Cells whose distance is final.
    settled: HashMap<Cell, u32>,
}

impl TrueDistance {
    /// Root a new backward search at `goal`.
    ///
    /// The goal cell itself need not be passable (stacks and pickup zones are
    /// not); expansion only ever moves through passable cells, so the
    /// distances it produces are distances to *stand next to or at* the goal
    /// as the grid allows.
    pub fn new(goal: Cell) -> Self {
        let mut open = BinaryHeap::new();
        open.push(Reverse((0, goal)));
        let mut dist = HashMap::new();
        dist.insert(goal, 0);
        Self {
            goal,
            open,
            dist,
            settled: HashMap::new(),
        }
    }

    /// The goal this heuristic is rooted at.
    #[inline]
    pub fn goal(&self) -> Cell {
        self.goal
    }

    /// True shortest-path distance from `cell` to the goal, or `None` if the
    /// two are disconnected on the static grid.
    ///
    /// Resumes the backward expansion until `cell` is settled.
    pub fn distance(&mut self, grid: &Grid, cell: Cell) -> Option<u32> {
        if let Some(&d) = self.settled.get(&cell) {
            return Some(d);
        }

        while let Some(Reverse((d, current))) = self.open.pop() {
            // Stale heap entry: a shorter route settled this cell already.
            if let Some(&best) = self.settled.get(&current)
                && best <= d
            {
                continue;
            }
            self.settled.insert(current, d);

            for neighbor in grid.neighbors(current) {
                let candidate = d + 1;
                let known = self.dist.get(&neighbor).copied().unwrap_or(u32::MAX);
                if candidate < known {
                    self.dist.insert(neighbor, candidate);
                    self.open.push(Reverse((candidate, neighbor)));
                }
            }

            if current == cell {
                return Some(d);
            }
        }
        None
    }

    /// Number of settled cells — exposed for amortization tests.
    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }
}
