//! Open/assigned order bookkeeping.
//!
//! Orders sit on the board until an idle agent claims one; assignment is
//! atomic and exclusive — an order belongs to exactly one agent until it is
//! completed or abandoned back to the pool.

use std::collections::{HashMap, VecDeque};

use tracing::info;

use wh_core::{AgentId, Cell, StackId};
use wh_grid::Layout;

use crate::{Order, OrderError, OrderResult, Task};

#[derive(Default)]
pub struct OrderBoard {
    open: VecDeque<Order>,
    assigned: HashMap<AgentId, Order>,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    /// Orders counted against the generation backpressure cap.
    pub fn total_open(&self) -> usize {
        self.open.len() + self.assigned.len()
    }

    #[inline]
    pub fn current(&self, agent: AgentId) -> Option<&Order> {
        self.assigned.get(&agent)
    }

    #[inline]
    pub fn current_task(&self, agent: AgentId) -> Option<&Task> {
        self.assigned.get(&agent).and_then(Order::current_task)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Put a freshly generated order on the board.
    pub fn publish(&mut self, order: Order) {
        self.open.push_back(order);
    }

    /// Bind the best open order to `agent`, standing at `at`.
    ///
    /// "Best" is the order whose first task starts nearest by Manhattan
    /// distance; ties go to the earlier creation tick, then the lower id.
    /// Returns the bound order, or `None` when the board is empty.
    pub fn assign(
        &mut self,
        agent: AgentId,
        at: Cell,
        layout: &Layout,
    ) -> OrderResult<Option<&Order>> {
        if self.assigned.contains_key(&agent) {
            return Err(OrderError::AlreadyAssigned { agent });
        }
        let best = self
            .open
            .iter()
            .enumerate()
            .filter_map(|(i, order)| {
                let task = order.current_task()?;
                Some((at.manhattan(task.start_cell(layout)), order.created, order.id, i))
            })
            .min()
            .map(|(_, _, _, i)| i);
        let Some(index) = best else {
            return Ok(None);
        };
        let order = self.open.remove(index).expect("index from enumerate");
        info!(%agent, id = %order.id, "order assigned");
        Ok(Some(self.assigned.entry(agent).or_insert(order)))
    }

    /// Mark `agent`'s current task complete.  Returns the next task, or
    /// `None` when the order is finished (and removed).
    pub fn complete_task(&mut self, agent: AgentId) -> Option<Task> {
        let order = self.assigned.get_mut(&agent)?;
        if order.advance() {
            order.current_task().copied()
        } else {
            let order = self.assigned.remove(&agent).expect("present above");
            info!(%agent, id = %order.id, "order finished");
            None
        }
    }

    /// Return `agent`'s order to the pool (front, so it is retried soon).
    pub fn abandon(&mut self, agent: AgentId) {
        if let Some(order) = self.assigned.remove(&agent) {
            info!(%agent, id = %order.id, "order abandoned");
            self.open.push_front(order);
        }
    }

    /// Discard `agent`'s order entirely (its preconditions no longer hold).
    pub fn drop_order(&mut self, agent: AgentId) {
        if let Some(order) = self.assigned.remove(&agent) {
            info!(%agent, id = %order.id, "order dropped");
        }
    }

    /// Point the current `FreeUp` task of `agent` at a different destination
    /// stack.  Returns `false` if the agent's current task is not a FreeUp.
    pub fn redirect(&mut self, agent: AgentId, to: StackId) -> bool {
        if let Some(order) = self.assigned.get_mut(&agent)
            && let Some(Task::FreeUp { to: dest, .. }) = order.tasks.front_mut()
        {
            *dest = to;
            return true;
        }
        false
    }
}
