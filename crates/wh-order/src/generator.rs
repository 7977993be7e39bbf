//! Random order production.
//!
//! Each generated order targets one pallet chosen uniformly from the union
//! of all stacked pallets' stacks and expands into the task sequence that
//! uncovers it: one `FreeUp` per blocking pallet above it (each routed to the
//! least-loaded other stack, counting moves the same order already plans),
//! then the move of the target pallet itself — `Pickup` + `Delivery` when the
//! destination is a pickup zone, a single stack-to-stack `FreeUp` otherwise.

use tracing::{debug, info};

use wh_core::{OrderId, PalletId, PickupId, SimRng, StackId, Tick};
use wh_grid::Layout;

use crate::{Inventory, Order, Task};

/// Produces orders until backpressure pushes back.
pub struct OrderGenerator {
    pickup_probability: f64,
    max_open: usize,
    next_order: u32,
}

impl OrderGenerator {
    pub fn new(pickup_probability: f64, max_open: usize) -> Self {
        Self {
            pickup_probability,
            max_open,
            next_order: 0,
        }
    }

    /// Generate one order, or `None` when the open-order cap is reached, no
    /// stacked pallet exists, or the rolled move cannot be placed yet (see
    /// [`expand_order`](OrderGenerator::expand_order)).
    pub fn generate(
        &mut self,
        inventory: &Inventory,
        layout: &Layout,
        open_orders: usize,
        rng: &mut SimRng,
        now: Tick,
    ) -> Option<Order> {
        if open_orders >= self.max_open {
            debug!(open_orders, cap = self.max_open, "order generation paused");
            return None;
        }

        let candidates = inventory.non_empty_stacks();
        let &source = rng.choose(&candidates)?;
        let contents = inventory.stack(source);
        let target = contents[rng.gen_range(0..contents.len())];

        let zone = rng
            .gen_bool(self.pickup_probability)
            .then(|| layout.pickups[rng.gen_range(0..layout.pickups.len())].id);

        self.expand_order(inventory, layout, source, target, zone, now)
    }

    /// Expand a move of `target` (resting on `source`) into an order.
    ///
    /// `zone` picks the destination: a pickup zone, or `None` for the
    /// least-loaded other stack.  Returns `None` when a stack destination is
    /// required — for an uncovering move, or for the final leg when no zone
    /// was given — but every other stack is full; the move cannot be placed
    /// yet, and the caller retries on a later tick.
    pub fn expand_order(
        &mut self,
        inventory: &Inventory,
        layout: &Layout,
        source: StackId,
        target: PalletId,
        zone: Option<PickupId>,
        now: Tick,
    ) -> Option<Order> {
        let contents = inventory.stack(source);
        let target_index = contents.iter().position(|&p| p == target)?;
        let blockers = &contents[target_index + 1..];

        // Pending FreeUp destinations count toward load so a tall uncovering
        // doesn't pile everything onto one stack.
        let mut pending = vec![0usize; layout.stacks.len()];
        let mut tasks = Vec::with_capacity(blockers.len() + 2);
        for &blocker in blockers.iter().rev() {
            let to = inventory.least_loaded_other(source, &pending)?;
            pending[to.index()] += 1;
            tasks.push(Task::FreeUp { pallet: blocker, from: source, to });
        }

        match zone {
            Some(zone) => {
                tasks.push(Task::Pickup { pallet: target, from: source });
                tasks.push(Task::Delivery { pallet: target, to: zone });
            }
            None => {
                let to = inventory.least_loaded_other(source, &pending)?;
                tasks.push(Task::FreeUp { pallet: target, from: source, to });
            }
        }

        let id = OrderId(self.next_order);
        self.next_order += 1;
        let order = Order::new(id, now, tasks);
        info!(%id, pallet = %target, legs = order.tasks.len(), "order generated");
        Some(order)
    }
}
