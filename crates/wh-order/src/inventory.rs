//! Pallet arena and stack contents.
//!
//! Pallets are created onto stacks and destroyed by delivery; every pallet is
//! always in exactly one place.  `Inventory` is the single authority for
//! those places — grab/drop mutations go through it and are validated against
//! stack order, so the "only the top pallet moves" rule cannot be bypassed.

use tracing::debug;

use wh_core::{AgentId, PalletId, PickupId, SimRng, StackId};

use crate::{OrderError, OrderResult};

// ── PalletLocation ────────────────────────────────────────────────────────────

/// Where a pallet currently is.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PalletLocation {
    /// Resting on a stack (position within the stack is the stack's order).
    Stacked(StackId),
    /// In an agent's carry slot.
    Carried(AgentId),
    /// Dropped at a pickup zone; terminal.
    Delivered(PickupId),
}

// ── Inventory ─────────────────────────────────────────────────────────────────

/// All pallets and all stack contents.
///
/// `locations` is an arena indexed by `PalletId`; `stacks[s]` lists the
/// pallets on stack `s` bottom-first (top is `last()`).
pub struct Inventory {
    locations: Vec<PalletLocation>,
    stacks: Vec<Vec<PalletId>>,
    max_depth: usize,
}

impl Inventory {
    /// Empty stacks, no pallets.
    pub fn new(num_stacks: usize, max_depth: usize) -> Self {
        Self {
            locations: Vec::new(),
            stacks: vec![Vec::new(); num_stacks],
            max_depth,
        }
    }

    /// Seed every stack with 1 ..= `max_depth / 2` pallets.
    pub fn seed(num_stacks: usize, max_depth: usize, rng: &mut SimRng) -> Self {
        let mut inv = Self::new(num_stacks, max_depth);
        for stack in 0..num_stacks as u16 {
            let count = rng.gen_range(1..=(max_depth / 2).max(1));
            for _ in 0..count {
                inv.spawn_pallet(StackId(stack));
            }
        }
        inv
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn location(&self, pallet: PalletId) -> PalletLocation {
        self.locations[pallet.index()]
    }

    /// Pallets on `stack`, bottom-first.
    #[inline]
    pub fn stack(&self, stack: StackId) -> &[PalletId] {
        &self.stacks[stack.index()]
    }

    #[inline]
    pub fn top(&self, stack: StackId) -> Option<PalletId> {
        self.stacks[stack.index()].last().copied()
    }

    /// How many pallets sit above `pallet` in its stack.
    pub fn blockers_above(&self, pallet: PalletId) -> OrderResult<usize> {
        let PalletLocation::Stacked(stack) = self.location(pallet) else {
            return Err(OrderError::TaskInfeasible {
                pallet,
                reason: "not resting on any stack".into(),
            });
        };
        let contents = self.stack(stack);
        let depth = contents
            .iter()
            .position(|&p| p == pallet)
            .expect("location and stack contents agree");
        Ok(contents.len() - 1 - depth)
    }

    /// Ids of all stacks holding at least one pallet.
    pub fn non_empty_stacks(&self) -> Vec<StackId> {
        (0..self.stacks.len() as u16)
            .map(StackId)
            .filter(|&s| !self.stacks[s.index()].is_empty())
            .collect()
    }

    /// The least-loaded stack other than `exclude` with spare capacity,
    /// counting `pending` moves already directed at each stack.  Ties go to
    /// the lower id.
    pub fn least_loaded_other(&self, exclude: StackId, pending: &[usize]) -> Option<StackId> {
        (0..self.stacks.len() as u16)
            .map(StackId)
            .filter(|&s| s != exclude)
            .map(|s| (s, self.stacks[s.index()].len() + pending[s.index()]))
            .filter(|&(_, load)| load < self.max_depth)
            .min_by_key(|&(s, load)| (load, s))
            .map(|(s, _)| s)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    /// Counts for conservation checks: (stacked, carried, delivered).
    pub fn census(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for location in &self.locations {
            match location {
                PalletLocation::Stacked(_) => counts.0 += 1,
                PalletLocation::Carried(_) => counts.1 += 1,
                PalletLocation::Delivered(_) => counts.2 += 1,
            }
        }
        counts
    }

    /// Total pallets ever created (delivered ones included).
    pub fn pallet_count(&self) -> usize {
        self.locations.len()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Create a fresh pallet on top of `stack`.
    pub fn spawn_pallet(&mut self, stack: StackId) -> PalletId {
        let pallet = PalletId(self.locations.len() as u32);
        self.locations.push(PalletLocation::Stacked(stack));
        self.stacks[stack.index()].push(pallet);
        pallet
    }

    /// Lift `pallet` off the top of `stack` into `agent`'s carry slot.
    pub fn grab(&mut self, agent: AgentId, pallet: PalletId, stack: StackId) -> OrderResult<()> {
        match self.top(stack) {
            None => return Err(OrderError::EmptyStack(stack)),
            Some(top) if top != pallet => {
                return Err(OrderError::NotOnTop { pallet, stack });
            }
            Some(_) => {}
        }
        self.stacks[stack.index()].pop();
        self.locations[pallet.index()] = PalletLocation::Carried(agent);
        debug!(%agent, %pallet, %stack, "pallet grabbed");
        Ok(())
    }

    /// Drop the pallet `agent` carries onto `stack`.
    pub fn drop_on_stack(&mut self, agent: AgentId, pallet: PalletId, stack: StackId) -> OrderResult<()> {
        if self.location(pallet) != PalletLocation::Carried(agent) {
            return Err(OrderError::NotCarrying(agent));
        }
        if self.stacks[stack.index()].len() >= self.max_depth {
            return Err(OrderError::StackFull(stack));
        }
        self.stacks[stack.index()].push(pallet);
        self.locations[pallet.index()] = PalletLocation::Stacked(stack);
        debug!(%agent, %pallet, %stack, "pallet dropped on stack");
        Ok(())
    }

    /// Deliver the pallet `agent` carries to `zone`; the pallet leaves play.
    pub fn deliver(&mut self, agent: AgentId, pallet: PalletId, zone: PickupId) -> OrderResult<()> {
        if self.location(pallet) != PalletLocation::Carried(agent) {
            return Err(OrderError::NotCarrying(agent));
        }
        self.locations[pallet.index()] = PalletLocation::Delivered(zone);
        debug!(%agent, %pallet, %zone, "pallet delivered");
        Ok(())
    }

    /// Top stacks below half capacity back up with 1–2 fresh pallets.
    pub fn refill(&mut self, rng: &mut SimRng) -> usize {
        let mut spawned = 0;
        for stack in 0..self.stacks.len() as u16 {
            if self.stacks[stack as usize].len() < self.max_depth / 2 {
                for _ in 0..rng.gen_range(1..=2) {
                    self.spawn_pallet(StackId(stack));
                    spawned += 1;
                }
            }
        }
        spawned
    }
}
