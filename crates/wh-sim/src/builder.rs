//! Fluent builder for constructing a [`Sim`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use wh_core::{AgentId, SimConfig, SimRng};
use wh_grid::Layout;
use wh_order::Inventory;

use crate::{AgentState, Sim, SimError, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required input
///
/// - [`SimConfig`] — dimensions, agent count, window sizes, seed, …
///
/// # Optional inputs (have defaults)
///
/// | Method          | Default                                            |
/// |-----------------|----------------------------------------------------|
/// | `.layout(l)`    | Generated from a placement stream off the seed     |
/// | `.inventory(i)` | Stacks seeded from the same placement stream       |
/// | `.stop_flag(f)` | A fresh, never-raised flag                         |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(config).build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config: SimConfig,
    layout: Option<Layout>,
    inventory: Option<Inventory>,
    stop: Option<Arc<AtomicBool>>,
}

impl SimBuilder {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            layout: None,
            inventory: None,
            stop: None,
        }
    }

    /// Supply a hand-built floor instead of generating one.
    ///
    /// Must provide at least `config.num_agents` maintenance slots; agents
    /// start on (and idle back to) `slots[agent.index()]`.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Supply explicit stack contents instead of seeding them randomly.
    /// Must match the layout's stack count.
    pub fn inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Share a shutdown flag; raising it stops `run` at the tick boundary.
    pub fn stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Validate inputs, generate whatever was not supplied, and return a
    /// ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim> {
        self.config.validate()?;
        let mut rng = SimRng::new(self.config.seed);
        // Placement draws come from a derived child stream, so map knobs
        // (obstacle count, cluster shapes) never shift the order stream.
        let mut placement_rng = rng.child(1);

        let layout = match self.layout {
            Some(layout) => layout,
            None => Layout::generate(&self.config, &mut placement_rng)?,
        };
        if layout.slots.len() < self.config.num_agents {
            return Err(SimError::CountMismatch {
                expected: self.config.num_agents,
                got: layout.slots.len(),
                what: "maintenance slots",
            });
        }

        let inventory = match self.inventory {
            Some(inventory) => {
                if inventory.stack_count() != layout.stacks.len() {
                    return Err(SimError::CountMismatch {
                        expected: layout.stacks.len(),
                        got: inventory.stack_count(),
                        what: "inventory stacks",
                    });
                }
                inventory
            }
            None => Inventory::seed(
                layout.stacks.len(),
                self.config.max_stack_depth,
                &mut placement_rng,
            ),
        };

        let agents = (0..self.config.num_agents)
            .map(|i| AgentState::new(AgentId(i as u32), layout.slots[i]))
            .collect();

        Ok(Sim::assemble(
            self.config,
            layout,
            inventory,
            agents,
            rng,
            self.stop.unwrap_or_default(),
        ))
    }
}
