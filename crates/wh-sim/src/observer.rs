//! Simulation observer trait and the per-tick frame snapshot.

use wh_core::{AgentId, Cell, PalletId, StackId, Tick};

use crate::AgentPhase;

// ── FrameSnapshot ─────────────────────────────────────────────────────────────

/// One agent as seen by a frame consumer.
#[derive(Clone, Debug)]
pub struct AgentView {
    pub id: AgentId,
    pub pos: Cell,
    pub carrying: Option<PalletId>,
    pub phase: AgentPhase,
}

/// One stack's contents as seen by a frame consumer.
#[derive(Clone, Debug)]
pub struct StackView {
    pub id: StackId,
    pub cell: Cell,
    /// Bottom-first.
    pub pallets: Vec<PalletId>,
}

/// The dynamic scene at the end of a tick — everything a renderer needs
/// beyond the static layout.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub tick: Tick,
    pub agents: Vec<AgentView>,
    pub stacks: Vec<StackView>,
    /// Pallets delivered so far.
    pub delivered: usize,
}

// ── SimObserver ───────────────────────────────────────────────────────────────

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points in the
/// tick loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  A frame consumer must never block: the
/// simulation calls [`on_frame`](SimObserver::on_frame) synchronously.
pub trait SimObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after positions advanced, with the end-of-tick scene.
    fn on_frame(&mut self, _frame: &FrameSnapshot) {}

    /// Called at the end of each tick.  `replanned` is how many agents ran a
    /// path search this tick.
    fn on_tick_end(&mut self, _tick: Tick, _replanned: usize) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
