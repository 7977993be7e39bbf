//! `wh-sim` — the simulation core.
//!
//! One `Sim` owns everything mutable: the reservation table, the agents, the
//! inventory, and the order board.  The tick loop is the sole mutator; there
//! are no concurrent writers, so readers always observe consistent state.
//!
//! | Module       | Contents                                            |
//! |--------------|-----------------------------------------------------|
//! | [`agent`]    | `AgentPhase`, `AgentState`: the per-agent machine   |
//! | [`sim`]      | `Sim` and the tick loop                             |
//! | [`builder`]  | `SimBuilder` — validated construction               |
//! | [`observer`] | `SimObserver` callbacks and `FrameSnapshot`         |
//! | [`error`]    | `SimError`, `SimResult`                             |

pub mod agent;
pub mod builder;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{AgentPhase, AgentState};
pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{AgentView, FrameSnapshot, NoopObserver, SimObserver, StackView};
pub use sim::Sim;
