//! `wh-plan` — cooperative space-time path planning.
//!
//! Many agents share one grid; each plans a bounded-horizon path that
//! respects the reservations of everyone who planned before it within the
//! same tick.
//!
//! | Module          | Contents                                            |
//! |-----------------|-----------------------------------------------------|
//! | [`reservation`] | `(cell, t)` / `(edge, t)` → agent occupancy index   |
//! | [`rra`]         | Resumable backward true-distance heuristic          |
//! | [`astar`]       | Windowed space-time A* with plan-in-the-past anchor |
//! | [`error`]       | `PlanError`, `PlanResult`                           |
//!
//! The crate is pure: no tick loop, no agent lifecycle, no I/O.  The caller
//! owns replan scheduling and commits returned paths to the table itself.

pub mod astar;
pub mod error;
pub mod reservation;
pub mod rra;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use astar::{plan_window, plan_with_history};
pub use error::{PlanError, PlanResult};
pub use reservation::ReservationTable;
pub use rra::TrueDistance;
