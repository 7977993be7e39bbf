//! `wh-grid` — the static warehouse floor.
//!
//! | Module     | Contents                                             |
//! |------------|------------------------------------------------------|
//! | [`grid`]   | `CellKind`, `Grid`: bounds, passability, neighbors   |
//! | [`layout`] | Procedural placement of slots, stacks, zones, walls  |
//! | [`error`]  | `GridError`, `GridResult`                            |
//!
//! The grid is immutable after layout generation; every mutable quantity of
//! the simulation (agents, pallets, reservations) lives elsewhere and refers
//! to cells by value.

pub mod error;
pub mod grid;
pub mod layout;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{GridError, GridResult};
pub use grid::{CellKind, Grid, MOVE_ORDER};
pub use layout::{Layout, PickupSite, StackSite};
