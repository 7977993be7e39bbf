//! `wh-core` — foundational types for the warehouse simulator.
//!
//! This crate is a dependency of every other `wh-*` crate.  It intentionally
//! has no `wh-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                         |
//! |------------|--------------------------------------------------|
//! | [`ids`]    | `AgentId`, `PalletId`, `StackId`, `PickupId`, `OrderId` |
//! | [`cell`]   | `Cell` grid coordinate, `Step` space-time step   |
//! | [`time`]   | `Tick`, `SimClock`                               |
//! | [`config`] | `SimConfig` and its environment loader           |
//! | [`rng`]    | `SimRng` — the single seeded random stream       |
//! | [`error`]  | `CoreError`, `CoreResult`                        |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod cell;
pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cell::{Cell, Step};
pub use config::SimConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, OrderId, PalletId, PickupId, StackId};
pub use rng::SimRng;
pub use time::{SimClock, Tick};
