//! `wh-render` — feeding the (external) renderer.
//!
//! The simulation knows nothing about pixels; it hands a
//! [`FrameSnapshot`][wh_sim::FrameSnapshot] to an observer each tick.  This
//! crate turns snapshots into the renderer's JSON message protocol and ships
//! them over a transport the simulation never blocks on:
//!
//! | Module     | Contents                                             |
//! |------------|------------------------------------------------------|
//! | [`msg`]    | The wire message model (serde, one JSON object each) |
//! | [`frame`]  | Snapshot → message-list composition                  |
//! | [`sink`]   | Bounded drop-oldest frame queue + TCP writer thread  |
//! | [`error`]  | `RenderError`, `RenderResult`                        |
//!
//! A slow or dead renderer costs frames, never simulation progress.

pub mod error;
pub mod frame;
pub mod msg;
pub mod sink;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{RenderError, RenderResult};
pub use frame::{RenderObserver, frame_messages, preamble};
pub use msg::{Color, RenderMessage, Vec2};
pub use sink::{FrameSink, TcpSink};
