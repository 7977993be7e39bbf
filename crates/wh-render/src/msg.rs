//! The renderer's wire protocol: one JSON object per message.
//!
//! Frame semantics: the renderer buffers `draw_object` messages and flips
//! atomically on the next `clear_screen`.  Coordinates are in grid units
//! (fractional values allowed, for sub-tick interpolation), never pixels;
//! `draw_grid` carries the unit-to-pixel scale exactly once.

use serde::{Deserialize, Serialize};

// ── Geometry and color ────────────────────────────────────────────────────────

/// A point or extent in grid units.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }
}

/// RGBA; channels are 0–255 integers except alpha, which is 0–1.
/// Serializes as a bare `[r, g, b, a]` array.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8, pub f32);

impl Color {
    pub const STACK: Color = Color(255, 255, 0, 1.0); // yellow
    pub const MAINTENANCE: Color = Color(0, 255, 0, 1.0); // green
    pub const PICKUP: Color = Color(0, 0, 255, 1.0); // blue
    pub const OBSTACLE: Color = Color(128, 128, 128, 1.0); // gray
    pub const AGENT: Color = Color(255, 0, 0, 1.0); // red
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Everything the transport ever carries.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderMessage {
    /// Sent once at start (or on resize): the board size in grid units.
    ScreenSize { width: u32, height: u32 },

    /// Sent once after `ScreenSize`, and again whenever the unit changes.
    DrawGrid { unit_pixel_size: u32 },

    /// Begins a new frame; everything drawn since the previous one flips in.
    ClearScreen,

    /// One renderable rectangle, in grid units.
    DrawObject {
        coordinates: Vec2,
        size: Vec2,
        color: Color,
        id: String,
        text: Option<String>,
    },
}
