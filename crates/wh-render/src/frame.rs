//! Composing render frames from simulation snapshots.

use wh_core::Cell;
use wh_grid::{CellKind, Layout};
use wh_sim::{FrameSnapshot, SimObserver};

use crate::msg::{Color, RenderMessage, Vec2};
use crate::sink::FrameSink;

/// Default unit scale handed to the renderer.
const UNIT_PIXEL_SIZE: u32 = 30;

fn unit_object(cell: Cell, color: Color, id: String, text: Option<String>) -> RenderMessage {
    RenderMessage::DrawObject {
        coordinates: Vec2::new(cell.x as f64, cell.y as f64),
        size: Vec2::new(1.0, 1.0),
        color,
        id,
        text,
    }
}

/// The one-time messages: board dimensions and unit scale.
pub fn preamble(layout: &Layout) -> Vec<RenderMessage> {
    vec![
        RenderMessage::ScreenSize {
            width: layout.grid.width() as u32,
            height: layout.grid.height() as u32,
        },
        RenderMessage::DrawGrid { unit_pixel_size: UNIT_PIXEL_SIZE },
    ]
}

/// One full frame: `clear_screen`, the static floor, then the dynamic scene.
///
/// Stacks carry their pallet count as text; agents carry the id of the
/// pallet in their slot, if any.
pub fn frame_messages(layout: &Layout, frame: &FrameSnapshot) -> Vec<RenderMessage> {
    let mut messages = vec![RenderMessage::ClearScreen];

    for cell in layout.grid.cells() {
        match layout.grid.kind(cell) {
            CellKind::Obstacle => messages.push(unit_object(
                cell,
                Color::OBSTACLE,
                format!("pillar-{}-{}", cell.x, cell.y),
                None,
            )),
            CellKind::MaintenanceSlot => messages.push(unit_object(
                cell,
                Color::MAINTENANCE,
                format!("slot-{}-{}", cell.x, cell.y),
                None,
            )),
            _ => {}
        }
    }

    for stack in &frame.stacks {
        messages.push(unit_object(
            stack.cell,
            Color::STACK,
            format!("stack-{}", stack.id.0),
            Some(stack.pallets.len().to_string()),
        ));
    }
    for pickup in &layout.pickups {
        messages.push(unit_object(
            pickup.cell,
            Color::PICKUP,
            format!("pickup-{}", pickup.id.0),
            None,
        ));
    }
    for agent in &frame.agents {
        messages.push(unit_object(
            agent.pos,
            Color::AGENT,
            format!("agent-{}", agent.id.0),
            agent.carrying.map(|p| format!("p{}", p.0)),
        ));
    }

    messages
}

// ── Observer bridge ───────────────────────────────────────────────────────────

/// A [`SimObserver`] that composes every snapshot into protocol messages and
/// hands them to a [`FrameSink`].
///
/// The preamble travels with the first frame.  Sink errors never reach the
/// simulation; a lost frame is a rendering concern only.
pub struct RenderObserver<S: FrameSink> {
    sink: S,
    layout: Layout,
    sent_preamble: bool,
}

impl<S: FrameSink> RenderObserver<S> {
    pub fn new(sink: S, layout: Layout) -> Self {
        Self { sink, layout, sent_preamble: false }
    }

    /// Unwrap the sink (e.g. to read drop counters after the run).
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: FrameSink> SimObserver for RenderObserver<S> {
    fn on_frame(&mut self, frame: &FrameSnapshot) {
        let mut messages = Vec::new();
        if !self.sent_preamble {
            messages.extend(preamble(&self.layout));
            self.sent_preamble = true;
        }
        messages.extend(frame_messages(&self.layout, frame));
        self.sink.submit(messages);
    }
}
