//! Unit tests for wh-render.

use serde_json::json;

use wh_core::{AgentId, Cell, PalletId, PickupId, StackId, Tick};
use wh_grid::{CellKind, Grid, Layout, PickupSite, StackSite};
use wh_sim::{AgentPhase, AgentView, FrameSnapshot, StackView};

use crate::msg::{Color, RenderMessage, Vec2};
use crate::{frame_messages, preamble};

fn small_layout() -> Layout {
    let mut grid = Grid::new(6, 4);
    let stack_cell = Cell::new(1, 0);
    grid.set_kind(stack_cell, CellKind::Stack(StackId(0)));
    let pickup_cell = Cell::new(4, 0);
    grid.set_kind(pickup_cell, CellKind::PickupZone(PickupId(0)));
    grid.set_kind(Cell::new(3, 2), CellKind::Obstacle);
    Layout {
        stacks: vec![StackSite {
            id: StackId(0),
            cell: stack_cell,
            service: grid.service_cell(stack_cell).unwrap(),
        }],
        pickups: vec![PickupSite {
            id: PickupId(0),
            cell: pickup_cell,
            service: grid.service_cell(pickup_cell).unwrap(),
        }],
        slots: vec![],
        grid,
    }
}

fn small_frame() -> FrameSnapshot {
    FrameSnapshot {
        tick: Tick(3),
        agents: vec![AgentView {
            id: AgentId(0),
            pos: Cell::new(2, 2),
            carrying: Some(PalletId(7)),
            phase: AgentPhase::MovingToTarget,
        }],
        stacks: vec![StackView {
            id: StackId(0),
            cell: Cell::new(1, 0),
            pallets: vec![PalletId(1), PalletId(2)],
        }],
        delivered: 0,
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod wire_tests {
    use super::*;

    #[test]
    fn screen_size_shape() {
        let value = serde_json::to_value(RenderMessage::ScreenSize { width: 18, height: 6 }).unwrap();
        assert_eq!(value, json!({"type": "screen_size", "width": 18, "height": 6}));
    }

    #[test]
    fn draw_grid_shape() {
        let value = serde_json::to_value(RenderMessage::DrawGrid { unit_pixel_size: 30 }).unwrap();
        assert_eq!(value, json!({"type": "draw_grid", "unit_pixel_size": 30}));
    }

    #[test]
    fn clear_screen_shape() {
        let value = serde_json::to_value(RenderMessage::ClearScreen).unwrap();
        assert_eq!(value, json!({"type": "clear_screen"}));
    }

    #[test]
    fn draw_object_shape() {
        let message = RenderMessage::DrawObject {
            coordinates: Vec2::new(1.5, 2.0),
            size: Vec2::new(1.0, 1.0),
            color: Color(255, 0, 0, 1.0),
            id: "agent-0".into(),
            text: None,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "draw_object",
                "coordinates": {"x": 1.5, "y": 2.0},
                "size": {"x": 1.0, "y": 1.0},
                "color": [255, 0, 0, 1.0],
                "id": "agent-0",
                "text": null,
            })
        );
    }

    #[test]
    fn colors_are_rgba_arrays_with_unit_alpha() {
        let value = serde_json::to_value(Color::STACK).unwrap();
        assert_eq!(value, json!([255, 255, 0, 1.0]));
    }

    #[test]
    fn messages_round_trip() {
        let original = RenderMessage::DrawObject {
            coordinates: Vec2::new(0.25, 3.0),
            size: Vec2::new(1.0, 1.0),
            color: Color::PICKUP,
            id: "pickup-0".into(),
            text: Some("2".into()),
        };
        let text = serde_json::to_string(&original).unwrap();
        let parsed: RenderMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }
}

// ── Frame composition ─────────────────────────────────────────────────────────

#[cfg(test)]
mod frame_tests {
    use super::*;

    #[test]
    fn preamble_is_screen_then_grid() {
        let layout = small_layout();
        let messages = preamble(&layout);
        assert!(matches!(
            messages[0],
            RenderMessage::ScreenSize { width: 6, height: 4 }
        ));
        assert!(matches!(messages[1], RenderMessage::DrawGrid { .. }));
    }

    #[test]
    fn frame_starts_with_clear_screen() {
        let layout = small_layout();
        let messages = frame_messages(&layout, &small_frame());
        assert_eq!(messages[0], RenderMessage::ClearScreen);
        assert_eq!(
            messages.iter().filter(|m| **m == RenderMessage::ClearScreen).count(),
            1,
            "exactly one frame flip per frame"
        );
    }

    #[test]
    fn frame_contains_every_scene_object() {
        let layout = small_layout();
        let messages = frame_messages(&layout, &small_frame());
        let ids: Vec<&str> = messages
            .iter()
            .filter_map(|m| match m {
                RenderMessage::DrawObject { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert!(ids.contains(&"stack-0"));
        assert!(ids.contains(&"pickup-0"));
        assert!(ids.contains(&"agent-0"));
        assert!(ids.contains(&"pillar-3-2"));
    }

    #[test]
    fn stack_text_is_pallet_count_and_agent_text_is_cargo() {
        let layout = small_layout();
        let messages = frame_messages(&layout, &small_frame());
        let text_of = |wanted: &str| {
            messages.iter().find_map(|m| match m {
                RenderMessage::DrawObject { id, text, .. } if id == wanted => Some(text.clone()),
                _ => None,
            })
        };
        assert_eq!(text_of("stack-0"), Some(Some("2".into())));
        assert_eq!(text_of("agent-0"), Some(Some("p7".into())));
    }
}

// ── Queue and transport ───────────────────────────────────────────────────────

#[cfg(test)]
mod sink_tests {
    use super::*;
    use crate::sink::{FrameQueue, FrameSink, TcpSink};
    use std::io::BufRead;
    use std::net::TcpListener;
    use std::time::Duration;

    fn frame(id: u32) -> Vec<RenderMessage> {
        vec![RenderMessage::DrawGrid { unit_pixel_size: id }]
    }

    #[test]
    fn full_queue_drops_the_oldest_frame() {
        let queue = FrameQueue::new(2);
        queue.push(frame(0));
        queue.push(frame(1));
        queue.push(frame(2));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
        // The survivor at the front is frame 1, not frame 0.
        let front = queue.pop(Duration::from_millis(10)).unwrap();
        assert_eq!(front, frame(1));
    }

    #[test]
    fn closed_empty_queue_returns_none() {
        let queue = FrameQueue::new(2);
        queue.close();
        assert!(queue.pop(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn frames_arrive_as_json_lines_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut sink = TcpSink::connect(&addr, 8).unwrap();
        let (stream, _) = listener.accept().unwrap();

        sink.submit(vec![
            RenderMessage::ClearScreen,
            RenderMessage::DrawGrid { unit_pixel_size: 30 },
        ]);
        drop(sink); // close + join flushes the queue

        let reader = std::io::BufReader::new(stream);
        let lines: Vec<String> = reader.lines().map_while(Result::ok).collect();
        assert_eq!(lines.len(), 2);
        let first: RenderMessage = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first, RenderMessage::ClearScreen);
        let second: RenderMessage = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second, RenderMessage::DrawGrid { unit_pixel_size: 30 });
    }
}
