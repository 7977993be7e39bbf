//! Integration tests for wh-sim.

use wh_core::{Cell, PalletId, SimConfig, StackId, Tick};
use wh_grid::{CellKind, Grid, Layout, PickupSite, StackSite};
use wh_order::Inventory;

use crate::{FrameSnapshot, NoopObserver, SimBuilder, SimObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn batch_config(seed: u64) -> SimConfig {
    SimConfig {
        grid_width: 14,
        grid_height: 10,
        num_agents: 3,
        num_stacks: 3,
        num_pickups: 2,
        num_obstacles: 2,
        planning_window: 12,
        reservation_horizon: 24,
        replan_anchor: 1,
        max_replan_failures: 5,
        tick_period_ms: 0,
        total_ticks: 0,
        seed,
        pickup_probability: 0.7,
        max_open_orders: 8,
        max_stack_depth: 6,
        render_url: None,
    }
}

/// Hand-built floor: one stack at (1,0), one pickup zone at (5,0), two
/// maintenance slots on the far row.
fn two_site_layout() -> Layout {
    let mut grid = Grid::new(7, 5);
    let stack_cell = Cell::new(1, 0);
    grid.set_kind(stack_cell, CellKind::Stack(StackId(0)));
    let pickup_cell = Cell::new(5, 0);
    grid.set_kind(pickup_cell, CellKind::PickupZone(wh_core::PickupId(0)));
    let slots = vec![Cell::new(0, 4), Cell::new(6, 4)];
    for &slot in &slots {
        grid.set_kind(slot, CellKind::MaintenanceSlot);
    }
    let stacks = vec![StackSite {
        id: StackId(0),
        cell: stack_cell,
        service: grid.service_cell(stack_cell).unwrap(),
    }];
    let pickups = vec![PickupSite {
        id: wh_core::PickupId(0),
        cell: pickup_cell,
        service: grid.service_cell(pickup_cell).unwrap(),
    }];
    Layout { grid, stacks, pickups, slots }
}

/// Observer that keeps every frame.
#[derive(Default)]
struct FrameRecorder {
    frames: Vec<FrameSnapshot>,
}

impl SimObserver for FrameRecorder {
    fn on_frame(&mut self, frame: &FrameSnapshot) {
        self.frames.push(frame.clone());
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_from_config_alone() {
        let sim = SimBuilder::new(batch_config(42)).build().unwrap();
        assert_eq!(sim.agents.len(), 3);
        assert_eq!(sim.layout.stacks.len(), 3);
        assert!(sim.inventory.pallet_count() > 0);
        for agent in &sim.agents {
            assert_eq!(agent.pos, agent.home);
        }
    }

    #[test]
    fn too_few_slots_is_an_error() {
        let mut config = batch_config(1);
        config.num_agents = 4; // layout below has 2 slots
        config.num_stacks = 1;
        config.num_pickups = 1;
        let result = SimBuilder::new(config).layout(two_site_layout()).build();
        assert!(result.is_err());
    }

    #[test]
    fn inventory_stack_count_must_match_layout() {
        let mut config = batch_config(1);
        config.num_agents = 2;
        config.num_stacks = 1;
        config.num_pickups = 1;
        let result = SimBuilder::new(config)
            .layout(two_site_layout())
            .inventory(Inventory::new(3, 6))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = batch_config(1);
        config.reservation_horizon = 4; // < planning_window
        assert!(SimBuilder::new(config).build().is_err());
    }
}

// ── Run control ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn run_ticks_advances_clock() {
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        sim.run_ticks(5, &mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(5));
        sim.run_ticks(3, &mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(8));
    }

    #[test]
    fn run_honors_total_ticks() {
        let mut config = batch_config(42);
        config.total_ticks = 6;
        let mut sim = SimBuilder::new(config).build().unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(6));
    }

    #[test]
    fn raised_stop_flag_halts_before_the_first_tick() {
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        sim.stop_flag().store(true, Ordering::Relaxed);
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(0));
    }

    #[test]
    fn observer_sees_every_tick() {
        struct Counter {
            starts: usize,
            frames: usize,
            ends: usize,
        }
        impl SimObserver for Counter {
            fn on_tick_start(&mut self, _t: Tick) {
                self.starts += 1;
            }
            fn on_frame(&mut self, _f: &FrameSnapshot) {
                self.frames += 1;
            }
            fn on_tick_end(&mut self, _t: Tick, _r: usize) {
                self.ends += 1;
            }
        }
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        let mut counter = Counter { starts: 0, frames: 0, ends: 0 };
        sim.run_ticks(7, &mut counter).unwrap();
        assert_eq!((counter.starts, counter.frames, counter.ends), (7, 7, 7));
    }

    #[test]
    fn history_ring_stays_bounded() {
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        sim.run_ticks(20, &mut NoopObserver).unwrap();
        let keep = sim.config.replan_anchor as usize + 1;
        for agent in &sim.agents {
            assert!(agent.history.len() <= keep);
            assert_eq!(agent.history.back().unwrap().tick, Tick(20));
            assert_eq!(agent.history.back().unwrap().cell, agent.pos);
        }
    }
}

// ── Safety invariants over full runs ──────────────────────────────────────────

#[cfg(test)]
mod invariant_tests {
    use super::*;

    const RUN_TICKS: u64 = 300;

    fn recorded_run(seed: u64) -> (crate::Sim, FrameRecorder) {
        let mut sim = SimBuilder::new(batch_config(seed)).build().unwrap();
        let mut recorder = FrameRecorder::default();
        sim.run_ticks(RUN_TICKS, &mut recorder).unwrap();
        (sim, recorder)
    }

    #[test]
    fn no_vertex_collisions() {
        for seed in [42, 7, 1234] {
            let (_, recorder) = recorded_run(seed);
            for frame in &recorder.frames {
                let mut cells: Vec<Cell> = frame.agents.iter().map(|a| a.pos).collect();
                cells.sort();
                let before = cells.len();
                cells.dedup();
                assert_eq!(cells.len(), before, "seed {seed}: two agents share a cell at {}", frame.tick);
            }
        }
    }

    #[test]
    fn no_edge_swaps() {
        for seed in [42, 7, 1234] {
            let (_, recorder) = recorded_run(seed);
            for pair in recorder.frames.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                for a in &prev.agents {
                    for b in &prev.agents {
                        if a.id >= b.id {
                            continue;
                        }
                        let a_next = next.agents[a.id.index()].pos;
                        let b_next = next.agents[b.id.index()].pos;
                        assert!(
                            !(a_next == b.pos && b_next == a.pos && a.pos != b.pos),
                            "seed {seed}: {} and {} swapped cells into {}",
                            a.id,
                            b.id,
                            next.tick,
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn agents_only_stand_on_passable_cells() {
        let (sim, recorder) = recorded_run(42);
        for frame in &recorder.frames {
            for agent in &frame.agents {
                assert!(
                    sim.layout.grid.passable(agent.pos),
                    "agent {} on impassable {} at {}",
                    agent.id,
                    agent.pos,
                    frame.tick
                );
            }
        }
    }

    #[test]
    fn reservation_table_stays_bounded() {
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        let per_agent = (sim.config.planning_window + 2) as usize;
        let bound = sim.agents.len() * per_agent;
        for _ in 0..1_000 {
            sim.run_ticks(1, &mut NoopObserver).unwrap();
            assert!(
                sim.table.cell_entries() <= bound,
                "cell entries {} exceed bound {bound}",
                sim.table.cell_entries()
            );
            assert!(sim.table.edge_entries() <= bound);
        }
    }

    /// True grid distance by BFS; `None` if disconnected.
    fn grid_distance(grid: &Grid, from: Cell, to: Cell) -> Option<u32> {
        use std::collections::{HashMap, VecDeque};
        let mut dist = HashMap::new();
        dist.insert(from, 0u32);
        let mut queue = VecDeque::from([from]);
        while let Some(cur) = queue.pop_front() {
            let d = dist[&cur];
            if cur == to {
                return Some(d);
            }
            for n in grid.neighbors(cur) {
                dist.entry(n).or_insert_with(|| {
                    queue.push_back(n);
                    d + 1
                });
            }
        }
        None
    }

    #[test]
    fn some_agent_progresses_within_the_replan_budget() {
        // Liveness: while work exists, the fleet may never go a full
        // window-plus-retry-budget of ticks without at least one agent
        // either closing in on its goal or finishing a leg (goal change).
        let mut sim = SimBuilder::new(batch_config(42)).build().unwrap();
        let bound = sim.config.planning_window + sim.config.max_replan_failures as u64;

        let mut last: Vec<(Cell, Option<u32>)> = sim
            .agents
            .iter()
            .map(|a| (a.goal, grid_distance(&sim.layout.grid, a.pos, a.goal)))
            .collect();
        let mut stalled_for = 0u64;
        for _ in 0..RUN_TICKS {
            sim.run_ticks(1, &mut NoopObserver).unwrap();
            let mut progressed = false;
            for (idx, agent) in sim.agents.iter().enumerate() {
                let distance = grid_distance(&sim.layout.grid, agent.pos, agent.goal);
                let (prev_goal, prev_distance) = last[idx];
                let closer =
                    matches!((distance, prev_distance), (Some(d), Some(p)) if d < p);
                if agent.goal != prev_goal || closer {
                    progressed = true;
                }
                last[idx] = (agent.goal, distance);
            }
            if progressed {
                stalled_for = 0;
            } else {
                stalled_for += 1;
                assert!(
                    stalled_for < bound,
                    "no agent made progress for {stalled_for} ticks ending at {}",
                    sim.clock.current_tick
                );
            }
        }
    }

    #[test]
    fn pallet_multiset_is_conserved() {
        let mut sim = SimBuilder::new(batch_config(7)).build().unwrap();
        for _ in 0..RUN_TICKS {
            sim.run_ticks(1, &mut NoopObserver).unwrap();
            let (stacked, carried, delivered) = sim.inventory.census();
            assert_eq!(
                stacked + carried + delivered,
                sim.inventory.pallet_count(),
                "a pallet left the books at {}",
                sim.clock.current_tick
            );
        }
    }
}

// ── End-to-end scenarios ──────────────────────────────────────────────────────

#[cfg(test)]
mod scenario_tests {
    use super::*;

    fn two_site_config() -> SimConfig {
        SimConfig {
            grid_width: 7,
            grid_height: 5,
            num_agents: 2,
            num_stacks: 1,
            num_pickups: 1,
            num_obstacles: 0,
            planning_window: 12,
            reservation_horizon: 24,
            replan_anchor: 1,
            max_replan_failures: 5,
            tick_period_ms: 0,
            total_ticks: 0,
            seed: 42,
            pickup_probability: 1.0,
            max_open_orders: 2,
            max_stack_depth: 6,
            render_url: None,
        }
    }

    #[test]
    fn pallet_gets_picked_up_and_delivered() {
        let mut inventory = Inventory::new(1, 6);
        inventory.spawn_pallet(StackId(0));
        let mut sim = SimBuilder::new(two_site_config())
            .layout(two_site_layout())
            .inventory(inventory)
            .build()
            .unwrap();

        sim.run_ticks(60, &mut NoopObserver).unwrap();
        let (_, _, delivered) = sim.inventory.census();
        assert!(delivered >= 1, "expected at least one delivery");
        assert_eq!(
            sim.inventory.location(PalletId(0)),
            wh_order::PalletLocation::Delivered(wh_core::PickupId(0)),
        );
    }

    #[test]
    fn stack_to_stack_moves_when_no_pickup_rolls() {
        // pickup_probability 0 routes every order to another stack.
        let mut config = batch_config(42);
        config.pickup_probability = 0.0;
        config.num_stacks = 3;
        let mut sim = SimBuilder::new(config).build().unwrap();
        let mut recorder = FrameRecorder::default();
        sim.run_ticks(200, &mut recorder).unwrap();

        // At least one pallet must have changed stacks.
        let initial: Vec<(PalletId, StackId)> = recorder.frames[0]
            .stacks
            .iter()
            .flat_map(|s| s.pallets.iter().map(|&p| (p, s.id)))
            .collect();
        let moved = recorder.frames.iter().any(|frame| {
            frame.stacks.iter().any(|stack| {
                stack
                    .pallets
                    .iter()
                    .any(|&p| initial.iter().any(|&(p0, s0)| p0 == p && s0 != stack.id))
            })
        });
        assert!(moved, "expected at least one stack-to-stack move");
    }

    #[test]
    fn unreachable_order_is_retried_without_crashing() {
        // The only stack sits in a walled pocket: its service cell exists but
        // no agent can reach it.  Orders against it fail planning, get
        // abandoned, and the simulation keeps running.
        let mut grid = Grid::new(9, 5);
        let stack_cell = Cell::new(4, 2);
        grid.set_kind(stack_cell, CellKind::Stack(StackId(0)));
        for (x, y) in [
            (3, 1), (4, 1), (5, 1),
            (3, 2), (5, 2),
            (3, 3), (5, 3),
            (3, 4), (4, 4), (5, 4),
        ] {
            grid.set_kind(Cell::new(x, y), CellKind::Obstacle);
        }
        let pickup_cell = Cell::new(1, 4);
        grid.set_kind(pickup_cell, CellKind::PickupZone(wh_core::PickupId(0)));
        let slots = vec![Cell::new(0, 0), Cell::new(8, 0)];
        for &slot in &slots {
            grid.set_kind(slot, CellKind::MaintenanceSlot);
        }
        let stacks = vec![StackSite {
            id: StackId(0),
            cell: stack_cell,
            service: grid.service_cell(stack_cell).unwrap(),
        }];
        let pickups = vec![PickupSite {
            id: wh_core::PickupId(0),
            cell: pickup_cell,
            service: grid.service_cell(pickup_cell).unwrap(),
        }];
        let layout = Layout { grid, stacks, pickups, slots };

        let mut config = two_site_config();
        config.grid_width = 9;
        let mut inventory = Inventory::new(1, 6);
        inventory.spawn_pallet(StackId(0));
        let mut sim = SimBuilder::new(config)
            .layout(layout)
            .inventory(inventory)
            .build()
            .unwrap();

        sim.run_ticks(60, &mut NoopObserver).unwrap();
        let (stacked, carried, delivered) = sim.inventory.census();
        assert_eq!((carried, delivered), (0, 0), "pocketed pallet cannot move");
        assert!(stacked >= 1);
    }
}
