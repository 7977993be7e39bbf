//! The `Sim` struct and its tick loop.
//!
//! # Tick phases
//!
//! 1. **GC**: drop reservation entries older than `now`.
//! 2. **Lifecycle**: complete grab/drop dwells, advance task queues, detect
//!    arrivals at task endpoints.
//! 3. **Orders**: pump the generator (until backpressure) and bind open
//!    orders to idle agents, nearest first task wins.
//! 4. **Replan**: agents whose plan expired or whose task changed search
//!    again, in priority order — stuck/expired agents first, then ascending
//!    id.  Later agents see earlier agents' fresh reservations.
//! 5. **Move**: every agent advances one step along its committed path;
//!    positions and history rings update.
//! 6. **Frame**: the observer receives the end-of-tick scene.
//!
//! # Blockage protocol
//!
//! When an agent cannot plan even a wait (its own next slot is promised to
//! someone else), it *holds*: its reservations are replaced by a full-window
//! wait at its current cell, and any agent whose path ran through that cell
//! is evicted — released and requeued for a fresh search later this tick.
//! Holds are on distinct cells, so eviction cannot cascade into a cycle, and
//! no agent ever physically enters an occupied cell.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use wh_core::{AgentId, Cell, SimClock, SimConfig, SimRng, Step, Tick};
use wh_grid::Layout;
use wh_order::{Inventory, OrderBoard, OrderError, OrderGenerator, PalletLocation, Task};
use wh_plan::{PlanError, ReservationTable, TrueDistance, plan_with_history};

use crate::{AgentPhase, AgentState, FrameSnapshot, SimError, SimObserver, SimResult};
use crate::observer::{AgentView, StackView};

/// The simulation: sole owner and sole mutator of all run-time state.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub config: SimConfig,
    pub clock: SimClock,
    pub layout: Layout,
    pub table: ReservationTable,
    pub agents: Vec<AgentState>,
    pub inventory: Inventory,
    pub board: OrderBoard,

    pub(crate) generator: OrderGenerator,
    pub(crate) rng: SimRng,
    /// Per-agent resumable heuristic, rebuilt when the agent's goal moves.
    pub(crate) heuristics: Vec<Option<TrueDistance>>,
    pub(crate) stop: Arc<AtomicBool>,

    /// Consecutive ticks in which every agent was stuck.
    stall_ticks: u64,
}

impl Sim {
    pub(crate) fn assemble(
        config: SimConfig,
        layout: Layout,
        inventory: Inventory,
        agents: Vec<AgentState>,
        rng: SimRng,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let n = agents.len();
        let generator = OrderGenerator::new(config.pickup_probability, config.max_open_orders);
        let clock = SimClock::new(config.tick_period_ms);
        Self {
            config,
            clock,
            layout,
            table: ReservationTable::new(),
            agents,
            inventory,
            board: OrderBoard::new(),
            generator,
            rng,
            heuristics: (0..n).map(|_| None).collect(),
            stop,
            stall_ticks: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// A handle that aborts the run at the next tick boundary when set.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run until the stop flag is raised or `config.total_ticks` elapse
    /// (`total_ticks == 0` runs until stopped).
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        loop {
            let now = self.clock.current_tick;
            if self.stop.load(Ordering::Relaxed) {
                info!(%now, "stop requested, shutting down at tick boundary");
                break;
            }
            if self.config.total_ticks > 0 && now.0 >= self.config.total_ticks {
                break;
            }
            self.tick_once(observer)?;
            if !self.clock.tick_period.is_zero() {
                std::thread::sleep(self.clock.tick_period);
            }
        }
        observer.on_sim_end(self.clock.current_tick);
        Ok(())
    }

    /// Run exactly `n` ticks without sleeping (tests, batch stepping).
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.tick_once(observer)?;
        }
        Ok(())
    }

    fn tick_once<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);
        let replanned = self.process_tick(now)?;
        observer.on_frame(&self.snapshot(now));
        observer.on_tick_end(now, replanned);
        self.clock.advance();
        Ok(())
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn process_tick(&mut self, now: Tick) -> SimResult<usize> {
        // ── Phase 1: reservation GC ───────────────────────────────────────
        self.table.advance(now);

        // ── Phase 2: task lifecycle ───────────────────────────────────────
        let completed = self.update_phases(now)?;
        if completed > 0 {
            let spawned = self.inventory.refill(&mut self.rng);
            if spawned > 0 {
                debug!(spawned, "stacks refilled");
            }
        }

        // ── Phase 3: orders ───────────────────────────────────────────────
        self.pump_orders(now);
        self.assign_orders()?;

        // ── Phase 4: replanning ───────────────────────────────────────────
        let replanned = self.replan_phase(now)?;

        // ── Phase 5: movement ─────────────────────────────────────────────
        self.advance_positions(now);

        Ok(replanned)
    }

    // ── Phase 2: lifecycle ────────────────────────────────────────────────

    /// Walk every agent's state machine; returns how many orders finished.
    fn update_phases(&mut self, now: Tick) -> SimResult<usize> {
        let mut completed_orders = 0;
        for idx in 0..self.agents.len() {
            let id = self.agents[idx].id;
            let phase = self.agents[idx].phase;
            match phase {
                AgentPhase::Idle | AgentPhase::Stuck => {}

                AgentPhase::MovingToSource => {
                    let Some(&task) = self.board.current_task(id) else {
                        self.become_idle(idx);
                        continue;
                    };
                    if self.agents[idx].pos == task.start_cell(&self.layout) {
                        self.agents[idx].phase = AgentPhase::Grabbing;
                    }
                }

                AgentPhase::Grabbing => {
                    completed_orders += self.finish_grab(idx, now)?;
                }

                AgentPhase::MovingToTarget => {
                    let goal = self.agents[idx].goal;
                    if self.agents[idx].pos == goal {
                        self.agents[idx].phase = AgentPhase::Dropping;
                    }
                }

                AgentPhase::Dropping => {
                    completed_orders += self.finish_drop(idx)?;
                }
            }
        }
        Ok(completed_orders)
    }

    /// Complete a grab dwell: lift the pallet or yield if it is covered.
    fn finish_grab(&mut self, idx: usize, _now: Tick) -> SimResult<usize> {
        let id = self.agents[idx].id;
        let Some(&task) = self.board.current_task(id) else {
            self.become_idle(idx);
            return Ok(0);
        };
        let (pallet, from) = match task {
            Task::FreeUp { pallet, from, .. } | Task::Pickup { pallet, from } => (pallet, from),
            Task::Delivery { .. } => {
                // A delivery never grabs; recover by re-entering the task.
                self.enter_task(idx, task);
                return Ok(0);
            }
        };

        match self.inventory.grab(id, pallet, from) {
            Ok(()) => {
                self.agents[idx].carrying = Some(pallet);
                self.agents[idx].failures = 0;
                match task {
                    Task::FreeUp { to, .. } => {
                        self.agents[idx].phase = AgentPhase::MovingToTarget;
                        self.set_goal(idx, self.layout.stack(to).service);
                    }
                    Task::Pickup { .. } => {
                        return self.complete_current_task(idx);
                    }
                    Task::Delivery { .. } => unreachable!("filtered above"),
                }
                Ok(0)
            }
            Err(OrderError::NotOnTop { .. }) | Err(OrderError::EmptyStack(_)) => {
                if !matches!(
                    self.inventory.location(pallet),
                    PalletLocation::Stacked(stack) if stack == from
                ) {
                    // The pallet left this stack entirely — another order
                    // moved it.  The task can never run; drop the order.
                    warn!(agent = %id, %pallet, "task infeasible, dropping order");
                    self.board.drop_order(id);
                    self.become_idle(idx);
                    return Ok(0);
                }
                // Covered by a newer arrival: yield and retry next tick.
                let agent = &mut self.agents[idx];
                agent.failures += 1;
                agent.needs_replan = true;
                if agent.failures > self.config.max_replan_failures {
                    debug!(agent = %id, "grab retries exhausted, abandoning order");
                    agent.failures = 0;
                    self.board.abandon(id);
                    self.become_idle(idx);
                }
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Complete a drop dwell: place or deliver the carried pallet.
    fn finish_drop(&mut self, idx: usize) -> SimResult<usize> {
        let id = self.agents[idx].id;
        let Some(&task) = self.board.current_task(id) else {
            self.become_idle(idx);
            return Ok(0);
        };
        let result = match task {
            Task::FreeUp { pallet, to, .. } => self.inventory.drop_on_stack(id, pallet, to),
            Task::Delivery { pallet, to } => self.inventory.deliver(id, pallet, to),
            Task::Pickup { .. } => {
                self.enter_task(idx, task);
                return Ok(0);
            }
        };
        match result {
            Ok(()) => {
                self.agents[idx].carrying = None;
                self.agents[idx].failures = 0;
                self.complete_current_task(idx)
            }
            Err(OrderError::StackFull(full)) => {
                // The destination filled up after the order was cut; send the
                // pallet to the next best stack, or retry once one drains.
                let pending = vec![0; self.layout.stacks.len()];
                match self.inventory.least_loaded_other(full, &pending) {
                    Some(alt) if self.board.redirect(id, alt) => {
                        warn!(agent = %id, %full, %alt, "drop target full, redirecting");
                        self.agents[idx].phase = AgentPhase::MovingToTarget;
                        self.set_goal(idx, self.layout.stack(alt).service);
                    }
                    _ => debug!(agent = %id, %full, "drop target full, waiting"),
                }
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pop the finished task; enter the next one or go idle.  Returns 1 when
    /// the whole order finished.
    fn complete_current_task(&mut self, idx: usize) -> SimResult<usize> {
        let id = self.agents[idx].id;
        match self.board.complete_task(id) {
            Some(next) => {
                self.enter_task(idx, next);
                Ok(0)
            }
            None => {
                self.become_idle(idx);
                Ok(1)
            }
        }
    }

    /// Point the agent at a task's first leg.
    fn enter_task(&mut self, idx: usize, task: Task) {
        let carrying = self.agents[idx].carrying;
        let (phase, goal) = if carrying == Some(task.pallet()) {
            (AgentPhase::MovingToTarget, task.end_cell(&self.layout))
        } else {
            (AgentPhase::MovingToSource, task.start_cell(&self.layout))
        };
        self.agents[idx].phase = phase;
        self.set_goal(idx, goal);
    }

    fn become_idle(&mut self, idx: usize) {
        let home = self.agents[idx].home;
        self.agents[idx].phase = AgentPhase::Idle;
        self.set_goal(idx, home);
    }

    fn set_goal(&mut self, idx: usize, goal: Cell) {
        let agent = &mut self.agents[idx];
        if agent.goal != goal {
            agent.goal = goal;
        }
        agent.needs_replan = true;
    }

    // ── Phase 3: orders ───────────────────────────────────────────────────

    fn pump_orders(&mut self, now: Tick) {
        loop {
            let open = self.board.total_open();
            match self
                .generator
                .generate(&self.inventory, &self.layout, open, &mut self.rng, now)
            {
                Some(order) => self.board.publish(order),
                None => break,
            }
        }
    }

    fn assign_orders(&mut self) -> SimResult<()> {
        for idx in 0..self.agents.len() {
            let id = self.agents[idx].id;
            if self.agents[idx].phase != AgentPhase::Idle || self.board.current(id).is_some() {
                continue;
            }
            let pos = self.agents[idx].pos;
            let task = self
                .board
                .assign(id, pos, &self.layout)?
                .and_then(|order| order.current_task().copied());
            match task {
                Some(task) => self.enter_task(idx, task),
                None => {
                    // Nothing to do: head home (no-op if already there).
                    if self.agents[idx].goal != self.agents[idx].home {
                        self.become_idle(idx);
                    }
                }
            }
        }
        Ok(())
    }

    // ── Phase 4: replanning ───────────────────────────────────────────────

    fn replan_phase(&mut self, now: Tick) -> SimResult<usize> {
        let half_window = self.config.planning_window.div_ceil(2);

        // Priority: stuck or expired plans first, then ascending id.
        let mut urgent = Vec::new();
        let mut normal = Vec::new();
        for agent in &self.agents {
            let coverage = agent.coverage(now);
            if !(agent.needs_replan || coverage < half_window) {
                continue;
            }
            if agent.phase == AgentPhase::Stuck || coverage == 0 {
                urgent.push(agent.id);
            } else {
                normal.push(agent.id);
            }
        }
        urgent.sort();
        normal.sort();

        self.refresh_heuristics(urgent.iter().chain(&normal));

        let mut in_queue = vec![false; self.agents.len()];
        let mut queue: VecDeque<AgentId> = VecDeque::new();
        for id in urgent.into_iter().chain(normal) {
            in_queue[id.index()] = true;
            queue.push_back(id);
        }

        let mut replanned = 0;
        while let Some(id) = queue.pop_front() {
            in_queue[id.index()] = false;
            replanned += 1;
            self.plan_agent(id, now, &mut queue, &mut in_queue)?;
        }

        // Global stall detection — practically unreachable on sane maps.
        if !self.agents.is_empty() && self.agents.iter().all(|a| a.phase == AgentPhase::Stuck) {
            self.stall_ticks += 1;
            if self.stall_ticks > self.config.max_replan_failures as u64 {
                return Err(SimError::Stalled { ticks: self.stall_ticks });
            }
        } else {
            self.stall_ticks = 0;
        }

        Ok(replanned)
    }

    /// Rebuild heuristics whose goal moved.  With the `parallel` feature the
    /// rebuilds (pure functions of the static grid and one goal) run on the
    /// Rayon pool; results merge before the serial search loop.
    fn refresh_heuristics<'a>(&mut self, ids: impl Iterator<Item = &'a AgentId>) {
        let grid = &self.layout.grid;
        let stale: Vec<(usize, Cell, Cell)> = ids
            .filter_map(|&id| {
                let agent = &self.agents[id.index()];
                let stale = match &self.heuristics[id.index()] {
                    Some(h) => h.goal() != agent.goal,
                    None => true,
                };
                stale.then_some((id.index(), agent.goal, agent.pos))
            })
            .collect();

        #[cfg(feature = "parallel")]
        let rebuilt: Vec<(usize, TrueDistance)> = {
            use rayon::prelude::*;
            stale
                .into_par_iter()
                .map(|(idx, goal, pos)| {
                    let mut h = TrueDistance::new(goal);
                    // Pre-warm up to the agent's position off the hot path.
                    h.distance(grid, pos);
                    (idx, h)
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let rebuilt: Vec<(usize, TrueDistance)> = stale
            .into_iter()
            .map(|(idx, goal, pos)| {
                let mut h = TrueDistance::new(goal);
                h.distance(grid, pos);
                (idx, h)
            })
            .collect();

        for (idx, h) in rebuilt {
            self.heuristics[idx] = Some(h);
        }
    }

    fn plan_agent(
        &mut self,
        id: AgentId,
        now: Tick,
        queue: &mut VecDeque<AgentId>,
        in_queue: &mut [bool],
    ) -> SimResult<()> {
        let idx = id.index();
        self.table.release(id);

        // An eviction can land between the batch refresh and this agent's
        // turn, so re-check staleness here.
        let goal = self.agents[idx].goal;
        let stale = match &self.heuristics[idx] {
            Some(h) => h.goal() != goal,
            None => true,
        };
        if stale {
            self.heuristics[idx] = Some(TrueDistance::new(goal));
        }

        let history = self.agents[idx].history_steps();
        let grid = &self.layout.grid;
        let heuristic = self.heuristics[idx].as_mut().expect("ensured above");
        let result = plan_with_history(
            grid,
            &self.table,
            heuristic,
            id,
            now,
            self.config.replan_anchor,
            &history,
            goal,
            self.config.planning_window,
        );

        match result {
            Ok(path) if path.last().is_some_and(|s| s.tick > now) => {
                self.table.reserve(id, &path)?;
                let agent = &mut self.agents[idx];
                agent.path = path;
                agent.needs_replan = false;
                agent.failures = 0;
                if agent.phase == AgentPhase::Stuck {
                    self.recover_phase(idx);
                }
                Ok(())
            }
            Ok(_) => {
                // The plan gives no next step (every later slot at the final
                // cell is promised away): hold and make the claimants move.
                self.hold_in_place(id, now, queue, in_queue)
            }
            Err(PlanError::Unreachable { .. }) => {
                let agent = &mut self.agents[idx];
                agent.failures += 1;
                warn!(agent = %id, %goal, failures = agent.failures, "no path found");
                agent.phase = AgentPhase::Stuck;
                if agent.failures > self.config.max_replan_failures
                    && agent.carrying.is_none()
                    && self.board.current(id).is_some()
                {
                    self.agents[idx].failures = 0;
                    self.board.abandon(id);
                    self.become_idle(idx);
                    self.agents[idx].phase = AgentPhase::Stuck;
                }
                self.hold_in_place(id, now, queue, in_queue)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the agent's reservations with a full-window wait at its cell,
    /// evicting any other agent whose path claimed that cell.
    fn hold_in_place(
        &mut self,
        id: AgentId,
        now: Tick,
        queue: &mut VecDeque<AgentId>,
        in_queue: &mut [bool],
    ) -> SimResult<()> {
        let idx = id.index();
        let pos = self.agents[idx].pos;
        let window = self.config.planning_window;

        for t in 0..=window {
            let tick = now + t;
            if let Some(owner) = self.table.owner(pos, tick)
                && owner != id
            {
                debug!(victim = %owner, holder = %id, cell = %pos, %tick, "evicting path through held cell");
                self.table.release(owner);
                let victim = &mut self.agents[owner.index()];
                victim.path.clear();
                victim.needs_replan = true;
                if !in_queue[owner.index()] {
                    in_queue[owner.index()] = true;
                    queue.push_back(owner);
                }
            }
        }

        let hold: Vec<Step> = (0..=window).map(|t| Step::new(pos, now + t)).collect();
        self.table.reserve(id, &hold)?;
        let agent = &mut self.agents[idx];
        agent.path = hold;
        // Stuck agents retry every tick with bumped priority; a mere padding
        // shortfall just waits out its hold.
        agent.needs_replan = agent.phase == AgentPhase::Stuck;
        Ok(())
    }

    /// Leave `Stuck` after a successful plan, rejoining the task lifecycle.
    fn recover_phase(&mut self, idx: usize) {
        let id = self.agents[idx].id;
        match self.board.current_task(id).copied() {
            Some(task) => self.enter_task(idx, task),
            None => self.become_idle(idx),
        }
        // enter_task/become_idle raise needs_replan; the plan just committed
        // is already for this goal.
        self.agents[idx].needs_replan = false;
    }

    // ── Phase 5: movement ─────────────────────────────────────────────────

    fn advance_positions(&mut self, now: Tick) {
        let keep = self.config.replan_anchor as usize + 1;
        for agent in &mut self.agents {
            let next = agent.step_at(now + 1).unwrap_or(agent.pos);
            agent.pos = next;
            agent.record(Step::new(next, now + 1), keep);
        }
    }

    // ── Frames ────────────────────────────────────────────────────────────

    /// The end-of-tick scene for observers and renderers.
    pub fn snapshot(&self, tick: Tick) -> FrameSnapshot {
        FrameSnapshot {
            tick,
            agents: self
                .agents
                .iter()
                .map(|a| AgentView {
                    id: a.id,
                    pos: a.pos,
                    carrying: a.carrying,
                    phase: a.phase,
                })
                .collect(),
            stacks: self
                .layout
                .stacks
                .iter()
                .map(|s| StackView {
                    id: s.id,
                    cell: s.cell,
                    pallets: self.inventory.stack(s.id).to_vec(),
                })
                .collect(),
            delivered: self.inventory.census().2,
        }
    }
}
