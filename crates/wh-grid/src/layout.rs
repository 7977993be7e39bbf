//! Procedural warehouse layout generation.
//!
//! Placement follows the floor plan of a real depot: maintenance slots line
//! one border (agents park and charge there), pickup zones cluster along the
//! opposite border, stacks cluster wherever space allows, and obstacles
//! (pillars) scatter across the remaining floor.  All placement is rejection
//! sampling from the injected [`SimRng`], so a seed fully determines the map.

use tracing::debug;

use wh_core::{Cell, PickupId, SimConfig, SimRng, StackId};

use crate::{CellKind, Grid, GridError, GridResult};

/// Attempts per object before placement gives up.
const MAX_PLACEMENT_ATTEMPTS: u32 = 256;

// ── Sites ─────────────────────────────────────────────────────────────────────

/// A stack location and the floor cell agents work it from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackSite {
    pub id: StackId,
    pub cell: Cell,
    /// Passable cell adjacent to `cell`; grab/drop happen here.
    pub service: Cell,
}

/// A pickup zone location and its service cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PickupSite {
    pub id: PickupId,
    pub cell: Cell,
    pub service: Cell,
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// The generated floor: the grid plus indexed site lists.
///
/// Site vectors are indexed by their id (`stacks[id.index()].id == id`).
#[derive(Clone, Debug)]
pub struct Layout {
    pub grid: Grid,
    pub stacks: Vec<StackSite>,
    pub pickups: Vec<PickupSite>,
    /// Maintenance slots, one per agent; agent `i` starts (and parks) at
    /// `slots[i]`.
    pub slots: Vec<Cell>,
}

impl Layout {
    #[inline]
    pub fn stack(&self, id: StackId) -> &StackSite {
        &self.stacks[id.index()]
    }

    #[inline]
    pub fn pickup(&self, id: PickupId) -> &PickupSite {
        &self.pickups[id.index()]
    }

    /// Generate a layout for `config` from `rng`.
    ///
    /// Placement is rejection sampling, so a single pass can paint itself
    /// into a corner on an unlucky draw; the whole build is retried a few
    /// times (continuing the same random stream, so still deterministic per
    /// seed) before giving up.
    pub fn generate(config: &SimConfig, rng: &mut SimRng) -> GridResult<Layout> {
        const BUILD_ATTEMPTS: u32 = 16;
        let mut last_err = None;
        for _ in 0..BUILD_ATTEMPTS {
            match Self::generate_once(config, rng) {
                Ok(layout) => return Ok(layout),
                Err(e @ GridError::TooSmall { .. }) => return Err(e),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.expect("at least one attempt ran"))
    }

    fn generate_once(config: &SimConfig, rng: &mut SimRng) -> GridResult<Layout> {
        let (width, height) = (config.grid_width, config.grid_height);
        let mut grid = Grid::new(width, height);

        let required =
            config.num_agents + config.num_stacks + config.num_pickups + config.num_obstacles;
        if required * 2 > (width * height) as usize {
            return Err(GridError::TooSmall { width, height, required });
        }

        let home_border = *rng
            .choose(&[Border::Top, Border::Right, Border::Bottom, Border::Left])
            .expect("borders are non-empty");

        let slots = place_maintenance_slots(&mut grid, config.num_agents, home_border, rng)?;
        let stack_cells =
            place_clustered(&mut grid, config.num_stacks, "stack", None, rng)?;
        let pickup_cells = place_clustered(
            &mut grid,
            config.num_pickups,
            "pickup zone",
            Some(home_border.opposite()),
            rng,
        )?;
        place_obstacles(&mut grid, config.num_obstacles, rng)?;

        // Bind kinds and resolve service cells only after every object is
        // down: an obstacle placed later could otherwise steal a service cell.
        let mut stacks = Vec::with_capacity(stack_cells.len());
        for (i, &cell) in stack_cells.iter().enumerate() {
            let id = StackId(i as u16);
            grid.set_kind(cell, CellKind::Stack(id));
            let service = grid
                .service_cell(cell)
                .ok_or(GridError::NoServiceCell { what: "stack", cell })?;
            stacks.push(StackSite { id, cell, service });
        }
        let mut pickups = Vec::with_capacity(pickup_cells.len());
        for (i, &cell) in pickup_cells.iter().enumerate() {
            let id = PickupId(i as u16);
            grid.set_kind(cell, CellKind::PickupZone(id));
            let service = grid
                .service_cell(cell)
                .ok_or(GridError::NoServiceCell { what: "pickup zone", cell })?;
            pickups.push(PickupSite { id, cell, service });
        }

        debug!(
            stacks = stacks.len(),
            pickups = pickups.len(),
            slots = slots.len(),
            "layout generated"
        );
        Ok(Layout { grid, stacks, pickups, slots })
    }
}

// ── Borders ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Border {
    Top,
    Right,
    Bottom,
    Left,
}

impl Border {
    fn opposite(self) -> Border {
        match self {
            Border::Top => Border::Bottom,
            Border::Right => Border::Left,
            Border::Bottom => Border::Top,
            Border::Left => Border::Right,
        }
    }

    /// A random cell on this border.
    fn sample(self, grid: &Grid, rng: &mut SimRng) -> Cell {
        let (w, h) = (grid.width(), grid.height());
        match self {
            Border::Top => Cell::new(rng.gen_range(0..w), h - 1),
            Border::Bottom => Cell::new(rng.gen_range(0..w), 0),
            Border::Left => Cell::new(0, rng.gen_range(0..h)),
            Border::Right => Cell::new(w - 1, rng.gen_range(0..h)),
        }
    }
}

// ── Placement passes ──────────────────────────────────────────────────────────

/// A strip of maintenance slots along `border`, one per agent.
fn place_maintenance_slots(
    grid: &mut Grid,
    count: usize,
    border: Border,
    rng: &mut SimRng,
) -> GridResult<Vec<Cell>> {
    let along = match border {
        Border::Top | Border::Bottom => grid.width(),
        Border::Left | Border::Right => grid.height(),
    };
    if count as i32 > along {
        return Err(GridError::TooSmall {
            width: grid.width(),
            height: grid.height(),
            required: count,
        });
    }

    let start = rng.gen_range(0..=(along - count as i32));
    let slots: Vec<Cell> = (0..count as i32)
        .map(|i| match border {
            Border::Top => Cell::new(start + i, grid.height() - 1),
            Border::Bottom => Cell::new(start + i, 0),
            Border::Left => Cell::new(0, start + i),
            Border::Right => Cell::new(grid.width() - 1, start + i),
        })
        .collect();
    for &cell in &slots {
        grid.set_kind(cell, CellKind::MaintenanceSlot);
    }
    Ok(slots)
}

/// `count` cells placed in clusters of 2–4, optionally biased toward a border.
///
/// Cells are only taken from free floor and must keep at least one free
/// 4-neighbor at placement time so a service cell can be resolved later.
fn place_clustered(
    grid: &mut Grid,
    count: usize,
    what: &'static str,
    near: Option<Border>,
    rng: &mut SimRng,
) -> GridResult<Vec<Cell>> {
    let mut placed = Vec::with_capacity(count);
    let mut remaining = count;

    while remaining > 0 {
        let cluster = rng.gen_range(2..=4usize).min(remaining);
        let anchor = sample_anchor(grid, near, rng)?;
        for _ in 0..cluster {
            let cell = sample_near(grid, anchor, rng, what)?;
            // Mark immediately so later samples in the same cluster see it.
            grid.set_kind(cell, CellKind::Obstacle);
            placed.push(cell);
            remaining -= 1;
        }
    }

    // Cells stay marked impassable; the caller overwrites the placeholder
    // with the final kind.
    Ok(placed)
}

fn sample_anchor(grid: &Grid, near: Option<Border>, rng: &mut SimRng) -> GridResult<Cell> {
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let cell = match near {
            Some(border) => border.sample(grid, rng),
            None => Cell::new(
                rng.gen_range(0..grid.width()),
                rng.gen_range(0..grid.height()),
            ),
        };
        if grid.kind(cell) == CellKind::Free {
            return Ok(cell);
        }
    }
    Err(GridError::Placement {
        what: "cluster anchor",
        attempts: MAX_PLACEMENT_ATTEMPTS,
        width: grid.width(),
        height: grid.height(),
    })
}

/// A free cell within a small radius of `anchor` that keeps a free neighbor.
fn sample_near(
    grid: &Grid,
    anchor: Cell,
    rng: &mut SimRng,
    what: &'static str,
) -> GridResult<Cell> {
    for attempt in 0..MAX_PLACEMENT_ATTEMPTS {
        // Widen the search radius as attempts accumulate.
        let radius = 1 + (attempt / 32) as i32;
        let cell = anchor.offset(
            rng.gen_range(-radius..=radius),
            rng.gen_range(-radius..=radius),
        );
        if grid.kind(cell) != CellKind::Free {
            continue;
        }
        let free_neighbors = grid.neighbors(cell).count();
        if free_neighbors >= 1 {
            return Ok(cell);
        }
    }
    Err(GridError::Placement {
        what,
        attempts: MAX_PLACEMENT_ATTEMPTS,
        width: grid.width(),
        height: grid.height(),
    })
}

/// Scatter pillars on free floor without sealing off any placed object.
fn place_obstacles(grid: &mut Grid, count: usize, rng: &mut SimRng) -> GridResult<()> {
    for _ in 0..count {
        let mut done = false;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let cell = Cell::new(
                rng.gen_range(0..grid.width()),
                rng.gen_range(0..grid.height()),
            );
            if grid.kind(cell) != CellKind::Free {
                continue;
            }
            grid.set_kind(cell, CellKind::Obstacle);
            if seals_off_a_neighbor(grid, cell) {
                grid.set_kind(cell, CellKind::Free);
                continue;
            }
            done = true;
            break;
        }
        if !done {
            return Err(GridError::Placement {
                what: "obstacle",
                attempts: MAX_PLACEMENT_ATTEMPTS,
                width: grid.width(),
                height: grid.height(),
            });
        }
    }
    Ok(())
}

/// `true` if any impassable neighbor of `cell` just lost its last passable
/// neighbor — i.e. a stack or zone would become unserviceable.
fn seals_off_a_neighbor(grid: &Grid, cell: Cell) -> bool {
    crate::MOVE_ORDER.iter().any(|&(dx, dy)| {
        let n = cell.offset(dx, dy);
        grid.in_bounds(n) && !grid.passable(n) && grid.service_cell(n).is_none()
    })
}
