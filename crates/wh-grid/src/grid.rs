//! Grid storage, passability, and ordered neighbor generation.
//!
//! # Neighbor order
//!
//! Successor generation is deterministic and fixed: north, east, south, west,
//! then wait-in-place.  Every search in the planner inherits its tie-breaking
//! from this order, so two runs with the same seed expand identical node
//! sequences.

use wh_core::{Cell, PickupId, StackId};

// ── CellKind ──────────────────────────────────────────────────────────────────

/// What occupies a grid cell.
///
/// `Stack` and `PickupZone` cells are impassable to agents; work on them
/// happens from an adjacent service cell.  `MaintenanceSlot` cells are
/// ordinary floor that doubles as agent parking.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    #[default]
    Free,
    Obstacle,
    MaintenanceSlot,
    Stack(StackId),
    PickupZone(PickupId),
}

impl CellKind {
    /// `true` if an agent may stand on this cell.
    #[inline]
    pub fn passable(self) -> bool {
        matches!(self, CellKind::Free | CellKind::MaintenanceSlot)
    }
}

/// Unit moves in expansion order: N, E, S, W.  Wait is appended separately by
/// [`Grid::moves`].
pub const MOVE_ORDER: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

// ── Grid ──────────────────────────────────────────────────────────────────────

/// The static floor: a dense `W × H` array of [`CellKind`]s.
///
/// Coordinates outside `[0, W) × [0, H)` are impassable; callers never need
/// to bounds-check before asking.
#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    kinds: Vec<CellKind>,
}

impl Grid {
    /// An all-free grid of the given dimensions.
    ///
    /// # Panics
    /// Panics if either dimension is not positive (layout generation
    /// validates configured dimensions before construction).
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            kinds: vec![CellKind::Free; (width * height) as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    #[inline]
    fn idx(&self, cell: Cell) -> usize {
        (cell.y * self.width + cell.x) as usize
    }

    /// The kind of `cell`, or `Obstacle` for out-of-bounds coordinates.
    #[inline]
    pub fn kind(&self, cell: Cell) -> CellKind {
        if self.in_bounds(cell) {
            self.kinds[self.idx(cell)]
        } else {
            CellKind::Obstacle
        }
    }

    /// Overwrite the kind of an in-bounds cell.
    ///
    /// Only layout generation calls this; the grid is immutable afterwards.
    pub fn set_kind(&mut self, cell: Cell, kind: CellKind) {
        debug_assert!(self.in_bounds(cell));
        let i = self.idx(cell);
        self.kinds[i] = kind;
    }

    /// `true` if an agent may stand on `cell`.
    #[inline]
    pub fn passable(&self, cell: Cell) -> bool {
        self.kind(cell).passable()
    }

    /// Passable 4-neighbors of `cell` in N, E, S, W order.
    #[inline]
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        MOVE_ORDER
            .iter()
            .map(move |&(dx, dy)| cell.offset(dx, dy))
            .filter(|&c| self.passable(c))
    }

    /// All legal single-tick moves from `cell`: passable 4-neighbors in
    /// N, E, S, W order, then `cell` itself (wait).
    ///
    /// Waiting is always offered — whether the cell is *reservable* at the
    /// next tick is the planner's concern, not the grid's.
    #[inline]
    pub fn moves(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.neighbors(cell).chain(std::iter::once(cell))
    }

    /// The first passable 4-neighbor of `cell` in N, E, S, W order.
    ///
    /// Used to resolve the service cell of a stack or pickup zone — the floor
    /// cell an agent stands on while grabbing or dropping.
    pub fn service_cell(&self, cell: Cell) -> Option<Cell> {
        MOVE_ORDER
            .iter()
            .map(|&(dx, dy)| cell.offset(dx, dy))
            .find(|&c| self.passable(c))
    }

    /// Iterator over all in-bounds cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }
}
