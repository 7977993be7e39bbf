use thiserror::Error;
use wh_core::Cell;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("could not place {what} after {attempts} attempts on a {width}x{height} grid")]
    Placement {
        what: &'static str,
        attempts: u32,
        width: i32,
        height: i32,
    },

    #[error("{what} at {cell} has no passable service cell")]
    NoServiceCell { what: &'static str, cell: Cell },

    #[error("grid too small: {width}x{height} cannot hold {required} placed objects")]
    TooSmall {
        width: i32,
        height: i32,
        required: usize,
    },
}

pub type GridResult<T> = Result<T, GridError>;
