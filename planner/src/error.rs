use thiserror::Error;

use crate::grid::Point;

/// Invalid input handed to the planner.
///
/// A missing path is not an error: searches report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The grid has no rows or no columns
    #[error("grid must have at least one row and one column")]
    EmptyGrid,

    #[error("grid is not rectangular: row {row} has {found} cells, expected {expected}")]
    NotRectangular {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid cell value {value} at ({row}, {col}), expected 0 (free) or 1 (blocked)")]
    InvalidCellValue { row: usize, col: usize, value: u8 },

    #[error("{point} is outside the {rows}x{columns} grid")]
    OutOfBounds {
        point: Point,
        rows: usize,
        columns: usize,
    },

    /// A search parameter outside the range that keeps the search optimal
    #[error("invalid {field} {value}, expected a value in {min}..={max}")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
