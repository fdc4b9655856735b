use crate::config::{Connectivity, SearchConfig};
use crate::error::PlanError;
use crate::find::{MapStorage, MapTrait, NodeReference};
use std::{fmt::Display, str::FromStr};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Cell {
    #[default]
    Free,
    Blocked,
}

impl Cell {
    pub fn value(self) -> u8 {
        match self {
            Cell::Free => 0,
            Cell::Blocked => 1,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cell::Blocked => "X",
                Cell::Free => " ",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Move by a signed offset, `None` if the result would be negative
    pub fn offset(self, d_row: isize, d_col: isize) -> Option<Point> {
        Some(Point {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }
}

impl NodeReference for Point {}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl FromStr for Point {
    type Err = anyhow::Error;

    /// Parses `row,col`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Invalid point: {}, expected row,col", s))?;

        Ok(Point {
            row: row.trim().parse().with_context(|| format!("Invalid row in {}", s))?,
            col: col.trim().parse().with_context(|| format!("Invalid column in {}", s))?,
        })
    }
}

/// A rectangular occupancy grid.
///
/// Serializes as its raw rows of `0` (free) and `1` (blocked) values.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct GridMap {
    rows: usize,
    columns: usize,
    cells: Vec<Vec<Cell>>,
}

impl GridMap {
    /// A grid with every cell free, both dimensions must be non-zero
    pub fn new(rows: usize, columns: usize) -> Result<Self, PlanError> {
        if rows == 0 || columns == 0 {
            return Err(PlanError::EmptyGrid);
        }

        Ok(Self {
            rows,
            columns,
            cells: vec![vec![Cell::Free; columns]; rows],
        })
    }

    /// Builds a grid from raw `0/1` rows, rejecting empty, ragged or non-binary input
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, PlanError> {
        let columns = rows.first().map_or(0, |r| r.len());
        if columns == 0 {
            return Err(PlanError::EmptyGrid);
        }

        let cells = rows
            .iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != columns {
                    return Err(PlanError::NotRectangular {
                        row,
                        expected: columns,
                        found: values.len(),
                    });
                }

                values
                    .iter()
                    .enumerate()
                    .map(|(col, &value)| match value {
                        0 => Ok(Cell::Free),
                        1 => Ok(Cell::Blocked),
                        _ => Err(PlanError::InvalidCellValue { row, col, value }),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rows: cells.len(),
            columns,
            cells,
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.value()).collect())
            .collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_valid(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    pub fn check_bounds(&self, point: Point) -> Result<(), PlanError> {
        if self.is_valid(point) {
            Ok(())
        } else {
            Err(PlanError::OutOfBounds {
                point,
                rows: self.rows,
                columns: self.columns,
            })
        }
    }

    /// The cell at `point`, cells outside the grid read as blocked
    pub fn get(&self, point: Point) -> Cell {
        self.cells
            .get(point.row)
            .and_then(|row| row.get(point.col))
            .copied()
            .unwrap_or(Cell::Blocked)
    }

    pub fn is_blocked(&self, point: Point) -> bool {
        self.get(point) == Cell::Blocked
    }

    pub fn is_free(&self, point: Point) -> bool {
        !self.is_blocked(point)
    }

    /// Points outside the grid are ignored
    pub fn set(&mut self, point: Point, cell: Cell) {
        if let Some(c) = self
            .cells
            .get_mut(point.row)
            .and_then(|row| row.get_mut(point.col))
        {
            *c = cell;
        }
    }

    pub fn toggle(&mut self, point: Point) {
        let flipped = match self.get(point) {
            Cell::Free => Cell::Blocked,
            Cell::Blocked => Cell::Free,
        };
        self.set(point, flipped);
    }

    /// Scales the map by the given factor, i.e. to make it twice as large, pass 2.
    /// Interpolates the cells by repeating the existing cells in the new grid.
    /// A factor of zero is rejected and leaves the grid unchanged.
    pub fn scale_up(&mut self, factor: usize) -> Result<(), PlanError> {
        if factor == 0 {
            return Err(PlanError::EmptyGrid);
        }

        let mut new_cells = vec![vec![Cell::default(); self.columns * factor]; self.rows * factor];

        for row in 0..self.rows {
            for col in 0..self.columns {
                for r in 0..factor {
                    for c in 0..factor {
                        new_cells[row * factor + r][col * factor + c] = self.cells[row][col];
                    }
                }
            }
        }

        self.rows *= factor;
        self.columns *= factor;
        self.cells = new_cells;
        Ok(())
    }
}

impl TryFrom<Vec<Vec<u8>>> for GridMap {
    type Error = PlanError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<GridMap> for Vec<Vec<u8>> {
    fn from(map: GridMap) -> Self {
        map.to_rows()
    }
}

impl Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// A MapStorage that keeps one value per grid cell in a single row-major vec
#[derive(Debug)]
pub struct CellStorage<T> {
    columns: usize,
    cells: Vec<T>,
}

impl<T: Default + Clone> CellStorage<T> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            columns,
            cells: vec![T::default(); rows * columns],
        }
    }
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn get(&self, node: Self::Reference) -> T {
        self.cells[node.row * self.columns + node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.cells[node.row * self.columns + node.col]
    }
}

impl<T: Display> Display for CellStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.columns) {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

// up, down, left, right, then the diagonals
const OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// The occupancy grid seen as a search graph under one `SearchConfig`
#[derive(Debug, Clone, Copy)]
pub struct GridGraph<'a> {
    map: &'a GridMap,
    config: SearchConfig,
}

impl<'a> GridGraph<'a> {
    pub fn new(map: &'a GridMap, config: SearchConfig) -> Self {
        Self { map, config }
    }

    pub fn map(&self) -> &GridMap {
        self.map
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// An edge is blocked if its destination is blocked, or if it is a diagonal squeezing between
    /// two blocked cells and corner cutting is not allowed
    pub fn is_edge_blocked(&self, from: Point, to: Point) -> bool {
        if self.map.is_blocked(to) {
            return true;
        }

        if self.config.connectivity == Connectivity::Eight
            && !self.config.allow_corner_cutting
            && from.row != to.row
            && from.col != to.col
        {
            return self.map.is_blocked(Point::new(from.row, to.col))
                && self.map.is_blocked(Point::new(to.row, from.col));
        }

        false
    }

    pub fn step_cost(&self, from: Point, to: Point) -> f64 {
        if self.config.connectivity == Connectivity::Four || from.row == to.row || from.col == to.col
        {
            1.0
        } else {
            self.config.diagonal_cost
        }
    }
}

impl<'a> MapTrait for GridGraph<'a> {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_traversable(&self, node: Self::Reference) -> bool {
        self.map.is_free(node)
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = (Self::Reference, f64)> {
        let mut points = Vec::with_capacity(8);

        let offsets = match self.config.connectivity {
            Connectivity::Four => &OFFSETS[..4],
            Connectivity::Eight => &OFFSETS[..],
        };

        for &(d_row, d_col) in offsets {
            if let Some(next) = node.offset(d_row, d_col) {
                if self.map.is_valid(next) && !self.is_edge_blocked(node, next) {
                    points.push((next, self.step_cost(node, next)));
                }
            }
        }

        points.into_iter()
    }

    /// Manhattan distance when 4-connected, octile distance when 8-connected
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> f64 {
        let d_row = from.row.abs_diff(to.row) as f64;
        let d_col = from.col.abs_diff(to.col) as f64;

        match self.config.connectivity {
            Connectivity::Four => d_row + d_col,
            Connectivity::Eight => {
                let (low, high) = (d_row.min(d_col), d_row.max(d_col));
                (high - low) + self.config.diagonal_cost * low
            }
        }
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage::new(self.map.rows, self.map.columns)
    }
}
