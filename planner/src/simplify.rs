//! Waypoint reduction for grid paths.
//!
//! Visibility between two cells is decided by walking the integer Bresenham line between them,
//! so the result is exactly reproducible and may differ from geometric line of sight at diagonal
//! pinches.

use log::debug;

use crate::grid::{GridMap, Point};

/// The cells on the Bresenham line from one point to another, both endpoints included
#[derive(Debug, Clone)]
pub struct LineCells {
    row: i64,
    col: i64,
    end: (i64, i64),
    d_row: i64,
    d_col: i64,
    step_row: i64,
    step_col: i64,
    err: i64,
    done: bool,
}

impl LineCells {
    pub fn new(from: Point, to: Point) -> Self {
        let (r0, c0) = (from.row as i64, from.col as i64);
        let (r1, c1) = (to.row as i64, to.col as i64);
        let d_row = (r1 - r0).abs();
        let d_col = (c1 - c0).abs();

        Self {
            row: r0,
            col: c0,
            end: (r1, c1),
            d_row,
            d_col,
            step_row: if r0 < r1 { 1 } else { -1 },
            step_col: if c0 < c1 { 1 } else { -1 },
            err: d_row - d_col,
            done: false,
        }
    }
}

impl Iterator for LineCells {
    type Item = Point;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let cell = Point::new(self.row as usize, self.col as usize);

        if (self.row, self.col) == self.end {
            self.done = true;
        } else {
            // the row step is decided first, on the same doubled error as the column step
            let e2 = 2 * self.err;
            if e2 > -self.d_col {
                self.err -= self.d_col;
                self.row += self.step_row;
            }
            if e2 < self.d_row {
                self.err += self.d_row;
                self.col += self.step_col;
            }
        }

        Some(cell)
    }
}

/// True if no cell on the Bresenham line between `from` and `to` (endpoints included) is blocked
pub fn line_of_sight(map: &GridMap, from: Point, to: Point) -> bool {
    LineCells::new(from, to).all(|p| map.is_free(p))
}

/// Drops every waypoint that the previous kept waypoint can see past.
///
/// The first and last points are always kept. The result is a subsequence of `path` whose
/// consecutive points are in line of sight but not necessarily adjacent.
pub fn simplify(map: &GridMap, path: &[Point]) -> Vec<Point> {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Vec::new();
    };
    if path.len() == 1 {
        return vec![first];
    }

    let mut keep = vec![first];
    let mut anchor = first;

    for window in path.windows(3) {
        let (point, next) = (window[1], window[2]);
        if line_of_sight(map, anchor, next) {
            continue;
        }
        keep.push(point);
        anchor = point;
    }
    keep.push(last);

    debug!("simplified path from {} to {} points", path.len(), keep.len());

    keep
}

#[cfg(test)]
mod test {

    use super::*;

    fn points(coords: &[(usize, usize)]) -> Vec<Point> {
        coords.iter().map(|&(r, c)| Point::new(r, c)).collect()
    }

    #[test]
    fn test_line_cells() {
        let line = |a: (usize, usize), b: (usize, usize)| {
            LineCells::new(Point::new(a.0, a.1), Point::new(b.0, b.1)).collect::<Vec<_>>()
        };

        assert_eq!(line((1, 1), (1, 1)), points(&[(1, 1)]));
        assert_eq!(line((0, 0), (0, 3)), points(&[(0, 0), (0, 1), (0, 2), (0, 3)]));
        assert_eq!(line((3, 0), (0, 0)), points(&[(3, 0), (2, 0), (1, 0), (0, 0)]));
        assert_eq!(line((0, 0), (2, 2)), points(&[(0, 0), (1, 1), (2, 2)]));
        assert_eq!(line((0, 0), (2, 1)), points(&[(0, 0), (1, 0), (2, 1)]));
        assert_eq!(line((0, 0), (1, 2)), points(&[(0, 0), (0, 1), (1, 2)]));
        assert_eq!(line((2, 1), (0, 0)), points(&[(2, 1), (1, 1), (0, 0)]));
        assert_eq!(
            line((0, 4), (3, 0)),
            points(&[(0, 4), (1, 3), (1, 2), (2, 1), (3, 0)])
        );
    }

    #[test]
    fn test_line_of_sight() {
        let map = GridMap::from_rows(vec![vec![0, 0, 0], vec![0, 1, 0], vec![0, 0, 0]]).unwrap();

        assert!(line_of_sight(&map, Point::new(0, 0), Point::new(0, 2)));
        assert!(!line_of_sight(&map, Point::new(0, 0), Point::new(2, 2)));
        assert!(!line_of_sight(&map, Point::new(1, 0), Point::new(1, 2)));
        // the endpoints are part of the line
        assert!(!line_of_sight(&map, Point::new(1, 1), Point::new(1, 1)));
        // the raster walks (0, 0), (1, 0), (2, 1) and misses the obstacle
        assert!(line_of_sight(&map, Point::new(0, 0), Point::new(2, 1)));
    }

    #[test]
    fn test_trivial_paths() {
        let map = GridMap::new(3, 3).unwrap();
        assert_eq!(simplify(&map, &[]), Vec::<Point>::new());
        assert_eq!(simplify(&map, &points(&[(1, 2)])), points(&[(1, 2)]));
        assert_eq!(
            simplify(&map, &points(&[(0, 0), (0, 1)])),
            points(&[(0, 0), (0, 1)])
        );
    }

    #[test]
    fn test_straight_run_collapses() {
        let map = GridMap::new(1, 5).unwrap();
        let path = points(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        assert_eq!(simplify(&map, &path), points(&[(0, 0), (0, 4)]));
    }

    #[test]
    fn test_keeps_waypoints_around_obstacle() {
        // . . .
        // X X .
        // . . .
        let map = GridMap::from_rows(vec![vec![0, 0, 0], vec![1, 1, 0], vec![0, 0, 0]]).unwrap();
        let path = points(&[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (2, 1), (2, 0)]);

        // (0, 0) sees (1, 2) through (0, 1) but not (2, 2), and (1, 2) to (2, 0) clips (1, 1)
        let simplified = simplify(&map, &path);
        assert_eq!(simplified, points(&[(0, 0), (1, 2), (2, 1), (2, 0)]));
        assert_eq!(simplify(&map, &simplified), simplified);
    }

    #[test]
    fn test_free_grid_diagonal() {
        let map = GridMap::new(4, 4).unwrap();
        let path = points(&[(0, 0), (0, 1), (1, 1), (1, 2), (2, 2), (2, 3), (3, 3)]);
        assert_eq!(simplify(&map, &path), points(&[(0, 0), (3, 3)]));
    }

    #[test]
    fn test_second_pass_can_shorten() {
        // only the next point is checked from the anchor: (0, 7) cannot see (1, 5) past the
        // blocked (0, 6), so (1, 6) is kept, although (0, 7) sees (4, 1) directly
        let map = GridMap::from_rows(vec![
            vec![0, 0, 0, 0, 0, 0, 1, 0],
            vec![0, 1, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 0, 0, 1],
            vec![0, 0, 0, 0, 0, 1, 0, 0],
            vec![1, 0, 0, 1, 0, 0, 0, 0],
        ])
        .unwrap();
        let path = points(&[
            (0, 7),
            (1, 7),
            (1, 6),
            (1, 5),
            (1, 4),
            (1, 3),
            (2, 3),
            (3, 3),
            (3, 2),
            (3, 1),
            (4, 1),
        ]);

        let once = simplify(&map, &path);
        assert_eq!(once, points(&[(0, 7), (1, 6), (4, 1)]));
        assert_eq!(simplify(&map, &once), points(&[(0, 7), (4, 1)]));
    }
}
