//! Shortest paths on 2D occupancy grids.
//!
//! [`search`] runs a weighted A* over a 4- or 8-connected grid and [`simplify::simplify`] thins the
//! resulting cell path down to the waypoints needed to keep every leg in line of sight.
//! [`plan`] chains both.

pub mod config;
mod error;
pub mod find;
pub mod grid;
pub mod simplify;
pub mod util;

pub use config::{Connectivity, PlannerConfig, SearchConfig};
pub use error::PlanError;
pub use find::{MapStorage, MapTrait, PathFinder, PathFinderState, PathResult, Visited};
pub use grid::{Cell, CellStorage, GridGraph, GridMap, Point};

use log::debug;

/// Shortest path from `start` to `goal`.
///
/// Returns `Ok(None)` when no path exists, including when either endpoint is blocked. Endpoints
/// outside the grid and out-of-range search parameters are rejected before any search state is
/// allocated.
pub fn search(
    map: &GridMap,
    start: Point,
    goal: Point,
    config: &SearchConfig,
) -> Result<Option<PathResult<Point>>, PlanError> {
    search_with_costs(map, start, goal, config).map(|(result, _)| result)
}

/// Same as [`search`], also returning the cost-so-far and predecessor of every cell the search
/// reached
pub fn search_with_costs(
    map: &GridMap,
    start: Point,
    goal: Point,
    config: &SearchConfig,
) -> Result<(Option<PathResult<Point>>, CellStorage<Visited<Point>>), PlanError> {
    config.validate()?;
    map.check_bounds(start)?;
    map.check_bounds(goal)?;

    debug!(
        "searching {}x{} grid from {} to {} ({})",
        map.rows(),
        map.columns(),
        start,
        goal,
        config.connectivity
    );

    let graph = GridGraph::new(map, *config);
    let (state, visited) = PathFinder::new(start, goal, graph.create_storage())
        .with_tie_break(config.tie_break_eps)
        .finish(&graph);

    let result = match state {
        PathFinderState::PathFound(result) => Some(result),
        _ => None,
    };

    Ok((result, visited))
}

/// The outcome of a successful `plan` call
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// The cell-by-cell path found by the search
    pub raw: PathResult<Point>,
    /// `raw.path` reduced to line-of-sight waypoints, or a copy of it when simplification is off
    pub waypoints: Vec<Point>,
}

impl Plan {
    pub fn from_search(map: &GridMap, raw: PathResult<Point>, simplify_path: bool) -> Self {
        let waypoints = if simplify_path {
            simplify::simplify(map, &raw.path)
        } else {
            raw.path.clone()
        };

        Self { raw, waypoints }
    }
}

/// Search, then simplify the found path if the configuration asks for it
pub fn plan(
    map: &GridMap,
    start: Point,
    goal: Point,
    config: &PlannerConfig,
) -> Result<Option<Plan>, PlanError> {
    Ok(search(map, start, goal, &config.search)?
        .map(|raw| Plan::from_search(map, raw, config.simplify)))
}
