//! Path planning engines
//!
//! Every engine implements [`PathPlanner`] and follows the same call
//! protocol: validate the endpoints, check the map capabilities it needs,
//! reset the map's scratch state, then run its own loop.

pub mod a_star;
pub mod bidirectional_a_star;
pub mod dijkstra;
pub mod ida_star;
pub mod incremental_phi_star;
pub mod jps;
pub mod lazy_theta_star;
pub mod rbfs;
pub mod rrt;
pub mod rrt_connect;
pub mod rrt_star;
pub mod theta_star;

pub use a_star::{AStarConfig, AStarPlanner};
pub use bidirectional_a_star::BidirectionalAStarPlanner;
pub use dijkstra::{DijkstraPlanner, DistanceMap};
pub use ida_star::{IDAStarConfig, IDAStarPlanner};
pub use incremental_phi_star::{IncrementalPhiStarPlanner, PhiStarConfig};
pub use jps::{JPSConfig, JPSPlanner};
pub use lazy_theta_star::LazyThetaStarPlanner;
pub use rbfs::{RBFSConfig, RBFSPlanner};
pub use rrt::{RRTConfig, RRTPlanner};
pub use rrt_connect::RRTConnectPlanner;
pub use rrt_star::{RRTStarConfig, RRTStarPlanner};
pub use theta_star::{ThetaStarConfig, ThetaStarPlanner};

use crate::common::{GridPos, MapCapability, Path2D, PathPlanner, PlanningError, SearchStats, SpatialMap};
use crate::utils::{Grid, GridMap, SearchState};

/// Names accepted by [`planner_by_name`]
pub const PLANNER_NAMES: &[&str] = &[
    "astar",
    "weighted_astar",
    "dijkstra",
    "bidirectional_astar",
    "theta_star",
    "lazy_theta_star",
    "phi_star",
    "jps",
    "ida_star",
    "rbfs",
    "rrt",
    "rrt_star",
    "rrt_connect",
];

/// Build an engine with its default configuration from a name.
///
/// Matching ignores case, `-`, `_`, spaces and treats `*` as `star`.
pub fn planner_by_name(name: &str) -> Option<Box<dyn PathPlanner>> {
    let key: String = name
        .to_lowercase()
        .replace('*', "star")
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect();
    let planner: Box<dyn PathPlanner> = match key.as_str() {
        "astar" => Box::new(AStarPlanner::default()),
        "weightedastar" => Box::new(AStarPlanner::weighted(1.5)),
        "dijkstra" => Box::new(DijkstraPlanner::new()),
        "bidirectionalastar" => Box::new(BidirectionalAStarPlanner::default()),
        "thetastar" => Box::new(ThetaStarPlanner::default()),
        "lazythetastar" => Box::new(LazyThetaStarPlanner::default()),
        "phistar" | "incrementalphistar" => Box::new(IncrementalPhiStarPlanner::default()),
        "jps" | "jumppointsearch" => Box::new(JPSPlanner::default()),
        "idastar" => Box::new(IDAStarPlanner::default()),
        "rbfs" => Box::new(RBFSPlanner::default()),
        "rrt" => Box::new(RRTPlanner::default()),
        "rrtstar" => Box::new(RRTStarPlanner::default()),
        "rrtconnect" => Box::new(RRTConnectPlanner::default()),
        _ => return None,
    };
    Some(planner)
}

/// Endpoint checks shared by every engine: bounds first, then walkability.
pub(crate) fn validate_endpoints(grid: &Grid, start: GridPos, goal: GridPos) -> Result<(), PlanningError> {
    for pos in [start, goal] {
        if !grid.is_valid(pos) {
            return Err(PlanningError::InvalidPosition { pos });
        }
    }
    for pos in [start, goal] {
        if !grid.is_walkable(pos) {
            return Err(PlanningError::Unwalkable { pos });
        }
    }
    Ok(())
}

/// Validate, check capabilities and reset the scratch state.
///
/// Returns the arena indices of start and goal.
pub(crate) fn begin_search(
    map: &mut GridMap,
    start: GridPos,
    goal: GridPos,
    required: &[MapCapability],
) -> Result<(usize, usize), PlanningError> {
    validate_endpoints(map.grid(), start, goal)?;
    if let Some(&capability) = required.iter().find(|&&c| !map.grid().supports(c)) {
        return Err(PlanningError::UnsupportedMapCapability { capability });
    }
    map.reset_search_state();
    match (map.grid().index(start), map.grid().index(goal)) {
        (Some(s), Some(g)) => Ok((s, g)),
        _ => Err(PlanningError::InvalidPosition { pos: start }),
    }
}

/// Result for `start == goal`: the single-waypoint path at zero cost.
pub(crate) fn trivial_result(stats: SearchStats, start: GridPos) -> crate::common::PlanningResult {
    stats.found(Path2D::from_cells(&[start]), 0.0)
}

/// Flood fill over grid moves from `start`, marking every reached cell
/// `closed`. Stops as soon as `goal` is reached.
pub(crate) fn goal_reachable(grid: &Grid, state: &mut SearchState, start: usize, goal: usize) -> bool {
    let mut stack = vec![start];
    state[start].closed = true;
    while let Some(i) = stack.pop() {
        if i == goal {
            return true;
        }
        for next in grid.neighbors(grid.position(i)) {
            if let Some(n) = grid.index(next) {
                if !state[n].closed {
                    state[n].closed = true;
                    stack.push(n);
                }
            }
        }
    }
    false
}

/// Parent-link path from a root to `target` as cell centers.
pub(crate) fn cell_path(grid: &Grid, state: &SearchState, target: usize) -> Option<Path2D> {
    state
        .trace_parents(target)
        .map(|chain| Path2D::from_points(chain.into_iter().map(|i| grid.position(i).to_point()).collect()))
}
