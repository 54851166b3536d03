//! Theta* path planning algorithm
//!
//! Theta* is an any-angle path planning algorithm that extends A* by
//! allowing paths to connect any two visible nodes, not just grid neighbors.
//! This produces shorter, more natural paths compared to standard A*.
//!
//! Key features:
//! - Line-of-sight checks to skip intermediate nodes
//! - Produces any-angle paths (not restricted to grid directions)
//! - Optimal or near-optimal path lengths
//!
//! Any-angle segments cost their Euclidean length; moves that fall back to
//! the grid cost the map's edge cost.
//!
//! Reference: Nash, A., Daniel, K., Koenig, S., & Felner, A. (2007).
//! "Theta*: Any-Angle Path Planning on Grids"

use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, LineOfSight, MapCapability, PathPlanner, PlanningError,
    PlanningResult, SearchStats, SpatialMap,
};
use crate::path_planning::{begin_search, cell_path, trivial_result};
use crate::utils::frontier::{float_key, OpenList};
use crate::utils::{GridMap, Heuristic};

/// Configuration for Theta* planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThetaStarConfig {
    /// Heuristic weight (1.0 = optimal, >1.0 = faster but suboptimal)
    pub heuristic_weight: f64,
}

impl Default for ThetaStarConfig {
    fn default() -> Self {
        Self { heuristic_weight: 1.0 }
    }
}

/// Theta* path planner
///
/// Theta* extends A* by checking line-of-sight between a node and its
/// grandparent. If there's a clear line-of-sight, the path skips the
/// parent node, resulting in shorter, more direct paths.
#[derive(Debug, Clone, Default)]
pub struct ThetaStarPlanner {
    config: ThetaStarConfig,
}

impl ThetaStarPlanner {
    pub fn new(config: ThetaStarConfig) -> Self {
        ThetaStarPlanner { config }
    }
}

pub(crate) fn euclidean_distance(a: GridPos, b: GridPos) -> f64 {
    Heuristic::Euclidean.estimate(a, b)
}

impl PathPlanner for ThetaStarPlanner {
    fn name(&self) -> &'static str {
        "Theta*"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::AnyAngle
    }

    fn required_capabilities(&self) -> &'static [MapCapability] {
        &[MapCapability::LineOfSight]
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        stats.diag("path_type", "any_angle");
        let (start_idx, goal_idx) = match begin_search(map, start, goal, self.required_capabilities()) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        if start == goal {
            return trivial_result(stats, start);
        }

        let weight = self.config.heuristic_weight.max(1.0);
        let (grid, state) = map.split_mut();
        let Some(los) = grid.line_of_sight_support() else {
            return stats.failed(PlanningError::UnsupportedMapCapability {
                capability: MapCapability::LineOfSight,
            });
        };

        let mut open = OpenList::new();
        let mut los_checks = 0usize;
        state[start_idx].g = 0.0;
        state[start_idx].h = euclidean_distance(start, goal);
        state[start_idx].f = weight * state[start_idx].h;
        state[start_idx].open = true;
        open.push(float_key(state[start_idx].f), start_idx);
        stats.visit();

        while let Some((_, current)) = open.pop() {
            if state[current].closed {
                continue;
            }
            state[current].closed = true;
            state[current].open = false;
            stats.iterate();

            if current == goal_idx {
                stats.diag("los_checks", los_checks);
                let cost = state[goal_idx].g;
                return match cell_path(grid, state, goal_idx) {
                    Some(path) => stats.found(path, cost),
                    None => stats.failed(PlanningError::NoPathExists),
                };
            }
            stats.expand();

            let pos = grid.position(current);
            let grandparent = state[current].parent;
            for next in grid.neighbors(pos) {
                let Some(n) = grid.index(next) else { continue };
                if state[n].closed {
                    continue;
                }

                // Path 2: straight from the grandparent when it can see `next`
                let via_parent = grandparent.and_then(|p| {
                    let parent_pos = grid.position(p);
                    los_checks += 1;
                    los.line_of_sight(parent_pos, next)
                        .then(|| (state[p].g + euclidean_distance(parent_pos, next), p))
                });
                // Path 1: standard A* relaxation through the current node
                let (tentative, parent) =
                    via_parent.unwrap_or((state[current].g + grid.edge_cost(pos, next), current));

                if tentative < state[n].g {
                    if state[n].g.is_infinite() {
                        stats.visit();
                    }
                    let cell = &mut state[n];
                    cell.g = tentative;
                    cell.h = euclidean_distance(next, goal);
                    cell.f = tentative + weight * cell.h;
                    cell.parent = Some(parent);
                    cell.parent_point = Some(grid.position(parent).to_point());
                    cell.open = true;
                    open.push(float_key(cell.f), n);
                }
            }
            stats.frontier(open.len());
        }

        stats.diag("los_checks", los_checks);
        stats.failed(PlanningError::NoPathExists)
    }
}
