//! A* and weighted A* path planning
//!
//! Best-first search ordered by `f = g + w·h`. With `w = 1` and an
//! admissible heuristic the returned cost is optimal; with `w > 1` it is
//! bounded by `w` times the optimum.
//!
//! Reference: Hart, P. E., Nilsson, N. J., & Raphael, B. (1968).
//! "A Formal Basis for the Heuristic Determination of Minimum Cost Paths"

use log::{trace, warn};
use serde::Deserialize;

use crate::common::{AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, SearchStats, SpatialMap};
use crate::path_planning::{begin_search, cell_path, trivial_result};
use crate::utils::frontier::{float_key, OpenList};
use crate::utils::{GridMap, Heuristic};

/// Configuration for A* planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AStarConfig {
    /// Heuristic; `None` picks the tightest admissible one for the map's connectivity
    pub heuristic: Option<Heuristic>,
    /// Heuristic weight (1.0 = optimal, >1.0 = faster but suboptimal)
    pub heuristic_weight: f64,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self { heuristic: None, heuristic_weight: 1.0 }
    }
}

/// A* path planner
#[derive(Debug, Clone, Default)]
pub struct AStarPlanner {
    config: AStarConfig,
}

impl AStarPlanner {
    pub fn new(config: AStarConfig) -> Self {
        let mut config = config;
        if !(config.heuristic_weight >= 1.0) {
            warn!("heuristic weight {} is below 1, clamping to 1", config.heuristic_weight);
            config.heuristic_weight = 1.0;
        }
        AStarPlanner { config }
    }

    /// Weighted A* with the default heuristic.
    pub fn weighted(weight: f64) -> Self {
        Self::new(AStarConfig { heuristic_weight: weight, ..Default::default() })
    }

    pub fn config(&self) -> &AStarConfig {
        &self.config
    }
}

impl PathPlanner for AStarPlanner {
    fn name(&self) -> &'static str {
        if self.config.heuristic_weight > 1.0 {
            "Weighted A*"
        } else {
            "A*"
        }
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Classical
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        let weight = self.config.heuristic_weight;
        stats.diag("heuristic_weight", weight);
        stats.diag("optimality_bound", weight);

        let (start_idx, goal_idx) = match begin_search(map, start, goal, &[]) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        if start == goal {
            return trivial_result(stats, start);
        }

        let heuristic = self
            .config
            .heuristic
            .unwrap_or_else(|| Heuristic::for_connectivity(map.grid().connectivity()));
        match best_first_search(map, start_idx, goal_idx, heuristic, weight, &mut stats) {
            Ok((path, cost)) => stats.found(path, cost),
            Err(e) => stats.failed(e),
        }
    }
}

/// Shared A*/Dijkstra loop over the map's scratch arena.
///
/// A popped entry whose cell is already closed is stale and skipped; a
/// closed cell is never reopened. The goal is not counted as expanded.
pub(crate) fn best_first_search(
    map: &mut GridMap,
    start_idx: usize,
    goal_idx: usize,
    heuristic: Heuristic,
    weight: f64,
    stats: &mut SearchStats,
) -> Result<(Path2D, f64), PlanningError> {
    let (grid, state) = map.split_mut();
    let goal = grid.position(goal_idx);
    let mut open = OpenList::new();

    let h0 = heuristic.estimate(grid.position(start_idx), goal);
    state[start_idx].g = 0.0;
    state[start_idx].h = h0;
    state[start_idx].f = weight * h0;
    state[start_idx].open = true;
    open.push(float_key(state[start_idx].f), start_idx);
    stats.visit();
    stats.frontier(open.len());

    while let Some((_, current)) = open.pop() {
        if state[current].closed {
            continue;
        }
        state[current].closed = true;
        state[current].open = false;
        stats.iterate();

        if current == goal_idx {
            let path = cell_path(grid, state, goal_idx).ok_or(PlanningError::NoPathExists)?;
            return Ok((path, state[goal_idx].g));
        }
        stats.expand();

        let pos = grid.position(current);
        let g_current = state[current].g;
        for next in grid.neighbors(pos) {
            let Some(n) = grid.index(next) else { continue };
            if state[n].closed {
                continue;
            }
            let tentative = g_current + grid.edge_cost(pos, next);
            if tentative < state[n].g {
                if state[n].g.is_infinite() {
                    stats.visit();
                }
                let cell = &mut state[n];
                cell.g = tentative;
                cell.h = heuristic.estimate(next, goal);
                cell.f = tentative + weight * cell.h;
                cell.parent = Some(current);
                cell.open = true;
                open.push(float_key(cell.f), n);
            }
        }
        stats.frontier(open.len());
        trace!("[AStar] expanded {} frontier {}", pos, open.len());
    }

    Err(PlanningError::NoPathExists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::utils::{Connectivity, Terrain};

    fn create_wall_map() -> GridMap {
        // 10x10 with a vertical wall at x=5, open only at y=9
        let mut map = GridMap::new(10, 10);
        map.grid_mut().fill_rect(GridPos::new(5, 0), GridPos::new(5, 8), false);
        map
    }

    #[test]
    fn test_a_star_open_diagonal() {
        let mut map = GridMap::new(5, 5);
        let mut planner = AStarPlanner::default();
        let result = planner.find_path(&mut map, GridPos::new(0, 0), GridPos::new(4, 4));
        assert!(result.found());
        assert_relative_eq!(result.cost(), 4.0 * std::f64::consts::SQRT_2, epsilon = 1e-9);
        assert_eq!(result.path().len(), 5);
        assert_eq!(result.nodes_expanded(), 4);
    }

    #[test]
    fn test_a_star_around_wall() {
        let mut map = create_wall_map();
        let mut planner = AStarPlanner::default();
        let result = planner.find_path(&mut map, GridPos::new(0, 0), GridPos::new(9, 0));
        assert!(result.found());
        assert!(result.path().contains_cell(GridPos::new(5, 9)));
        for p in &result.path().points {
            assert!(map.is_walkable(p.to_grid()));
        }
    }

    #[test]
    fn test_a_star_four_connected() {
        let mut map = GridMap::new(5, 5).with_connectivity(Connectivity::Four);
        let mut planner = AStarPlanner::default();
        let result = planner.find_path(&mut map, GridPos::new(0, 0), GridPos::new(4, 4));
        assert_relative_eq!(result.cost(), 8.0);
        assert_eq!(result.path().len(), 9);
    }

    #[test]
    fn test_a_star_avoids_expensive_terrain() {
        let mut map = GridMap::new(5, 3).with_connectivity(Connectivity::Four);
        for x in 1..4 {
            map.set_terrain(GridPos::new(x, 1), Terrain::Mountain).unwrap();
        }
        let result = AStarPlanner::default().find_path(&mut map, GridPos::new(0, 1), GridPos::new(4, 1));
        assert!(result.found());
        assert_relative_eq!(result.cost(), 6.0);
        assert!(!result.path().contains_cell(GridPos::new(2, 1)));
    }

    #[test]
    fn test_a_star_no_path() {
        let mut map = GridMap::new(6, 6);
        map.grid_mut().fill_rect(GridPos::new(3, 0), GridPos::new(3, 5), false);
        let result = AStarPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(5, 5));
        assert!(!result.found());
        assert_eq!(result.failure_reason(), Some("NoPathExists"));
        assert!(result.path().is_empty());
    }

    #[test]
    fn test_weighted_a_star_bound() {
        let mut map = create_wall_map();
        let optimal = AStarPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(9, 0));
        let mut weighted = AStarPlanner::weighted(2.0);
        let result = weighted.find_path(&mut map, GridPos::new(0, 0), GridPos::new(9, 0));
        assert_eq!(weighted.name(), "Weighted A*");
        assert!(result.cost() <= 2.0 * optimal.cost() + 1e-9);
        assert_eq!(result.diagnostic("optimality_bound").and_then(|d| d.as_f64()), Some(2.0));
    }

    #[test]
    fn test_weight_below_one_is_clamped() {
        let planner = AStarPlanner::weighted(0.5);
        assert_eq!(planner.config().heuristic_weight, 1.0);
        assert_eq!(planner.name(), "A*");
    }

    #[test]
    fn test_a_star_deterministic() {
        let mut map = create_wall_map();
        let mut planner = AStarPlanner::default();
        let first = planner.find_path(&mut map, GridPos::new(0, 3), GridPos::new(9, 2));
        let second = planner.find_path(&mut map, GridPos::new(0, 3), GridPos::new(9, 2));
        assert_eq!(first.path(), second.path());
        assert_eq!(first.cost().to_bits(), second.cost().to_bits());
    }
}
