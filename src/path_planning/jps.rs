//! Jump Point Search (JPS) path planning algorithm
//!
//! JPS is an optimization of A* for uniform-cost grids that reduces the
//! number of nodes expanded by identifying "jump points" - nodes that
//! have forced neighbors or are the goal.
//!
//! This is the variant for maps that forbid cutting corners: a diagonal step
//! needs both orthogonal cells open, so forced neighbors only arise on
//! straight moves and a diagonal scan stops where one of its straight
//! sub-scans finds a jump point. Scans are plain loops.
//!
//! Reference: Harabor, D., & Grastien, A. (2011). Online Graph Pruning for
//! Pathfinding on Grid Maps.

use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, MapCapability, Path2D, PathPlanner, PlanningError, PlanningResult,
    SearchStats, SpatialMap,
};
use crate::path_planning::{begin_search, trivial_result};
use crate::utils::frontier::{float_key, OpenList};
use crate::utils::heuristic::octile;
use crate::utils::{Grid, GridMap};

/// Configuration for JPS planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JPSConfig {
    /// Heuristic weight (1.0 = optimal, >1.0 = faster but suboptimal)
    pub heuristic_weight: f64,
}

impl Default for JPSConfig {
    fn default() -> Self {
        Self { heuristic_weight: 1.0 }
    }
}

/// Direction for movement in JPS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Direction {
    dx: i32,
    dy: i32,
}

impl Direction {
    fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Unit direction of travel from `from` to `to`.
    fn between(from: GridPos, to: GridPos) -> Self {
        Self::new((to.x - from.x).signum(), (to.y - from.y).signum())
    }

    fn is_diagonal(&self) -> bool {
        self.dx != 0 && self.dy != 0
    }
}

/// Jump Point Search path planner
#[derive(Debug, Clone, Default)]
pub struct JPSPlanner {
    config: JPSConfig,
}

impl JPSPlanner {
    pub fn new(config: JPSConfig) -> Self {
        JPSPlanner { config }
    }
}

fn calc_distance(a: GridPos, b: GridPos) -> f64 {
    octile((b.x - a.x) as f64, (b.y - a.y) as f64)
}

/// Scan along a straight direction from `pos` (inclusive).
fn jump_straight(grid: &Grid, mut pos: GridPos, dir: Direction, goal: GridPos) -> Option<GridPos> {
    loop {
        if !grid.is_walkable(pos) {
            return None;
        }
        if pos == goal {
            return Some(pos);
        }
        let forced = if dir.dx != 0 {
            (grid.is_walkable(pos.offset(0, 1)) && !grid.is_walkable(pos.offset(-dir.dx, 1)))
                || (grid.is_walkable(pos.offset(0, -1)) && !grid.is_walkable(pos.offset(-dir.dx, -1)))
        } else {
            (grid.is_walkable(pos.offset(1, 0)) && !grid.is_walkable(pos.offset(1, -dir.dy)))
                || (grid.is_walkable(pos.offset(-1, 0)) && !grid.is_walkable(pos.offset(-1, -dir.dy)))
        };
        if forced {
            return Some(pos);
        }
        pos = pos.offset(dir.dx, dir.dy);
    }
}

/// Scan from `pos` (inclusive) in `dir`, returning the first jump point.
fn jump(grid: &Grid, pos: GridPos, dir: Direction, goal: GridPos) -> Option<GridPos> {
    if !dir.is_diagonal() {
        return jump_straight(grid, pos, dir, goal);
    }
    let mut pos = pos;
    loop {
        if !grid.is_walkable(pos) {
            return None;
        }
        if pos == goal {
            return Some(pos);
        }
        if jump_straight(grid, pos.offset(dir.dx, 0), Direction::new(dir.dx, 0), goal).is_some()
            || jump_straight(grid, pos.offset(0, dir.dy), Direction::new(0, dir.dy), goal).is_some()
        {
            return Some(pos);
        }
        if grid.is_walkable(pos.offset(dir.dx, 0)) && grid.is_walkable(pos.offset(0, dir.dy)) {
            pos = pos.offset(dir.dx, dir.dy);
        } else {
            return None;
        }
    }
}

/// Neighbors worth scanning from `pos` given the direction it was reached in.
fn pruned_neighbors(grid: &Grid, pos: GridPos, parent: Option<GridPos>) -> Vec<GridPos> {
    let Some(parent) = parent else {
        return grid.neighbors(pos);
    };
    let dir = Direction::between(parent, pos);
    let walkable = |dx: i32, dy: i32| grid.is_walkable(pos.offset(dx, dy));
    let mut out = Vec::with_capacity(5);

    if dir.is_diagonal() {
        let (vertical, horizontal) = (walkable(0, dir.dy), walkable(dir.dx, 0));
        if vertical {
            out.push(pos.offset(0, dir.dy));
        }
        if horizontal {
            out.push(pos.offset(dir.dx, 0));
        }
        if vertical && horizontal && walkable(dir.dx, dir.dy) {
            out.push(pos.offset(dir.dx, dir.dy));
        }
    } else if dir.dx != 0 {
        let (next, up, down) = (walkable(dir.dx, 0), walkable(0, 1), walkable(0, -1));
        if next {
            out.push(pos.offset(dir.dx, 0));
            if up && walkable(dir.dx, 1) {
                out.push(pos.offset(dir.dx, 1));
            }
            if down && walkable(dir.dx, -1) {
                out.push(pos.offset(dir.dx, -1));
            }
        }
        if up {
            out.push(pos.offset(0, 1));
        }
        if down {
            out.push(pos.offset(0, -1));
        }
    } else {
        let (next, right, left) = (walkable(0, dir.dy), walkable(1, 0), walkable(-1, 0));
        if next {
            out.push(pos.offset(0, dir.dy));
            if right && walkable(1, dir.dy) {
                out.push(pos.offset(1, dir.dy));
            }
            if left && walkable(-1, dir.dy) {
                out.push(pos.offset(-1, dir.dy));
            }
        }
        if right {
            out.push(pos.offset(1, 0));
        }
        if left {
            out.push(pos.offset(-1, 0));
        }
    }
    out
}

/// Expand consecutive jump points into every traversed cell.
fn build_path(jump_points: &[GridPos]) -> Path2D {
    let mut cells: Vec<GridPos> = Vec::new();
    for (i, &jp) in jump_points.iter().enumerate() {
        if i == 0 {
            cells.push(jp);
            continue;
        }
        let mut current = jump_points[i - 1];
        let dir = Direction::between(current, jp);
        while current != jp {
            current = current.offset(dir.dx, dir.dy);
            cells.push(current);
        }
    }
    Path2D::from_cells(&cells)
}

impl PathPlanner for JPSPlanner {
    fn name(&self) -> &'static str {
        "JPS"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Optimized
    }

    fn required_capabilities(&self) -> &'static [MapCapability] {
        &[MapCapability::UniformOctileMovement]
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        let (start_idx, goal_idx) = match begin_search(map, start, goal, self.required_capabilities()) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        if start == goal {
            stats.diag("jump_points_found", 0usize);
            return trivial_result(stats, start);
        }

        let weight = self.config.heuristic_weight.max(1.0);
        let (grid, state) = map.split_mut();
        let mut open = OpenList::new();
        let mut jump_points_found = 0usize;
        let mut closed_count = 0usize;

        state[start_idx].g = 0.0;
        state[start_idx].h = calc_distance(start, goal);
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
            closed_count += 1;
            stats.iterate();

            if current == goal_idx {
                stats.diag("jump_points_found", jump_points_found);
                stats.diag("expansion_ratio", closed_count as f64 / grid.cell_count() as f64);
                let cost = state[goal_idx].g;
                let Some(chain) = state.trace_parents(goal_idx) else {
                    return stats.failed(PlanningError::NoPathExists);
                };
                let jump_cells: Vec<GridPos> = chain.into_iter().map(|i| grid.position(i)).collect();
                return stats.found(build_path(&jump_cells), cost);
            }
            stats.expand();

            let pos = grid.position(current);
            let parent = state[current].parent.map(|p| grid.position(p));
            for neighbor in pruned_neighbors(grid, pos, parent) {
                let dir = Direction::between(pos, neighbor);
                let Some(jp) = jump(grid, neighbor, dir, goal) else { continue };
                let Some(j) = grid.index(jp) else { continue };
                if state[j].closed {
                    continue;
                }
                let tentative = state[current].g + calc_distance(pos, jp);
                if tentative < state[j].g {
                    if state[j].g.is_infinite() {
                        jump_points_found += 1;
                        stats.visit();
                    }
                    let cell = &mut state[j];
                    cell.g = tentative;
                    cell.h = calc_distance(jp, goal);
                    cell.f = tentative + weight * cell.h;
                    cell.parent = Some(current);
                    cell.open = true;
                    open.push(float_key(cell.f), j);
                }
            }
            stats.frontier(open.len());
        }

        stats.diag("jump_points_found", jump_points_found);
        stats.diag("expansion_ratio", closed_count as f64 / grid.cell_count() as f64);
        stats.failed(PlanningError::NoPathExists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::path_planning::AStarPlanner;
    use crate::utils::{Connectivity, Terrain};

    fn create_obstacle_map() -> GridMap {
        let mut map = GridMap::new(21, 21);
        map.grid_mut().fill_rect(GridPos::new(10, 0), GridPos::new(10, 14), false);
        map.grid_mut().fill_rect(GridPos::new(4, 8), GridPos::new(8, 8), false);
        map
    }

    #[test]
    fn test_jps_finds_path() {
        let mut map = create_obstacle_map();
        let result = JPSPlanner::default().find_path(&mut map, GridPos::new(2, 2), GridPos::new(18, 2));
        assert!(result.found());
        assert_eq!(result.path().first().map(|p| p.to_grid()), Some(GridPos::new(2, 2)));
        assert_eq!(result.path().last().map(|p| p.to_grid()), Some(GridPos::new(18, 2)));
        for pair in result.path().points.windows(2) {
            let (a, b) = (pair[0].to_grid(), pair[1].to_grid());
            assert!(map.grid().edge_cost(a, b).is_finite(), "illegal step {} -> {}", a, b);
        }
    }

    #[test]
    fn test_jps_matches_a_star_cost() {
        let mut map = create_obstacle_map();
        let start = GridPos::new(1, 12);
        let goal = GridPos::new(19, 3);
        let jps = JPSPlanner::default().find_path(&mut map, start, goal);
        let a_star = AStarPlanner::default().find_path(&mut map, start, goal);
        assert_relative_eq!(jps.cost(), a_star.cost(), epsilon = 1e-9);
        assert!(jps.nodes_expanded() <= a_star.nodes_expanded());
    }

    #[test]
    fn test_jps_no_path() {
        let mut map = GridMap::new(10, 10);
        map.grid_mut().fill_rect(GridPos::new(0, 5), GridPos::new(9, 5), false);
        let result = JPSPlanner::default().find_path(&mut map, GridPos::new(1, 1), GridPos::new(8, 8));
        assert!(!result.found());
        assert_eq!(result.failure_reason(), Some("NoPathExists"));
    }

    #[test]
    fn test_jps_diagonal_path() {
        let mut map = GridMap::new(10, 10);
        let result = JPSPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(9, 9));
        assert!(result.found());
        assert_relative_eq!(result.cost(), 9.0 * std::f64::consts::SQRT_2, epsilon = 1e-9);
        assert_eq!(result.path().len(), 10);
        assert_eq!(result.nodes_expanded(), 1);
    }

    #[test]
    fn test_jps_rejects_unsupported_maps() {
        let mut four = GridMap::new(5, 5).with_connectivity(Connectivity::Four);
        let result = JPSPlanner::default().find_path(&mut four, GridPos::new(0, 0), GridPos::new(4, 4));
        assert_eq!(result.failure_reason(), Some("UnsupportedMapCapability"));

        let mut weighted = GridMap::new(5, 5);
        weighted.set_terrain(GridPos::new(2, 2), Terrain::Mud).unwrap();
        let result = JPSPlanner::default().find_path(&mut weighted, GridPos::new(0, 0), GridPos::new(4, 4));
        assert_eq!(result.failure_reason(), Some("UnsupportedMapCapability"));

        let mut cutting = GridMap::new(5, 5).with_corner_cutting(true);
        let result = JPSPlanner::default().find_path(&mut cutting, GridPos::new(0, 0), GridPos::new(4, 4));
        assert_eq!(result.failure_reason(), Some("UnsupportedMapCapability"));
    }

    #[test]
    fn test_build_path_interpolates() {
        let path = build_path(&[GridPos::new(0, 0), GridPos::new(2, 2), GridPos::new(2, 5)]);
        assert_eq!(path.len(), 6);
        assert!(path.contains_cell(GridPos::new(1, 1)));
        assert!(path.contains_cell(GridPos::new(2, 4)));
    }
}
