//! Dijkstra path planning and single-source distance maps
//!
//! Dijkstra is the best-first loop with a zero heuristic. The distance map
//! runs the same loop without a goal and is the exhaustive reference used to
//! check the informed planners.

use log::debug;

use crate::common::{
    AlgorithmCategory, GridPos, PathPlanner, PathfindingResult, PlanningError, PlanningResult,
    SearchStats, SpatialMap,
};
use crate::path_planning::a_star::best_first_search;
use crate::path_planning::{begin_search, trivial_result, validate_endpoints};
use crate::utils::frontier::{float_key, OpenList};
use crate::utils::{GridMap, Heuristic};

/// Dijkstra path planner
#[derive(Debug, Clone, Default)]
pub struct DijkstraPlanner;

impl DijkstraPlanner {
    pub fn new() -> Self {
        DijkstraPlanner
    }

    /// Shortest cost from `source` to every cell of the map.
    ///
    /// Uses the map's scratch arena, so it resets the search state like
    /// `find_path` does.
    pub fn distance_map(&self, map: &mut GridMap, source: GridPos) -> PathfindingResult<DistanceMap> {
        validate_endpoints(map.grid(), source, source)?;
        map.reset_search_state();
        let (grid, state) = map.split_mut();
        let source_idx = grid.index(source).ok_or(PlanningError::InvalidPosition { pos: source })?;

        let mut open = OpenList::new();
        state[source_idx].g = 0.0;
        open.push(float_key(0.0), source_idx);

        while let Some((_, current)) = open.pop() {
            if state[current].closed {
                continue;
            }
            state[current].closed = true;
            let pos = grid.position(current);
            let g_current = state[current].g;
            for next in grid.neighbors(pos) {
                let Some(n) = grid.index(next) else { continue };
                let tentative = g_current + grid.edge_cost(pos, next);
                if !state[n].closed && tentative < state[n].g {
                    state[n].g = tentative;
                    state[n].parent = Some(current);
                    open.push(float_key(tentative), n);
                }
            }
        }

        let distances: Vec<f64> = (0..grid.cell_count()).map(|i| state[i].g).collect();
        let reference = DistanceMap { width: grid.width(), height: grid.height(), distances };
        debug!("distance map from {}: {} reachable cells", source, reference.reachable_count());
        Ok(reference)
    }
}

impl PathPlanner for DijkstraPlanner {
    fn name(&self) -> &'static str {
        "Dijkstra"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Classical
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        let (start_idx, goal_idx) = match begin_search(map, start, goal, &[]) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        if start == goal {
            stats.diag("shortest_distance", 0.0);
            return trivial_result(stats, start);
        }
        match best_first_search(map, start_idx, goal_idx, Heuristic::Zero, 1.0, &mut stats) {
            Ok((path, cost)) => {
                stats.diag("shortest_distance", cost);
                stats.found(path, cost)
            }
            Err(e) => stats.failed(e),
        }
    }
}

/// Shortest costs from one source cell
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMap {
    width: usize,
    height: usize,
    distances: Vec<f64>,
}

impl DistanceMap {
    /// Cost to reach `pos`; infinite when unreachable or outside the map.
    pub fn distance(&self, pos: GridPos) -> f64 {
        if pos.x < 0 || pos.y < 0 || pos.x as usize >= self.width || pos.y as usize >= self.height {
            return f64::INFINITY;
        }
        self.distances[pos.y as usize * self.width + pos.x as usize]
    }

    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }
}
