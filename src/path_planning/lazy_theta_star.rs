//! Lazy Theta* path planning algorithm
//!
//! Lazy Theta* postpones Theta*'s line-of-sight test from generation to
//! expansion. A generated node is optimistically linked to the expanding
//! node's parent. When the node is later popped its link is verified; on
//! failure the parent is recomputed from the old parent's closed neighbors
//! that can see the node, falling back to the node's own closed grid
//! neighbors. This repair is a local approximation, not a re-search.
//!
//! Reference: Nash, A., Koenig, S., & Tovey, C. (2010).
//! "Lazy Theta*: Any-Angle Path Planning and Path Length Analysis in 3D"

use log::trace;

use crate::common::{
    AlgorithmCategory, GridPos, LineOfSight, MapCapability, PathPlanner, PlanningError,
    PlanningResult, SearchStats, SpatialMap,
};
use crate::path_planning::theta_star::{euclidean_distance, ThetaStarConfig};
use crate::path_planning::{begin_search, cell_path, trivial_result};
use crate::utils::frontier::{float_key, OpenList};
use crate::utils::{Grid, GridMap, SearchState};

/// Lazy Theta* path planner
#[derive(Debug, Clone, Default)]
pub struct LazyThetaStarPlanner {
    config: ThetaStarConfig,
}

impl LazyThetaStarPlanner {
    pub fn new(config: ThetaStarConfig) -> Self {
        LazyThetaStarPlanner { config }
    }
}

/// Re-link `node` after its optimistic parent turned out to be hidden.
fn repair_parent(grid: &Grid, los: &dyn LineOfSight, state: &mut SearchState, node: usize, old_parent: usize) {
    let pos = grid.position(node);
    let mut best: Option<(f64, usize)> = None;

    for q in grid.neighbors(grid.position(old_parent)) {
        let Some(qi) = grid.index(q) else { continue };
        if qi == node || !state[qi].closed || !los.line_of_sight(q, pos) {
            continue;
        }
        let cost = state[qi].g + euclidean_distance(q, pos);
        if best.map_or(true, |(c, _)| cost < c) {
            best = Some((cost, qi));
        }
    }

    if best.is_none() {
        for q in grid.neighbors(pos) {
            let Some(qi) = grid.index(q) else { continue };
            if !state[qi].closed {
                continue;
            }
            let cost = state[qi].g + grid.edge_cost(q, pos);
            if best.map_or(true, |(c, _)| cost < c) {
                best = Some((cost, qi));
            }
        }
    }

    if let Some((cost, parent)) = best {
        state[node].g = cost;
        state[node].parent = Some(parent);
        state[node].parent_point = Some(grid.position(parent).to_point());
    }
}

impl PathPlanner for LazyThetaStarPlanner {
    fn name(&self) -> &'static str {
        "Lazy Theta*"
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
        stats.diag("algorithm_type", "lazy");
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
        let mut los_failures = 0usize;
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
            stats.iterate();

            let pos = grid.position(current);
            if let Some(parent) = state[current].parent {
                if !los.line_of_sight(grid.position(parent), pos) {
                    los_failures += 1;
                    trace!("[LazyTheta] no line of sight {} -> {}", grid.position(parent), pos);
                    repair_parent(grid, los, state, current, parent);
                }
            }
            state[current].closed = true;
            state[current].open = false;

            if current == goal_idx {
                stats.diag("los_failures", los_failures);
                let cost = state[goal_idx].g;
                return match cell_path(grid, state, goal_idx) {
                    Some(path) => stats.found(path, cost),
                    None => stats.failed(PlanningError::NoPathExists),
                };
            }
            stats.expand();

            // optimistic link: the expanding node's parent, or the node itself at the root
            let anchor = state[current].parent.unwrap_or(current);
            let anchor_pos = grid.position(anchor);
            for next in grid.neighbors(pos) {
                let Some(n) = grid.index(next) else { continue };
                if state[n].closed {
                    continue;
                }
                let tentative = state[anchor].g + euclidean_distance(anchor_pos, next);
                if tentative < state[n].g {
                    if state[n].g.is_infinite() {
                        stats.visit();
                    }
                    let cell = &mut state[n];
                    cell.g = tentative;
                    cell.h = euclidean_distance(next, goal);
                    cell.f = tentative + weight * cell.h;
                    cell.parent = Some(anchor);
                    cell.parent_point = Some(anchor_pos.to_point());
                    cell.open = true;
                    open.push(float_key(cell.f), n);
                }
            }
            stats.frontier(open.len());
        }

        stats.diag("los_failures", los_failures);
        stats.failed(PlanningError::NoPathExists)
    }
}
