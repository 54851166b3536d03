//! Recursive Best-First Search (RBFS)
//!
//! Linear-memory best-first search. Each level keeps its successors sorted
//! by f and descends into the best one with a limit of
//! `min(parent limit, second best f)`. When a probe fails, the child's f is
//! overwritten with the backed-up bound it returned. The overwritten value
//! stays in the map's scratch cell, and a later branch that reaches the same
//! cell at the same g starts from it instead of the raw `g + h`.
//!
//! The recursion is driven by an explicit frame stack.
//!
//! Reference: Korf, R. E. (1993). "Linear-space best-first search"

use log::{debug, trace};
use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, SearchStats,
    SpatialMap,
};
use crate::path_planning::{begin_search, goal_reachable, trivial_result};
use crate::utils::search_state::CONSISTENCY_EPSILON;
use crate::utils::{Grid, GridMap, Heuristic, SearchState};

/// Configuration for RBFS planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RBFSConfig {
    /// Heuristic; `None` picks the tightest admissible one for the map's connectivity
    pub heuristic: Option<Heuristic>,
    /// Maximum number of node entries before giving up
    pub max_iterations: usize,
}

impl Default for RBFSConfig {
    fn default() -> Self {
        Self { heuristic: None, max_iterations: 1_000_000 }
    }
}

/// RBFS path planner
#[derive(Debug, Clone, Default)]
pub struct RBFSPlanner {
    config: RBFSConfig,
}

impl RBFSPlanner {
    pub fn new(config: RBFSConfig) -> Self {
        RBFSPlanner { config }
    }
}

#[derive(Debug, Clone, Copy)]
struct Successor {
    cell: usize,
    g: f64,
    f: f64,
}

struct Frame {
    cell: usize,
    f_limit: f64,
    successors: Vec<Successor>,
}

/// Generate the successors of `cell` that are not on the current path.
fn successors(
    grid: &Grid,
    state: &mut SearchState,
    cell: usize,
    g: f64,
    f: f64,
    goal: GridPos,
    heuristic: Heuristic,
    stats: &mut SearchStats,
) -> Vec<Successor> {
    let pos = grid.position(cell);
    let mut out = Vec::new();
    for next in grid.neighbors(pos) {
        let Some(n) = grid.index(next) else { continue };
        if state[n].open {
            continue;
        }
        stats.visit();
        let g_next = g + grid.edge_cost(pos, next);
        let h = heuristic.estimate(next, goal);
        let mut f_next = (g_next + h).max(f);

        let cell_state = &mut state[n];
        let same_g = (cell_state.g - g_next).abs() <= CONSISTENCY_EPSILON;
        if same_g && cell_state.f.is_finite() {
            // a bound backed up by another branch through this cell
            f_next = f_next.max(cell_state.f);
        }
        if g_next < cell_state.g {
            cell_state.g = g_next;
            cell_state.h = h;
            cell_state.parent = Some(cell);
        }
        cell_state.f = f_next;
        out.push(Successor { cell: n, g: g_next, f: f_next });
    }
    out
}

impl PathPlanner for RBFSPlanner {
    fn name(&self) -> &'static str {
        "RBFS"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Optimized
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
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
        let (grid, state) = map.split_mut();
        if !goal_reachable(grid, state, start_idx, goal_idx) {
            debug!("[RBFS] goal {:?} is not reachable from {:?}", goal, start);
            return stats.failed(PlanningError::NoPathExists);
        }

        state[start_idx].g = 0.0;
        state[start_idx].h = heuristic.estimate(start, goal);
        state[start_idx].f = state[start_idx].h;
        stats.visit();

        let mut stack: Vec<Frame> = Vec::new();
        // (cell, g, f, f_limit) of the node being entered
        let mut entering = Some((start_idx, 0.0, state[start_idx].f, f64::INFINITY));
        let mut max_depth = 0usize;
        let mut entries = 0usize;

        loop {
            if let Some((cell, g, f, f_limit)) = entering.take() {
                if entries >= self.config.max_iterations {
                    debug!("[RBFS] gave up after {} node entries", entries);
                    stats.diag("max_depth", max_depth);
                    return stats.failed(PlanningError::IterationBudgetExceeded {
                        limit: self.config.max_iterations,
                    });
                }
                entries += 1;
                stats.iterate();

                if cell == goal_idx {
                    let mut cells: Vec<usize> = stack.iter().map(|frame| frame.cell).collect();
                    cells.push(cell);
                    stats.diag("max_depth", max_depth);
                    let path = Path2D::from_points(cells.into_iter().map(|i| grid.position(i).to_point()).collect());
                    return stats.found(path, g);
                }

                state[cell].open = true;
                let children = successors(grid, state, cell, g, f, goal, heuristic, &mut stats);
                if children.is_empty() {
                    state[cell].open = false;
                    if !back_up(&mut stack, state, f64::INFINITY) {
                        break;
                    }
                } else {
                    stats.expand();
                    stack.push(Frame { cell, f_limit, successors: children });
                    max_depth = max_depth.max(stack.len());
                    stats.frontier(stack.len());
                }
            }

            let Some(frame) = stack.last_mut() else { break };
            frame.successors.sort_by(|a, b| a.f.total_cmp(&b.f));
            let best = frame.successors[0];
            if best.f > frame.f_limit || best.f.is_infinite() {
                let bound = best.f;
                if let Some(done) = stack.pop() {
                    state[done.cell].open = false;
                    trace!("[RBFS] backing up {} from {}", bound, grid.position(done.cell));
                }
                if !back_up(&mut stack, state, bound) {
                    break;
                }
                continue;
            }
            let alternative = frame.successors.get(1).map_or(f64::INFINITY, |s| s.f);
            entering = Some((best.cell, best.g, best.f, frame.f_limit.min(alternative)));
        }

        stats.diag("max_depth", max_depth);
        stats.failed(PlanningError::NoPathExists)
    }
}

/// Store a failed probe's bound on the child the top frame descended into.
///
/// Returns false when the root itself failed.
fn back_up(stack: &mut [Frame], state: &mut SearchState, bound: f64) -> bool {
    let Some(frame) = stack.last_mut() else { return false };
    if let Some(best) = frame.successors.first_mut() {
        best.f = bound;
        state[best.cell].f = bound;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::path_planning::DijkstraPlanner;

    #[test]
    fn test_rbfs_open_diagonal() {
        let mut map = GridMap::new(6, 6);
        let result = RBFSPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(5, 5));
        assert!(result.found());
        assert_relative_eq!(result.cost(), 5.0 * std::f64::consts::SQRT_2, epsilon = 1e-9);
        assert_eq!(result.path().len(), 6);
    }

    #[test]
    fn test_rbfs_around_wall() {
        let mut map = GridMap::new(5, 5);
        map.grid_mut().fill_rect(GridPos::new(2, 0), GridPos::new(2, 2), false);
        let start = GridPos::new(0, 0);
        let goal = GridPos::new(4, 0);
        let result = RBFSPlanner::default().find_path(&mut map, start, goal);
        assert!(result.found());

        let mut walked = 0.0;
        for pair in result.path().points.windows(2) {
            let (a, b) = (pair[0].to_grid(), pair[1].to_grid());
            assert!(a.is_adjacent(&b));
            walked += map.grid().edge_cost(a, b);
        }
        assert_relative_eq!(walked, result.cost(), epsilon = 1e-9);

        let reference = DijkstraPlanner::new().distance_map(&mut map, start).unwrap();
        assert!(result.cost() >= reference.distance(goal) - 1e-9);
        assert!(result.diagnostic("max_depth").and_then(|d| d.as_count()).unwrap_or(0) >= 4);
    }

    #[test]
    fn test_rbfs_sealed_start() {
        let mut map = GridMap::new(6, 6);
        for pos in [GridPos::new(1, 0), GridPos::new(0, 1), GridPos::new(1, 1)] {
            map.set_obstacle(pos).unwrap();
        }
        let result = RBFSPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(5, 5));
        assert_eq!(result.failure_reason(), Some("NoPathExists"));
    }

    #[test]
    fn test_rbfs_walled_off_goal() {
        let mut map = GridMap::new(8, 8);
        map.grid_mut().fill_rect(GridPos::new(4, 0), GridPos::new(4, 7), false);
        let result = RBFSPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(7, 7));
        assert_eq!(result.failure(), Some(&PlanningError::NoPathExists));
        assert_eq!(result.nodes_expanded(), 0);
    }

    #[test]
    fn test_rbfs_budget() {
        let mut map = GridMap::new(8, 8);
        map.grid_mut().fill_rect(GridPos::new(4, 0), GridPos::new(4, 6), false);
        let mut planner = RBFSPlanner::new(RBFSConfig { max_iterations: 2, ..Default::default() });
        let result = planner.find_path(&mut map, GridPos::new(0, 0), GridPos::new(7, 0));
        assert_eq!(result.failure(), Some(&PlanningError::IterationBudgetExceeded { limit: 2 }));
    }

    #[test]
    fn test_back_up_overwrites_scratch_f() {
        let mut state = SearchState::new(4);
        let mut stack = vec![Frame {
            cell: 0,
            f_limit: f64::INFINITY,
            successors: vec![Successor { cell: 2, g: 1.0, f: 3.0 }],
        }];
        assert!(back_up(&mut stack, &mut state, 7.5));
        assert_eq!(state[2].f, 7.5);
        assert_eq!(stack[0].successors[0].f, 7.5);
        assert!(!back_up(&mut [], &mut state, 1.0));
    }
}
