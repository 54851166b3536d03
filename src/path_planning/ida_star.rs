//! IDA* (Iterative Deepening A*) path planning
//!
//! Depth-first probes bounded by an f-cost threshold. The first threshold is
//! `h(start)`; each probe that fails raises it to the smallest f that
//! overshot. Only cells on the current probe path are excluded, so memory
//! stays `O(depth)` and a cell can be re-entered along different branches.
//! The probe runs on an explicit frame stack in neighbor order.

use log::{debug, trace};
use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, SearchStats,
    SpatialMap,
};
use crate::path_planning::{begin_search, goal_reachable, trivial_result};
use crate::utils::{Grid, GridMap, Heuristic, SearchState};

/// Slack when comparing an f-cost against the threshold
const THRESHOLD_TOLERANCE: f64 = 1e-9;

/// Configuration for IDA* planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IDAStarConfig {
    /// Heuristic; `None` picks the tightest admissible one for the map's connectivity
    pub heuristic: Option<Heuristic>,
    /// Maximum number of threshold rounds
    pub max_iterations: usize,
    /// Maximum number of node expansions over all rounds
    pub max_expansions: usize,
}

impl Default for IDAStarConfig {
    fn default() -> Self {
        Self {
            heuristic: None,
            max_iterations: 1_000_000,
            max_expansions: 5_000_000,
        }
    }
}

/// IDA* path planner
#[derive(Debug, Clone, Default)]
pub struct IDAStarPlanner {
    config: IDAStarConfig,
}

impl IDAStarPlanner {
    pub fn new(config: IDAStarConfig) -> Self {
        IDAStarPlanner { config }
    }
}

struct Frame {
    cell: usize,
    g: f64,
    neighbors: Vec<GridPos>,
    next: usize,
}

enum Probe {
    Found { cells: Vec<usize>, cost: f64 },
    /// Nothing reached the goal; carries the smallest overshooting f
    Cutoff(f64),
}

struct Prober<'a> {
    grid: &'a Grid,
    state: &'a mut SearchState,
    goal_idx: usize,
    goal: GridPos,
    heuristic: Heuristic,
    expansions: usize,
    max_expansions: usize,
}

impl Prober<'_> {
    fn open_frame(&mut self, cell: usize, g: f64, stats: &mut SearchStats) -> Result<Frame, PlanningError> {
        if self.expansions >= self.max_expansions {
            return Err(PlanningError::IterationBudgetExceeded { limit: self.max_expansions });
        }
        self.expansions += 1;
        stats.expand();
        self.state[cell].open = true;
        Ok(Frame {
            cell,
            g,
            neighbors: self.grid.neighbors(self.grid.position(cell)),
            next: 0,
        })
    }

    /// One depth-first probe from `start_idx` bounded by `threshold`.
    fn probe(&mut self, start_idx: usize, threshold: f64, stats: &mut SearchStats) -> Result<Probe, PlanningError> {
        let mut next_threshold = f64::INFINITY;
        let root = self.open_frame(start_idx, 0.0, stats)?;
        let mut stack = vec![root];

        while let Some(top) = stack.last_mut() {
            if top.next >= top.neighbors.len() {
                if let Some(done) = stack.pop() {
                    self.state[done.cell].open = false;
                }
                continue;
            }
            let next = top.neighbors[top.next];
            top.next += 1;
            let (from_cell, from_g) = (top.cell, top.g);
            stats.visit();

            let Some(n) = self.grid.index(next) else { continue };
            if self.state[n].open {
                continue;
            }
            let g = from_g + self.grid.edge_cost(self.grid.position(from_cell), next);
            let f = g + self.heuristic.estimate(next, self.goal);
            if f > threshold + THRESHOLD_TOLERANCE {
                next_threshold = next_threshold.min(f);
                continue;
            }
            if n == self.goal_idx {
                let mut cells: Vec<usize> = stack.iter().map(|frame| frame.cell).collect();
                cells.push(n);
                for &cell in &cells {
                    self.state[cell].open = false;
                }
                return Ok(Probe::Found { cells, cost: g });
            }
            let frame = self.open_frame(n, g, stats)?;
            stack.push(frame);
            stats.frontier(stack.len());
        }

        Ok(Probe::Cutoff(next_threshold))
    }
}

impl PathPlanner for IDAStarPlanner {
    fn name(&self) -> &'static str {
        "IDA*"
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
            debug!("[IDAStar] goal {:?} is not reachable from {:?}", goal, start);
            return stats.failed(PlanningError::NoPathExists);
        }
        let mut prober = Prober {
            grid,
            state,
            goal_idx,
            goal,
            heuristic,
            expansions: 0,
            max_expansions: self.config.max_expansions,
        };

        let mut threshold = heuristic.estimate(start, goal);
        let mut thresholds = Vec::new();
        let mut rounds = 0usize;
        while rounds < self.config.max_iterations {
            thresholds.push(threshold);
            rounds += 1;
            stats.iterate();
            trace!("[IDAStar] round {} threshold {:.4}", rounds, threshold);

            let probe = match prober.probe(start_idx, threshold, &mut stats) {
                Ok(probe) => probe,
                Err(e) => {
                    stats.diag("thresholds", thresholds);
                    stats.diag("ida_iterations", rounds);
                    return stats.failed(e);
                }
            };
            match probe {
                Probe::Found { cells, cost } => {
                    stats.diag("thresholds", thresholds);
                    stats.diag("final_threshold", threshold);
                    stats.diag("ida_iterations", rounds);
                    let path = Path2D::from_points(cells.into_iter().map(|i| grid.position(i).to_point()).collect());
                    return stats.found(path, cost);
                }
                Probe::Cutoff(next) if next.is_infinite() => {
                    stats.diag("thresholds", thresholds);
                    stats.diag("ida_iterations", rounds);
                    return stats.failed(PlanningError::NoPathExists);
                }
                Probe::Cutoff(next) => threshold = next,
            }
        }

        debug!("[IDAStar] gave up after {} threshold rounds", rounds);
        stats.diag("thresholds", thresholds);
        stats.diag("ida_iterations", rounds);
        stats.failed(PlanningError::IterationBudgetExceeded { limit: self.config.max_iterations })
    }
}
