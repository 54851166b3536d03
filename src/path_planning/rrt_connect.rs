//! RRT-Connect path planning algorithm
//!
//! Two trees grow from start and goal. Even iterations extend the start tree
//! toward a uniform sample, odd iterations the goal tree. After a successful
//! extension the new node tries a direct collision-free segment to the
//! nearest node of the other tree; the first such segment joins the trees.
//!
//! Reference: Kuffner, J. J., & LaValle, S. M. (2000). "RRT-Connect: An
//! Efficient Approach to Single-Query Path Planning"

use log::debug;

use crate::common::{
    AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, SearchStats,
};
use crate::path_planning::rrt::{extend, RRTConfig, Sampler};
use crate::path_planning::{begin_search, trivial_result};
use crate::utils::{GridMap, SamplingTree};

/// RRT-Connect path planner
///
/// Uses the step, budget, collision step and seed of [`RRTConfig`]; goal
/// bias and goal threshold do not apply.
#[derive(Debug, Clone, Default)]
pub struct RRTConnectPlanner {
    config: RRTConfig,
}

impl RRTConnectPlanner {
    pub fn new(config: RRTConfig) -> Self {
        RRTConnectPlanner { config }
    }
}

/// Join the start-tree branch ending at `a` with the goal-tree branch ending at `b`.
fn joined_path(start_tree: &SamplingTree, a: usize, goal_tree: &SamplingTree, b: usize) -> (Path2D, f64) {
    let mut points = start_tree.path_to_root(a);
    let mut tail = goal_tree.path_to_root(b);
    tail.reverse();
    let bridge = start_tree.node(a).position.distance(&goal_tree.node(b).position);
    points.extend(tail);
    let cost = start_tree.node(a).cost + bridge + goal_tree.node(b).cost;
    (Path2D::from_points(points), cost)
}

impl PathPlanner for RRTConnectPlanner {
    fn name(&self) -> &'static str {
        "RRT-Connect"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Sampling
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        if let Err(e) = begin_search(map, start, goal, &[]) {
            return stats.failed(e);
        }
        if start == goal {
            return trivial_result(stats, start);
        }

        let config = &self.config;
        let grid = map.grid();
        let mut start_tree = SamplingTree::new(start.to_point());
        let mut goal_tree = SamplingTree::new(goal.to_point());
        let mut sampler = Sampler::new(grid, config.seed);
        stats.visit();
        stats.visit();
        stats.frontier(2);

        for iteration in 0..config.max_iterations {
            stats.iterate();
            let from_start = iteration % 2 == 0;
            let (grown, other) = if from_start {
                (&mut start_tree, &goal_tree)
            } else {
                (&mut goal_tree, &start_tree)
            };
            let sample = sampler.sample();
            let Some(node) = extend(grid, grown, sample, config.step_size, config.collision_step) else {
                continue;
            };
            stats.expand();
            stats.visit();

            let position = grown.node(node).position;
            let target = other.nearest(position);
            let connected = grid.segment_is_free(position, other.node(target).position, config.collision_step);
            stats.frontier(start_tree.len() + goal_tree.len());
            if connected {
                stats.diag("start_tree_size", start_tree.len());
                stats.diag("goal_tree_size", goal_tree.len());
                stats.diag("tree_size", start_tree.len() + goal_tree.len());
                stats.diag("iterations_used", iteration + 1);
                let (path, cost) = if from_start {
                    joined_path(&start_tree, node, &goal_tree, target)
                } else {
                    joined_path(&start_tree, target, &goal_tree, node)
                };
                return stats.found(path, cost);
            }
        }

        debug!(
            "[RRTConnect] trees never met after {} iterations ({} + {} nodes)",
            config.max_iterations,
            start_tree.len(),
            goal_tree.len()
        );
        stats.diag("start_tree_size", start_tree.len());
        stats.diag("goal_tree_size", goal_tree.len());
        stats.diag("tree_size", start_tree.len() + goal_tree.len());
        stats.failed(PlanningError::IterationBudgetExceeded { limit: config.max_iterations })
    }
}
