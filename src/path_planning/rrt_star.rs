//! RRT* path planning algorithm
//!
//! RRT with two refinements around every inserted node: the cheapest
//! collision-free parent within `rewiring_radius` is chosen instead of the
//! nearest node, and every neighbor that becomes cheaper through the new
//! node is re-parented onto it. Re-parenting refreshes the cost of the
//! neighbor's whole subtree.
//!
//! With `search_until_max_iterations` the planner keeps growing the tree
//! after the first goal connection and returns the cheapest connection found
//! once the budget is spent.
//!
//! Reference: Karaman, S., & Frazzoli, E. (2011). "Sampling-based algorithms
//! for optimal motion planning"

use log::{debug, trace};
use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, PathPlanner, PlanningError, PlanningResult, Point2D, SearchStats,
};
use crate::path_planning::rrt::{goal_path, steer, Sampler};
use crate::path_planning::{begin_search, trivial_result};
use crate::utils::{Grid, GridMap, SamplingTree};

/// Minimum cost improvement for a rewire
const REWIRE_TOLERANCE: f64 = 1e-9;

/// Configuration for RRT* planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RRTStarConfig {
    /// Maximum distance covered by one extension
    pub step_size: f64,
    /// Maximum iterations
    pub max_iterations: usize,
    /// Probability of sampling the goal instead of a random point
    pub goal_bias: f64,
    /// A node this close to the goal may try to connect to it
    pub goal_threshold: f64,
    /// Interpolation step for segment collision checks
    pub collision_step: f64,
    /// Neighborhood radius for parent choice and rewiring
    pub rewiring_radius: f64,
    /// Keep refining until the budget instead of returning the first connection
    pub search_until_max_iterations: bool,
    /// RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for RRTStarConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            max_iterations: 10_000,
            goal_bias: 0.1,
            goal_threshold: 0.5,
            collision_step: 0.1,
            rewiring_radius: 2.0,
            search_until_max_iterations: false,
            seed: None,
        }
    }
}

/// RRT* path planner
#[derive(Debug, Clone, Default)]
pub struct RRTStarPlanner {
    config: RRTStarConfig,
}

impl RRTStarPlanner {
    pub fn new(config: RRTStarConfig) -> Self {
        RRTStarPlanner { config }
    }

    pub fn config(&self) -> &RRTStarConfig {
        &self.config
    }

    /// Cheapest collision-free parent for `position` among `near`, starting
    /// from `fallback`.
    fn choose_parent(&self, grid: &Grid, tree: &SamplingTree, position: Point2D, near: &[usize], fallback: usize) -> usize {
        let cost_via = |i: usize| tree.node(i).cost + tree.node(i).position.distance(&position);
        let mut best = fallback;
        let mut best_cost = cost_via(fallback);
        for &i in near {
            let cost = cost_via(i);
            if cost < best_cost
                && grid.segment_is_free(tree.node(i).position, position, self.config.collision_step)
            {
                best = i;
                best_cost = cost;
            }
        }
        best
    }

    /// Re-parent every neighbor that gets cheaper through `node`.
    fn rewire(&self, grid: &Grid, tree: &mut SamplingTree, node: usize, near: &[usize]) -> usize {
        let mut rewired = 0;
        for &i in near {
            if i == node || tree.node(node).parent == Some(i) {
                continue;
            }
            let via_new = tree.node(node).cost + tree.node(node).position.distance(&tree.node(i).position);
            if via_new + REWIRE_TOLERANCE < tree.node(i).cost
                && grid.segment_is_free(tree.node(node).position, tree.node(i).position, self.config.collision_step)
                && tree.reparent(i, node)
            {
                rewired += 1;
            }
        }
        rewired
    }
}

impl PathPlanner for RRTStarPlanner {
    fn name(&self) -> &'static str {
        "RRT*"
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
        let goal_point = goal.to_point();
        let mut tree = SamplingTree::new(start.to_point());
        let mut sampler = Sampler::new(grid, config.seed);
        let mut goal_candidates: Vec<usize> = Vec::new();
        let mut rewires = 0usize;
        let mut used = 0usize;
        stats.visit();
        stats.frontier(tree.len());

        for iteration in 0..config.max_iterations {
            stats.iterate();
            used = iteration + 1;
            let sample = sampler.sample_biased(goal_point, config.goal_bias);
            let nearest = tree.nearest(sample);
            let from = tree.node(nearest).position;
            let Some(position) = steer(from, sample, config.step_size) else { continue };
            if !grid.segment_is_free(from, position, config.collision_step) {
                continue;
            }

            let near = tree.near(position, config.rewiring_radius);
            let parent = self.choose_parent(grid, &tree, position, &near, nearest);
            let node = tree.add(position, parent);
            rewires += self.rewire(grid, &mut tree, node, &near);
            stats.expand();
            stats.visit();
            stats.frontier(tree.len());

            if position.distance(&goal_point) <= config.goal_threshold
                && grid.segment_is_free(position, goal_point, config.collision_step)
            {
                goal_candidates.push(node);
                if !config.search_until_max_iterations {
                    break;
                }
                trace!("[RRTStar] goal connection {} at iteration {}", goal_candidates.len(), used);
            }
        }

        stats.diag("tree_size", tree.len());
        stats.diag("iterations_used", used);
        stats.diag("rewires", rewires);

        // rewiring may have lowered a candidate's cost since it connected
        let best = goal_candidates.iter().copied().min_by(|&a, &b| {
            let cost = |i: usize| tree.node(i).cost + tree.node(i).position.distance(&goal_point);
            cost(a).total_cmp(&cost(b))
        });
        match best {
            Some(node) => {
                if config.max_iterations > 0 {
                    stats.diag("sampling_efficiency", used as f64 / config.max_iterations as f64);
                }
                stats.diag("goal_connections", goal_candidates.len());
                let (path, cost) = goal_path(&tree, node, goal_point);
                stats.found(path, cost)
            }
            None => {
                debug!("[RRTStar] no connection after {} iterations, tree size {}", used, tree.len());
                stats.failed(PlanningError::IterationBudgetExceeded { limit: config.max_iterations })
            }
        }
    }
}
