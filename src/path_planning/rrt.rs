//! RRT (Rapidly-exploring Random Tree) path planning algorithm
//!
//! Sampling-based path planning algorithm that builds a tree by
//! randomly sampling the configuration space.
//!
//! Samples are drawn uniformly over the map's cell-center rectangle, or the
//! goal itself with probability `goal_bias`. The nearest tree node steps at
//! most `step_size` toward the sample and the new segment is checked by
//! dense interpolation against walkability. Failing within the iteration
//! budget reports `IterationBudgetExceeded`, never `NoPathExists`.

use log::debug;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, Point2D,
    SearchStats, SpatialMap,
};
use crate::path_planning::{begin_search, trivial_result};
use crate::utils::{Grid, GridMap, SamplingTree};

/// Configuration for RRT planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RRTConfig {
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
    /// RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for RRTConfig {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            max_iterations: 10_000,
            goal_bias: 0.1,
            goal_threshold: 0.5,
            collision_step: 0.1,
            seed: None,
        }
    }
}

/// Uniform sampler over the map's cell centers
pub(crate) struct Sampler {
    rng: StdRng,
    max_x: f64,
    max_y: f64,
}

impl Sampler {
    pub(crate) fn new(grid: &Grid, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Sampler {
            rng,
            max_x: grid.width().saturating_sub(1) as f64,
            max_y: grid.height().saturating_sub(1) as f64,
        }
    }

    pub(crate) fn sample(&mut self) -> Point2D {
        Point2D::new(self.rng.gen_range(0.0..=self.max_x), self.rng.gen_range(0.0..=self.max_y))
    }

    /// Goal with probability `bias`, else a uniform sample.
    pub(crate) fn sample_biased(&mut self, goal: Point2D, bias: f64) -> Point2D {
        if self.rng.gen::<f64>() < bias {
            goal
        } else {
            self.sample()
        }
    }
}

/// Move from `from` toward `toward` by at most `step`; `None` if they coincide.
pub(crate) fn steer(from: Point2D, toward: Point2D, step: f64) -> Option<Point2D> {
    let delta: Vector2<f64> = toward.to_vector() - from.to_vector();
    let distance = delta.norm();
    if distance <= f64::EPSILON {
        return None;
    }
    if distance <= step {
        return Some(toward);
    }
    Some(Point2D::from(from.to_vector() + delta * (step / distance)))
}

/// Tree path to `node` closed off at `goal`, with its cost.
pub(crate) fn goal_path(tree: &SamplingTree, node: usize, goal: Point2D) -> (Path2D, f64) {
    let mut points = tree.path_to_root(node);
    let last = tree.node(node).position;
    let tail = last.distance(&goal);
    if tail > 0.0 {
        points.push(goal);
    }
    (Path2D::from_points(points), tree.node(node).cost + tail)
}

/// One extension of `tree` toward `sample`; returns the new node index.
pub(crate) fn extend(
    grid: &Grid,
    tree: &mut SamplingTree,
    sample: Point2D,
    step_size: f64,
    collision_step: f64,
) -> Option<usize> {
    let nearest = tree.nearest(sample);
    let from = tree.node(nearest).position;
    let next = steer(from, sample, step_size)?;
    grid.segment_is_free(from, next, collision_step)
        .then(|| tree.add(next, nearest))
}

/// RRT path planner
#[derive(Debug, Clone, Default)]
pub struct RRTPlanner {
    config: RRTConfig,
}

impl RRTPlanner {
    pub fn new(config: RRTConfig) -> Self {
        RRTPlanner { config }
    }

    pub fn config(&self) -> &RRTConfig {
        &self.config
    }
}

impl PathPlanner for RRTPlanner {
    fn name(&self) -> &'static str {
        "RRT"
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
        stats.visit();
        stats.frontier(tree.len());

        for iteration in 0..config.max_iterations {
            stats.iterate();
            let sample = sampler.sample_biased(goal_point, config.goal_bias);
            let Some(node) = extend(grid, &mut tree, sample, config.step_size, config.collision_step) else {
                continue;
            };
            stats.expand();
            stats.visit();
            stats.frontier(tree.len());

            let position = tree.node(node).position;
            if position.distance(&goal_point) <= config.goal_threshold
                && grid.segment_is_free(position, goal_point, config.collision_step)
            {
                let used = iteration + 1;
                stats.diag("tree_size", tree.len());
                stats.diag("iterations_used", used);
                stats.diag("sampling_efficiency", used as f64 / config.max_iterations as f64);
                let (path, cost) = goal_path(&tree, node, goal_point);
                return stats.found(path, cost);
            }
        }

        debug!("[RRT] no connection after {} iterations, tree size {}", config.max_iterations, tree.len());
        stats.diag("tree_size", tree.len());
        stats.diag("iterations_used", config.max_iterations);
        stats.failed(PlanningError::IterationBudgetExceeded { limit: config.max_iterations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seeded(seed: u64) -> RRTPlanner {
        RRTPlanner::new(RRTConfig { seed: Some(seed), ..Default::default() })
    }

    fn create_wall_map() -> GridMap {
        let mut map = GridMap::new(20, 20);
        map.grid_mut().fill_rect(GridPos::new(10, 0), GridPos::new(10, 14), false);
        map
    }

    #[test]
    fn test_rrt_config_default() {
        let config = RRTConfig::default();
        assert_eq!(config.step_size, 1.0);
        assert_eq!(config.max_iterations, 10_000);
        assert_eq!(config.goal_threshold, 0.5);
    }

    #[test]
    fn test_steer_limits_step() {
        let from = Point2D::new(0.0, 0.0);
        let next = steer(from, Point2D::new(3.0, 4.0), 1.0).unwrap();
        assert_relative_eq!(next.x, 0.6, epsilon = 1e-12);
        assert_relative_eq!(next.y, 0.8, epsilon = 1e-12);
        let close = steer(from, Point2D::new(0.3, 0.0), 1.0).unwrap();
        assert_relative_eq!(close.x, 0.3, epsilon = 1e-12);
        assert!(steer(from, from, 1.0).is_none());
    }

    #[test]
    fn test_rrt_finds_path() {
        let mut map = create_wall_map();
        let result = seeded(7).find_path(&mut map, GridPos::new(2, 2), GridPos::new(17, 2));
        assert!(result.found());
        assert_eq!(result.path().first(), Some(&Point2D::new(2.0, 2.0)));
        assert_eq!(result.path().last(), Some(&Point2D::new(17.0, 2.0)));
        assert_relative_eq!(result.cost(), result.path_length(), epsilon = 1e-9);
        for pair in result.path().points.windows(2) {
            assert!(map.grid().segment_is_free(pair[0], pair[1], 0.1));
        }
        let used = result.diagnostic("iterations_used").and_then(|d| d.as_count()).unwrap();
        let efficiency = result.diagnostic("sampling_efficiency").and_then(|d| d.as_f64()).unwrap();
        assert_relative_eq!(efficiency, used as f64 / 10_000.0);
    }

    #[test]
    fn test_rrt_seed_is_deterministic() {
        let mut map = create_wall_map();
        let first = seeded(42).find_path(&mut map, GridPos::new(2, 2), GridPos::new(17, 2));
        let second = seeded(42).find_path(&mut map, GridPos::new(2, 2), GridPos::new(17, 2));
        assert_eq!(first.path(), second.path());
        assert_eq!(first.nodes_expanded(), second.nodes_expanded());
    }

    #[test]
    fn test_rrt_zero_iterations() {
        let mut map = GridMap::new(10, 10);
        let mut planner = RRTPlanner::new(RRTConfig { max_iterations: 0, seed: Some(1), ..Default::default() });
        let result = planner.find_path(&mut map, GridPos::new(0, 0), GridPos::new(9, 9));
        assert!(!result.found());
        assert_eq!(result.failure(), Some(&PlanningError::IterationBudgetExceeded { limit: 0 }));
        assert_eq!(result.nodes_expanded(), 0);
        assert_eq!(result.diagnostic("tree_size").and_then(|d| d.as_count()), Some(1));
    }

    #[test]
    fn test_rrt_failure_is_not_definitive() {
        let mut map = GridMap::new(10, 10);
        map.grid_mut().fill_rect(GridPos::new(5, 0), GridPos::new(5, 9), false);
        let mut planner = RRTPlanner::new(RRTConfig { max_iterations: 300, seed: Some(3), ..Default::default() });
        let result = planner.find_path(&mut map, GridPos::new(1, 1), GridPos::new(8, 8));
        assert_eq!(result.failure_reason(), Some("IterationBudgetExceeded"));
        assert!(!result.failure().unwrap().is_definitive());
        assert!(result.path().is_empty());
    }
}
