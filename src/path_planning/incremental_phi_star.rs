//! Incremental Phi* path planning algorithm
//!
//! Any-angle search in the D*-lite style: the search runs backward from the
//! goal and keeps `(g, rhs)` per cell, so that after walkability changes only
//! the affected cells are repaired. A cell's `rhs` is the best of its grid
//! edges and of the any-angle shortcut to a neighbor's parent when that
//! parent is visible. Keys are `(min(g, rhs) + ε·h, min(g, rhs))` with a
//! Euclidean `h` towards the current start; `ε > 1` trades optimality for
//! fewer expansions.
//!
//! [`IncrementalPhiStarPlanner::find_path`] always starts from scratch.
//! [`IncrementalPhiStarPlanner::replan`] reuses the previous search after map
//! edits and a possibly moved start. Before repairing, every cell whose
//! parent chain runs through an edited cell or a segment that lost line of
//! sight is reset, so the search that follows only ever lowers values.
//!
//! The reported cost is the sum of the returned segments.
//!
//! Reference: Nash, A., Koenig, S., & Likhachev, M. (2009).
//! "Incremental Phi*: Incremental Any-Angle Path Planning on Grids"

use log::{debug, trace, warn};
use serde::Deserialize;

use crate::common::{
    AlgorithmCategory, GridPos, LineOfSight, MapCapability, Path2D, PathPlanner, PlanningError,
    PlanningResult, SearchStats, SpatialMap,
};
use crate::path_planning::theta_star::euclidean_distance;
use crate::path_planning::{begin_search, trivial_result, validate_endpoints};
use crate::utils::frontier::{pair_key, OpenList, PairKey};
use crate::utils::{Grid, GridMap, SearchState};

const REQUIRED: &[MapCapability] = &[MapCapability::LineOfSight, MapCapability::ChangeTracking];
const TIE_TOLERANCE: f64 = 1e-9;

/// Configuration for Incremental Phi* planner
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhiStarConfig {
    /// Heuristic inflation; larger values expand fewer cells at the price of longer paths
    pub epsilon: f64,
}

impl Default for PhiStarConfig {
    fn default() -> Self {
        Self { epsilon: 2.5 }
    }
}

/// Search data kept between `find_path` and `replan`
#[derive(Debug)]
struct PhiSession {
    goal: GridPos,
    goal_idx: usize,
    epoch: u64,
    open: OpenList<PairKey>,
    /// cells that took the indexed cell as a non-adjacent parent
    dependents: Vec<Vec<usize>>,
}

/// Incremental Phi* path planner
#[derive(Debug, Default)]
pub struct IncrementalPhiStarPlanner {
    config: PhiStarConfig,
    session: Option<PhiSession>,
}

impl IncrementalPhiStarPlanner {
    pub fn new(config: PhiStarConfig) -> Self {
        let mut config = config;
        if !(config.epsilon >= 1.0) {
            warn!("epsilon {} is below 1, clamping to 1", config.epsilon);
            config.epsilon = 1.0;
        }
        IncrementalPhiStarPlanner { config, session: None }
    }

    /// Whether a previous search can be repaired by [`replan`](Self::replan).
    pub fn has_active_plan(&self) -> bool {
        self.session.is_some()
    }

    /// Repair the previous search after map edits and return a path from
    /// `start` to the goal of the last `find_path`.
    ///
    /// Consumes and clears the map's change flags. Falls back to a fresh
    /// search when another engine has reset the map's scratch state since.
    pub fn replan(&mut self, map: &mut GridMap, start: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        stats.diag("path_type", "any_angle");
        stats.diag("epsilon", self.config.epsilon);

        let Some(goal) = self.session.as_ref().map(|s| s.goal) else {
            return stats.failed(PlanningError::NoActivePlan);
        };
        if let Err(e) = validate_endpoints(map.grid(), start, goal) {
            return stats.failed(e);
        }
        if let Some(&capability) = REQUIRED.iter().find(|&&c| !map.grid().supports(c)) {
            return stats.failed(PlanningError::UnsupportedMapCapability { capability });
        }
        let stale = self.session.as_ref().map_or(true, |s| s.epoch != map.search_epoch());
        if stale {
            debug!("[PhiStar] scratch state was reused by another search, planning from scratch");
            return self.find_path(map, start, goal);
        }

        let changed = map.changed_cells();
        map.clear_change_flags();
        stats.diag("incremental", true);
        stats.diag("changed_cells", changed.len());

        let epsilon = self.config.epsilon;
        let (grid, state) = map.split_mut();
        let (Some(los), Some(session)) = (grid.line_of_sight_support(), self.session.as_mut()) else {
            return stats.failed(PlanningError::NoActivePlan);
        };
        let mut search = PhiSearch { grid, los, state, session, start, epsilon, stats: &mut stats };
        search.repair(&changed);
        if start == goal {
            return trivial_result(stats, start);
        }
        search.compute();
        let outcome = search.extract_path();
        match outcome {
            Ok((path, cost)) => stats.found(path, cost),
            Err(e) => stats.failed(e),
        }
    }
}

impl PathPlanner for IncrementalPhiStarPlanner {
    fn name(&self) -> &'static str {
        "Incremental Phi*"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::AnyAngle
    }

    fn required_capabilities(&self) -> &'static [MapCapability] {
        REQUIRED
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        stats.diag("path_type", "any_angle");
        stats.diag("epsilon", self.config.epsilon);
        stats.diag("incremental", false);
        self.session = None;

        let (_, goal_idx) = match begin_search(map, start, goal, REQUIRED) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        map.clear_change_flags();

        let cells = map.grid().cell_count();
        let session = self.session.insert(PhiSession {
            goal,
            goal_idx,
            epoch: map.search_epoch(),
            open: OpenList::new(),
            dependents: vec![Vec::new(); cells],
        });
        let epsilon = self.config.epsilon;
        let (grid, state) = map.split_mut();
        let Some(los) = grid.line_of_sight_support() else {
            return stats.failed(PlanningError::UnsupportedMapCapability {
                capability: MapCapability::LineOfSight,
            });
        };

        let mut search = PhiSearch { grid, los, state, session, start, epsilon, stats: &mut stats };
        search.state[goal_idx].rhs = 0.0;
        search.enqueue(goal_idx);
        if start == goal {
            return trivial_result(stats, start);
        }
        search.compute();
        let outcome = search.extract_path();
        match outcome {
            Ok((path, cost)) => stats.found(path, cost),
            Err(e) => stats.failed(e),
        }
    }
}

/// One pass of the incremental search over borrowed map state
struct PhiSearch<'a> {
    grid: &'a Grid,
    los: &'a dyn LineOfSight,
    state: &'a mut SearchState,
    session: &'a mut PhiSession,
    start: GridPos,
    epsilon: f64,
    stats: &'a mut SearchStats,
}

impl<'a> PhiSearch<'a> {
    fn key(&self, i: usize) -> PairKey {
        let m = self.state[i].g.min(self.state[i].rhs);
        pair_key(m + self.epsilon * euclidean_distance(self.start, self.grid.position(i)), m)
    }

    fn enqueue(&mut self, i: usize) {
        let key = self.key(i);
        self.session.open.push(key, i);
        self.state[i].open = true;
        self.stats.visit();
        self.stats.frontier(self.session.open.len());
    }

    /// Cost of the straight segment from cell `i` to `parent`, or `None` when
    /// it cannot be travelled. Adjacent cells use the grid move cost, longer
    /// segments their length and need line of sight.
    fn segment_cost(&self, i: usize, parent: usize) -> Option<f64> {
        let (pos, parent_pos) = (self.grid.position(i), self.grid.position(parent));
        if pos.is_adjacent(&parent_pos) {
            let cost = self.grid.edge_cost(pos, parent_pos);
            return cost.is_finite().then_some(cost);
        }
        let visible = self.grid.is_walkable(pos)
            && self.grid.is_walkable(parent_pos)
            && self.los.line_of_sight(pos, parent_pos);
        visible.then(|| euclidean_distance(pos, parent_pos))
    }

    fn cost_via(&self, i: usize, parent: usize) -> Option<f64> {
        let g = self.state[parent].g;
        if g.is_infinite() {
            return None;
        }
        self.segment_cost(i, parent).map(|segment| g + segment)
    }

    /// Cheapest one-step lookahead for cell `i` and the parent providing it.
    ///
    /// The current parent stays a candidate while its segment holds, so the
    /// lookahead never rises while `g` values only fall.
    fn best_rhs(&self, i: usize) -> (f64, Option<usize>) {
        let pos = self.grid.position(i);
        if !self.grid.is_walkable(pos) {
            return (f64::INFINITY, None);
        }
        let mut best = (f64::INFINITY, None);
        if let Some(p) = self.state[i].parent {
            if let Some(cost) = self.cost_via(i, p) {
                best = (cost, Some(p));
            }
        }
        for next in self.grid.neighbors(pos) {
            let Some(n) = self.grid.index(next) else { continue };
            if let Some(cost) = self.cost_via(i, n) {
                if cost < best.0 {
                    best = (cost, Some(n));
                }
            }
            let Some(p) = self.state[n].parent else { continue };
            if p == i || best.1 == Some(p) {
                continue;
            }
            if let Some(cost) = self.cost_via(i, p) {
                // ties go to the shortcut so straight runs collapse into one segment
                if cost <= best.0 + TIE_TOLERANCE {
                    best = (cost, Some(p));
                }
            }
        }
        best
    }

    fn update_vertex(&mut self, i: usize) {
        if i != self.session.goal_idx {
            let previous = self.state[i].parent;
            let (rhs, parent) = self.best_rhs(i);
            let parent_point = parent.map(|p| self.grid.position(p).to_point());
            let cell = &mut self.state[i];
            cell.rhs = rhs;
            cell.parent = parent;
            cell.parent_point = parent_point;
            if let Some(p) = parent {
                if parent != previous && !self.grid.position(p).is_adjacent(&self.grid.position(i)) {
                    self.session.dependents[p].push(i);
                }
            }
        }
        if !self.state[i].is_consistent() {
            self.enqueue(i);
        }
    }

    /// Re-evaluate every cell whose lookahead can use the value of `u`: its
    /// grid neighbors and the cells holding `u` as a distant parent.
    fn propagate(&mut self, u: usize) {
        for next in self.grid.neighbors(self.grid.position(u)) {
            if let Some(n) = self.grid.index(next) {
                self.update_vertex(n);
            }
        }
        let mut dependents = std::mem::take(&mut self.session.dependents[u]);
        dependents.sort_unstable();
        dependents.dedup();
        dependents.retain(|&d| self.state[d].parent == Some(u));
        for &d in &dependents {
            self.update_vertex(d);
        }
        dependents.retain(|&d| self.state[d].parent == Some(u));
        self.session.dependents[u].extend(dependents);
    }

    fn compute(&mut self) {
        let Some(start_idx) = self.grid.index(self.start) else { return };
        while let Some(&top) = self.session.open.peek_key() {
            if self.state[start_idx].is_consistent()
                && (top >= self.key(start_idx) || top.0.into_inner().is_infinite())
            {
                break;
            }
            let Some((k_old, u)) = self.session.open.pop() else { break };
            if self.state[u].is_consistent() {
                self.state[u].open = false;
                continue;
            }
            let k_new = self.key(u);
            if k_old < k_new {
                self.session.open.push(k_new, u);
                continue;
            }

            self.stats.expand();
            self.stats.iterate();
            self.state[u].open = false;
            if self.state[u].g > self.state[u].rhs {
                self.state[u].g = self.state[u].rhs;
                self.propagate(u);
            } else {
                self.state[u].g = f64::INFINITY;
                self.update_vertex(u);
                self.propagate(u);
            }
            self.stats.frontier(self.session.open.len());
        }
    }

    /// Reset every cell whose parent chain runs through an edited cell or
    /// through a segment that can no longer be travelled. The goal keeps its
    /// values. Returns the reset cells.
    fn invalidate(&mut self, changed: &[GridPos]) -> Vec<usize> {
        let cells = self.grid.cell_count();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); cells];
        let mut pending: Vec<usize> = changed.iter().filter_map(|&pos| self.grid.index(pos)).collect();
        for i in 0..cells {
            if let Some(p) = self.state[i].parent {
                children[p].push(i);
                if self.segment_cost(i, p).is_none() {
                    pending.push(i);
                }
            }
        }

        let mut broken = vec![false; cells];
        while let Some(i) = pending.pop() {
            if std::mem::replace(&mut broken[i], true) {
                continue;
            }
            pending.extend_from_slice(&children[i]);
        }

        let goal_idx = self.session.goal_idx;
        let dropped: Vec<usize> = (0..cells).filter(|&i| broken[i] && i != goal_idx).collect();
        for &i in &dropped {
            let cell = &mut self.state[i];
            cell.g = f64::INFINITY;
            cell.rhs = f64::INFINITY;
            cell.parent = None;
            cell.parent_point = None;
        }
        dropped
    }

    /// Drop the broken part of the previous search, rebuild it and the
    /// edited neighborhoods from the surviving cells, then re-key the queue
    /// for the current start. Afterwards every queued cell is
    /// overconsistent, so the following search only lowers values.
    fn repair(&mut self, changed: &[GridPos]) {
        let mut touched = self.invalidate(changed);
        let dropped = touched.len();
        for &pos in changed {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if let Some(i) = self.grid.index(pos.offset(dx, dy)) {
                        touched.push(i);
                    }
                }
            }
        }
        touched.sort_unstable();
        touched.dedup();
        trace!("[PhiStar] dropped {} cells, repairing {}", dropped, touched.len());
        for i in touched {
            self.update_vertex(i);
        }

        self.session.open.clear();
        for i in 0..self.grid.cell_count() {
            if !self.state[i].is_consistent() {
                let key = self.key(i);
                self.session.open.push(key, i);
                self.state[i].open = true;
            } else {
                self.state[i].open = false;
            }
        }
        self.stats.frontier(self.session.open.len());
    }

    /// Follow parents from the start to the goal and sum the segment costs.
    ///
    /// Every segment is checked again, so a stale link ends in
    /// `NoPathExists` instead of a path through blocked cells.
    fn extract_path(&self) -> Result<(Path2D, f64), PlanningError> {
        let start_idx = self.grid.index(self.start).ok_or(PlanningError::InvalidPosition { pos: self.start })?;
        if self.state[start_idx].g.is_infinite() {
            return Err(PlanningError::NoPathExists);
        }
        let mut points = vec![self.start.to_point()];
        let mut cost = 0.0;
        let mut current = start_idx;
        while current != self.session.goal_idx {
            let next = self.state[current].parent.ok_or(PlanningError::NoPathExists)?;
            let segment = self.segment_cost(current, next).ok_or(PlanningError::NoPathExists)?;
            if points.len() > self.grid.cell_count() {
                return Err(PlanningError::NoPathExists);
            }
            cost += segment;
            points.push(self.grid.position(next).to_point());
            current = next;
        }
        Ok((Path2D::from_points(points), cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use crate::path_planning::{AStarPlanner, DijkstraPlanner};

    fn pos(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    fn exact() -> IncrementalPhiStarPlanner {
        IncrementalPhiStarPlanner::new(PhiStarConfig { epsilon: 1.0 })
    }

    fn assert_path_clear(map: &GridMap, path: &Path2D) {
        let los = map.grid().line_of_sight_support().unwrap();
        for pair in path.points.windows(2) {
            assert!(los.line_of_sight(pair[0].to_grid(), pair[1].to_grid()));
        }
    }

    #[test]
    fn test_phi_star_finds_path() {
        let mut map = GridMap::dynamic(15, 15);
        map.grid_mut().fill_rect(pos(7, 0), pos(7, 11), false);
        let mut planner = IncrementalPhiStarPlanner::default();
        let result = planner.find_path(&mut map, pos(2, 2), pos(12, 2));
        assert!(result.found());
        assert_eq!(result.path().first().map(|p| p.to_grid()), Some(pos(2, 2)));
        assert_eq!(result.path().last().map(|p| p.to_grid()), Some(pos(12, 2)));
        assert_path_clear(&map, result.path());
        assert_eq!(result.diagnostic("epsilon").and_then(|d| d.as_f64()), Some(2.5));
        assert!(planner.has_active_plan());
    }

    #[test]
    fn test_phi_star_bounded_by_epsilon() {
        let mut map = GridMap::dynamic(15, 15);
        map.grid_mut().fill_rect(pos(7, 0), pos(7, 11), false);
        let a_star = AStarPlanner::default().find_path(&mut map, pos(2, 2), pos(12, 2));
        let result = IncrementalPhiStarPlanner::default().find_path(&mut map, pos(2, 2), pos(12, 2));
        assert!(result.cost() <= 2.5 * a_star.cost() + 1e-9);
        let exact_result = exact().find_path(&mut map, pos(2, 2), pos(12, 2));
        assert!(exact_result.cost() <= a_star.cost() + 1e-9);
    }

    #[test]
    fn test_phi_star_requires_dynamic_map() {
        let mut map = GridMap::any_angle(5, 5);
        let result = IncrementalPhiStarPlanner::default().find_path(&mut map, pos(0, 0), pos(4, 4));
        assert_eq!(result.failure_reason(), Some("UnsupportedMapCapability"));
        assert_eq!(
            result.failure(),
            Some(&PlanningError::UnsupportedMapCapability { capability: MapCapability::ChangeTracking })
        );
    }

    #[test]
    fn test_replan_without_plan() {
        let mut map = GridMap::dynamic(5, 5);
        let result = IncrementalPhiStarPlanner::default().replan(&mut map, pos(0, 0));
        assert_eq!(result.failure_reason(), Some("NoActivePlan"));
    }

    #[test]
    fn test_replan_after_new_obstacle() {
        let mut map = GridMap::dynamic(12, 12);
        let mut planner = exact();
        let first = planner.find_path(&mut map, pos(1, 6), pos(10, 6));
        assert!(first.found());
        assert_eq!(first.path().len(), 2);

        map.grid_mut().fill_rect(pos(5, 2), pos(5, 10), false);
        let repaired = planner.replan(&mut map, pos(1, 6));
        assert!(repaired.found());
        assert_eq!(repaired.diagnostic("incremental").and_then(|d| d.as_flag()), Some(true));
        assert_eq!(repaired.diagnostic("changed_cells").and_then(|d| d.as_count()), Some(9));
        assert!(repaired.cost() > first.cost());
        assert_path_clear(&map, repaired.path());
        assert!(map.changed_cells().is_empty());

        let grid_optimum = AStarPlanner::default().find_path(&mut map, pos(1, 6), pos(10, 6));
        assert!(repaired.cost() <= grid_optimum.cost() + 1e-9);
    }

    #[test]
    fn test_replan_after_opening_gap() {
        let mut map = GridMap::dynamic(10, 10);
        map.grid_mut().fill_rect(pos(5, 0), pos(5, 9), false);
        let mut planner = exact();
        let blocked = planner.find_path(&mut map, pos(1, 5), pos(8, 5));
        assert_eq!(blocked.failure_reason(), Some("NoPathExists"));
        assert!(planner.has_active_plan());

        map.set_walkable(pos(5, 5), true).unwrap();
        let repaired = planner.replan(&mut map, pos(1, 5));
        assert!(repaired.found());
        assert!(repaired.path().contains_cell(pos(5, 5)) || repaired.path().len() == 2);
        let reference = DijkstraPlanner::new().distance_map(&mut map, pos(1, 5)).unwrap();
        assert!(repaired.cost() <= reference.distance(pos(8, 5)) + 1e-9);
    }

    #[test]
    fn test_replan_with_moved_start() {
        let mut map = GridMap::dynamic(12, 12);
        map.grid_mut().fill_rect(pos(6, 3), pos(6, 11), false);
        let mut planner = exact();
        assert!(planner.find_path(&mut map, pos(1, 10), pos(10, 10)).found());
        let moved = planner.replan(&mut map, pos(2, 9));
        assert!(moved.found());
        assert_eq!(moved.path().first().map(|p| p.to_grid()), Some(pos(2, 9)));
        assert_eq!(moved.diagnostic("changed_cells").and_then(|d| d.as_count()), Some(0));
    }

    fn random_dynamic_map(seed: u64, ratio: f64) -> GridMap {
        let mut map = GridMap::dynamic(16, 16);
        map.grid_mut().add_random_obstacles(ratio, Some(seed));
        map.set_walkable(pos(0, 0), true).unwrap();
        map.set_walkable(pos(15, 15), true).unwrap();
        map
    }

    #[test]
    fn test_inflated_cost_matches_returned_path() {
        for seed in 100..200u64 {
            let mut map = random_dynamic_map(seed, 0.25);
            let result = IncrementalPhiStarPlanner::default().find_path(&mut map, pos(0, 0), pos(15, 15));
            if result.found() {
                assert_relative_eq!(result.cost(), result.path_length(), epsilon = 1e-9);
                assert_path_clear(&map, result.path());
            }
        }
    }

    #[test]
    fn test_replan_after_random_edits_matches_fresh_search() {
        let (start, goal) = (pos(0, 0), pos(15, 15));
        for seed in 0..120u64 {
            let mut map = random_dynamic_map(seed, 0.2);
            let mut planner = exact();
            planner.find_path(&mut map, start, goal);

            let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
            for _ in 0..13 {
                let cell = pos(rng.gen_range(0..16), rng.gen_range(0..16));
                if cell != start && cell != goal {
                    let walkable = map.is_walkable(cell);
                    map.set_walkable(cell, !walkable).unwrap();
                }
            }

            let mut reference_map = map.clone();
            let reachable = DijkstraPlanner::new()
                .distance_map(&mut reference_map, start)
                .unwrap()
                .distance(goal)
                .is_finite();
            let fresh = exact().find_path(&mut reference_map, start, goal);
            let repaired = planner.replan(&mut map, start);

            assert_eq!(repaired.diagnostic("incremental").and_then(|d| d.as_flag()), Some(true));
            assert_eq!(fresh.found(), reachable, "fresh search, seed {}", seed);
            assert_eq!(repaired.found(), reachable, "repaired search, seed {}", seed);
            if reachable {
                assert_eq!(repaired.path().first().map(|p| p.to_grid()), Some(start));
                assert_eq!(repaired.path().last().map(|p| p.to_grid()), Some(goal));
                assert_path_clear(&map, repaired.path());
                assert_relative_eq!(repaired.cost(), repaired.path_length(), epsilon = 1e-9);
            } else {
                assert_eq!(repaired.failure_reason(), Some("NoPathExists"));
            }
        }
    }

    #[test]
    fn test_replan_with_start_sealed_then_reopened() {
        let mut map = GridMap::dynamic(10, 10);
        let mut planner = exact();
        assert!(planner.find_path(&mut map, pos(1, 1), pos(8, 8)).found());

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    map.set_obstacle(pos(1 + dx, 1 + dy)).unwrap();
                }
            }
        }
        let sealed = planner.replan(&mut map, pos(1, 1));
        assert_eq!(sealed.failure(), Some(&PlanningError::NoPathExists));

        map.set_walkable(pos(2, 1), true).unwrap();
        let reopened = planner.replan(&mut map, pos(1, 1));
        assert!(reopened.found());
        assert_path_clear(&map, reopened.path());
        assert_relative_eq!(reopened.cost(), reopened.path_length(), epsilon = 1e-9);
        assert_eq!(reopened.diagnostic("changed_cells").and_then(|d| d.as_count()), Some(1));
    }

    #[test]
    fn test_replan_after_other_search_starts_over() {
        let mut map = GridMap::dynamic(8, 8);
        let mut planner = exact();
        assert!(planner.find_path(&mut map, pos(0, 0), pos(7, 7)).found());
        AStarPlanner::default().find_path(&mut map, pos(0, 0), pos(3, 3));
        let result = planner.replan(&mut map, pos(1, 0));
        assert!(result.found());
        assert_eq!(result.diagnostic("incremental").and_then(|d| d.as_flag()), Some(false));
    }
}
