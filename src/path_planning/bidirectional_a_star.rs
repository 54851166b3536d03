//! Bidirectional A* path planning
//!
//! Two A* frontiers grow from start and goal. Each step advances the smaller
//! frontier (forward on ties). The search stops the first time a cell popped
//! by one side is already closed by the other. That meeting is not checked
//! for global optimality, so the result can be slightly longer than the
//! shortest path; `optimality_verified` is reported as `false`.

use crate::common::{
    AlgorithmCategory, GridPos, Path2D, PathPlanner, PlanningError, PlanningResult, SearchStats,
    SpatialMap,
};
use crate::path_planning::{begin_search, trivial_result};
use crate::utils::frontier::{float_key, FloatKey, OpenList};
use crate::utils::{Grid, GridMap, Heuristic, SearchState};

/// Bidirectional A* planner
#[derive(Debug, Clone, Default)]
pub struct BidirectionalAStarPlanner {
    heuristic: Option<Heuristic>,
}

impl BidirectionalAStarPlanner {
    pub fn new(heuristic: Heuristic) -> Self {
        BidirectionalAStarPlanner { heuristic: Some(heuristic) }
    }
}

/// Backward search values kept outside the map's arena
struct BackwardState {
    g: Vec<f64>,
    parent: Vec<Option<usize>>,
    closed: Vec<bool>,
}

impl BackwardState {
    fn new(cells: usize) -> Self {
        BackwardState {
            g: vec![f64::INFINITY; cells],
            parent: vec![None; cells],
            closed: vec![false; cells],
        }
    }
}

impl PathPlanner for BidirectionalAStarPlanner {
    fn name(&self) -> &'static str {
        "Bidirectional A*"
    }

    fn category(&self) -> AlgorithmCategory {
        AlgorithmCategory::Classical
    }

    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult {
        let mut stats = SearchStats::start(self.name());
        stats.diag("optimality_verified", false);
        let (start_idx, goal_idx) = match begin_search(map, start, goal, &[]) {
            Ok(indices) => indices,
            Err(e) => return stats.failed(e),
        };
        if start == goal {
            return trivial_result(stats, start);
        }

        let heuristic = self
            .heuristic
            .unwrap_or_else(|| Heuristic::for_connectivity(map.grid().connectivity()));
        let (grid, state) = map.split_mut();
        let mut back = BackwardState::new(grid.cell_count());
        let mut open_f: OpenList<FloatKey> = OpenList::new();
        let mut open_b: OpenList<FloatKey> = OpenList::new();

        state[start_idx].g = 0.0;
        state[start_idx].open = true;
        open_f.push(float_key(heuristic.estimate(start, goal)), start_idx);
        back.g[goal_idx] = 0.0;
        open_b.push(float_key(heuristic.estimate(goal, start)), goal_idx);
        stats.visit();
        stats.visit();
        stats.frontier(2);

        let (mut forward_expanded, mut backward_expanded) = (0usize, 0usize);
        while !open_f.is_empty() && !open_b.is_empty() {
            stats.iterate();
            if open_f.len() <= open_b.len() {
                let Some(current) = pop_unclosed(&mut open_f, |i| state[i].closed) else { break };
                state[current].closed = true;
                state[current].open = false;
                if back.closed[current] {
                    return finish(grid, state, &back, current, stats, forward_expanded, backward_expanded);
                }
                stats.expand();
                forward_expanded += 1;
                expand_forward(grid, state, &mut open_f, current, goal, heuristic, &mut stats);
            } else {
                let Some(current) = pop_unclosed(&mut open_b, |i| back.closed[i]) else { break };
                back.closed[current] = true;
                if state[current].closed {
                    return finish(grid, state, &back, current, stats, forward_expanded, backward_expanded);
                }
                stats.expand();
                backward_expanded += 1;
                expand_backward(grid, &mut back, &mut open_b, current, start, heuristic, &mut stats);
            }
            stats.frontier(open_f.len() + open_b.len());
        }

        stats.diag("forward_expanded", forward_expanded);
        stats.diag("backward_expanded", backward_expanded);
        stats.failed(PlanningError::NoPathExists)
    }
}

fn pop_unclosed(open: &mut OpenList<FloatKey>, closed: impl Fn(usize) -> bool) -> Option<usize> {
    while let Some((_, cell)) = open.pop() {
        if !closed(cell) {
            return Some(cell);
        }
    }
    None
}

fn expand_forward(
    grid: &Grid,
    state: &mut SearchState,
    open: &mut OpenList<FloatKey>,
    current: usize,
    goal: GridPos,
    heuristic: Heuristic,
    stats: &mut SearchStats,
) {
    let pos = grid.position(current);
    for next in grid.neighbors(pos) {
        let Some(n) = grid.index(next) else { continue };
        if state[n].closed {
            continue;
        }
        let tentative = state[current].g + grid.edge_cost(pos, next);
        if tentative < state[n].g {
            if state[n].g.is_infinite() {
                stats.visit();
            }
            state[n].g = tentative;
            state[n].h = heuristic.estimate(next, goal);
            state[n].f = tentative + state[n].h;
            state[n].parent = Some(current);
            state[n].open = true;
            open.push(float_key(state[n].f), n);
        }
    }
}

fn expand_backward(
    grid: &Grid,
    back: &mut BackwardState,
    open: &mut OpenList<FloatKey>,
    current: usize,
    start: GridPos,
    heuristic: Heuristic,
    stats: &mut SearchStats,
) {
    let pos = grid.position(current);
    for next in grid.neighbors(pos) {
        let Some(n) = grid.index(next) else { continue };
        if back.closed[n] {
            continue;
        }
        let tentative = back.g[current] + grid.edge_cost(next, pos);
        if tentative < back.g[n] {
            if back.g[n].is_infinite() {
                stats.visit();
            }
            back.g[n] = tentative;
            back.parent[n] = Some(current);
            open.push(float_key(tentative + heuristic.estimate(next, start)), n);
        }
    }
}

fn finish(
    grid: &Grid,
    state: &SearchState,
    back: &BackwardState,
    meeting: usize,
    mut stats: SearchStats,
    forward_expanded: usize,
    backward_expanded: usize,
) -> PlanningResult {
    stats.diag("forward_expanded", forward_expanded);
    stats.diag("backward_expanded", backward_expanded);
    stats.diag("meeting_point", grid.position(meeting).to_string());

    let Some(forward_chain) = state.trace_parents(meeting) else {
        return stats.failed(PlanningError::NoPathExists);
    };
    let mut cells: Vec<usize> = forward_chain;
    let mut current = back.parent[meeting];
    while let Some(i) = current {
        if cells.len() > grid.cell_count() {
            return stats.failed(PlanningError::NoPathExists);
        }
        cells.push(i);
        current = back.parent[i];
    }

    let cost = state[meeting].g + back.g[meeting];
    let points = cells.into_iter().map(|i| grid.position(i).to_point()).collect();
    stats.found(Path2D::from_points(points), cost)
}
