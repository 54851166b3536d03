//! Grid map shared by every engine
//!
//! [`Grid`] holds the static topology: bounds, walkability, terrain
//! multipliers, the movement model and the optional capabilities.
//! [`GridMap`] pairs it with the [`SearchState`] arena that engines reset and
//! mutate during a single `find_path` call.

use std::f64::consts::SQRT_2;

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::{
    ChangeTracking, GridPos, LineOfSight, MapCapability, PathfindingResult, PlanningError, Point2D,
    SpatialMap,
};
use crate::utils::search_state::SearchState;

const STRAIGHT_COST: f64 = 1.0;
const DIAGONAL_COST: f64 = SQRT_2;

/// Neighbor enumeration order: the four straight moves, then the diagonals.
const OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Movement model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    Four,
    Eight,
}

/// Terrain classes and their cost multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Grass,
    Sand,
    Mud,
    Water,
    Mountain,
    Wall,
}

impl Terrain {
    pub fn multiplier(&self) -> f64 {
        match self {
            Terrain::Grass => 1.0,
            Terrain::Sand => 1.5,
            Terrain::Mud => 2.0,
            Terrain::Water => 3.0,
            Terrain::Mountain => 4.0,
            Terrain::Wall => f64::INFINITY,
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Terrain::Grass),
            ',' => Some(Terrain::Sand),
            'm' => Some(Terrain::Mud),
            '~' => Some(Terrain::Water),
            '^' => Some(Terrain::Mountain),
            '#' => Some(Terrain::Wall),
            _ => None,
        }
    }
}

/// Static map topology
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    walkable: Vec<bool>,
    terrain: Vec<f64>,
    connectivity: Connectivity,
    corner_cutting: bool,
    line_of_sight: bool,
    change_tracking: bool,
    changed: Vec<bool>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let cells = width * height;
        Grid {
            width,
            height,
            walkable: vec![true; cells],
            terrain: vec![1.0; cells],
            connectivity: Connectivity::Eight,
            corner_cutting: false,
            line_of_sight: false,
            change_tracking: false,
            changed: vec![false; cells],
        }
    }

    pub fn cell_count(&self) -> usize {
        self.walkable.len()
    }

    /// Arena index of `pos`, `None` when out of bounds.
    pub fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn position(&self, index: usize) -> GridPos {
        GridPos::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn allows_corner_cutting(&self) -> bool {
        self.corner_cutting
    }

    /// Terrain multiplier of a cell; infinite when blocked or out of bounds.
    pub fn terrain_cost(&self, pos: GridPos) -> f64 {
        match self.index(pos) {
            Some(i) if self.walkable[i] => self.terrain[i],
            _ => f64::INFINITY,
        }
    }

    /// True when every walkable cell has multiplier 1.
    pub fn is_uniform_cost(&self) -> bool {
        self.walkable
            .iter()
            .zip(&self.terrain)
            .all(|(&walkable, &cost)| !walkable || cost == 1.0)
    }

    pub fn set_walkable(&mut self, pos: GridPos, walkable: bool) -> PathfindingResult<()> {
        let i = self.index(pos).ok_or(PlanningError::InvalidPosition { pos })?;
        if self.walkable[i] != walkable {
            self.walkable[i] = walkable;
            self.mark_changed(i);
        }
        Ok(())
    }

    pub fn set_obstacle(&mut self, pos: GridPos) -> PathfindingResult<()> {
        self.set_walkable(pos, false)
    }

    pub fn set_terrain(&mut self, pos: GridPos, terrain: Terrain) -> PathfindingResult<()> {
        self.set_terrain_cost(pos, terrain.multiplier())
    }

    /// Set a raw cost multiplier; an infinite multiplier blocks the cell.
    ///
    /// Multipliers below 1 are rejected: the distance heuristics assume no
    /// step is cheaper than on plain ground.
    pub fn set_terrain_cost(&mut self, pos: GridPos, multiplier: f64) -> PathfindingResult<()> {
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "terrain multiplier must be at least 1, got {}",
                multiplier
            )));
        }
        let i = self.index(pos).ok_or(PlanningError::InvalidPosition { pos })?;
        if multiplier.is_infinite() {
            return self.set_walkable(pos, false);
        }
        let was_walkable = self.walkable[i];
        if self.terrain[i] != multiplier || !was_walkable {
            self.terrain[i] = multiplier;
            self.walkable[i] = true;
            self.mark_changed(i);
        }
        Ok(())
    }

    /// Set walkability for every cell in the inclusive rectangle, clipped to the map.
    pub fn fill_rect(&mut self, from: GridPos, to: GridPos, walkable: bool) {
        let (max_x, max_y) = (self.width as i32 - 1, self.height as i32 - 1);
        let (x0, x1) = (from.x.min(to.x).max(0), from.x.max(to.x).min(max_x));
        let (y0, y1) = (from.y.min(to.y).max(0), from.y.max(to.y).min(max_y));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let _ = self.set_walkable(GridPos::new(x, y), walkable);
            }
        }
    }

    pub fn clear_obstacles(&mut self) {
        for i in 0..self.walkable.len() {
            if !self.walkable[i] {
                self.walkable[i] = true;
                self.mark_changed(i);
            }
        }
    }

    /// Block `ratio × cell_count` uniformly drawn cells (duplicates allowed).
    /// Returns how many cells were newly blocked.
    pub fn add_random_obstacles(&mut self, ratio: f64, seed: Option<u64>) -> usize {
        if self.cell_count() == 0 {
            return 0;
        }
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let draws = (self.cell_count() as f64 * ratio.clamp(0.0, 1.0)) as usize;
        let mut blocked = 0;
        for _ in 0..draws {
            let x = rng.gen_range(0..self.width) as i32;
            let y = rng.gen_range(0..self.height) as i32;
            let pos = GridPos::new(x, y);
            if self.is_walkable(pos) {
                blocked += 1;
                let _ = self.set_walkable(pos, false);
            }
        }
        trace!("random obstacles: {} draws, {} cells blocked", draws, blocked);
        blocked
    }

    /// Walls on every fourth row and column, keeping odd/odd cells open.
    pub fn add_maze_pattern(&mut self) {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if x % 2 == 1 && y % 2 == 1 {
                    continue;
                }
                if x % 4 == 0 || y % 4 == 0 {
                    let _ = self.set_walkable(GridPos::new(x, y), false);
                }
            }
        }
    }

    /// Whether a diagonal step from `from` by `(dx, dy)` may pass the two
    /// orthogonal cells it brushes.
    pub fn diagonal_clear(&self, from: GridPos, dx: i32, dy: i32) -> bool {
        self.corner_cutting
            || (self.is_walkable(from.offset(dx, 0)) && self.is_walkable(from.offset(0, dy)))
    }

    /// Cell containing `point` is walkable.
    pub fn is_point_free(&self, point: Point2D) -> bool {
        self.is_walkable(point.to_grid())
    }

    /// Sample the segment every `step` units (at least at both ends) and
    /// require every sampled cell to be walkable.
    pub fn segment_is_free(&self, a: Point2D, b: Point2D, step: f64) -> bool {
        let step = if step > 0.0 { step } else { 0.1 };
        let samples = ((a.distance(&b) / step).ceil() as usize).max(1);
        (0..=samples).all(|i| {
            let t = i as f64 / samples as f64;
            self.is_point_free(Point2D::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t))
        })
    }

    /// Bresenham traversal from `a` to `b`. Diagonal steps follow the same
    /// corner-cutting rule as grid moves.
    fn bresenham_clear(&self, a: GridPos, b: GridPos) -> bool {
        let (mut x, mut y) = (a.x, a.y);
        let dx = (b.x - a.x).abs();
        let dy = (b.y - a.y).abs();
        let sx = if a.x < b.x { 1 } else { -1 };
        let sy = if a.y < b.y { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            if !self.is_walkable(GridPos::new(x, y)) {
                return false;
            }
            if x == b.x && y == b.y {
                return true;
            }
            let e2 = 2 * err;
            let (step_x, step_y) = (e2 > -dy, e2 < dx);
            if step_x && step_y && !self.diagonal_clear(GridPos::new(x, y), sx, sy) {
                return false;
            }
            if step_x {
                err -= dy;
                x += sx;
            }
            if step_y {
                err += dx;
                y += sy;
            }
        }
    }

    fn mark_changed(&mut self, index: usize) {
        if self.change_tracking {
            self.changed[index] = true;
        }
    }
}

impl SpatialMap for Grid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_valid(&self, pos: GridPos) -> bool {
        self.index(pos).is_some()
    }

    fn is_walkable(&self, pos: GridPos) -> bool {
        self.index(pos).map_or(false, |i| self.walkable[i])
    }

    fn neighbors(&self, pos: GridPos) -> Vec<GridPos> {
        let count = match self.connectivity {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        };
        OFFSETS[..count]
            .iter()
            .filter(|&&(dx, dy)| {
                let next = pos.offset(dx, dy);
                self.is_walkable(next) && (dx == 0 || dy == 0 || self.diagonal_clear(pos, dx, dy))
            })
            .map(|&(dx, dy)| pos.offset(dx, dy))
            .collect()
    }

    fn edge_cost(&self, a: GridPos, b: GridPos) -> f64 {
        if !a.is_adjacent(&b) || !self.is_walkable(a) || !self.is_walkable(b) {
            return f64::INFINITY;
        }
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let base = if dx != 0 && dy != 0 {
            if self.connectivity == Connectivity::Four || !self.diagonal_clear(a, dx, dy) {
                return f64::INFINITY;
            }
            DIAGONAL_COST
        } else {
            STRAIGHT_COST
        };
        base * (self.terrain_cost(a) + self.terrain_cost(b)) / 2.0
    }

    fn line_of_sight_support(&self) -> Option<&dyn LineOfSight> {
        if self.line_of_sight {
            Some(self)
        } else {
            None
        }
    }

    fn change_tracking_support(&self) -> Option<&dyn ChangeTracking> {
        if self.change_tracking {
            Some(self)
        } else {
            None
        }
    }

    fn supports(&self, capability: MapCapability) -> bool {
        match capability {
            MapCapability::LineOfSight => self.line_of_sight,
            MapCapability::ChangeTracking => self.change_tracking,
            MapCapability::UniformOctileMovement => {
                self.connectivity == Connectivity::Eight
                    && !self.corner_cutting
                    && self.is_uniform_cost()
            }
        }
    }
}

impl LineOfSight for Grid {
    fn line_of_sight(&self, a: GridPos, b: GridPos) -> bool {
        self.bresenham_clear(a, b)
    }
}

impl ChangeTracking for Grid {
    fn changed_cells(&self) -> Vec<GridPos> {
        self.changed
            .iter()
            .enumerate()
            .filter(|(_, &changed)| changed)
            .map(|(i, _)| self.position(i))
            .collect()
    }

    fn clear_change_flags(&mut self) {
        self.changed.fill(false);
    }
}

/// Map plus its search scratch arena
#[derive(Debug, Clone)]
pub struct GridMap {
    grid: Grid,
    state: SearchState,
    epoch: u64,
}

impl GridMap {
    /// Plain 8-connected map without optional capabilities.
    pub fn new(width: usize, height: usize) -> Self {
        let grid = Grid::new(width, height);
        let state = SearchState::new(grid.cell_count());
        GridMap { grid, state, epoch: 0 }
    }

    /// Map offering line-of-sight queries.
    pub fn any_angle(width: usize, height: usize) -> Self {
        Self::new(width, height).with_line_of_sight(true)
    }

    /// Map offering line-of-sight queries and change tracking.
    pub fn dynamic(width: usize, height: usize) -> Self {
        Self::any_angle(width, height).with_change_tracking(true)
    }

    /// Parse rows of terrain symbols, first line is `y = 0`.
    ///
    /// `#` wall, `.` grass, `,` sand, `m` mud, `~` water, `^` mountain.
    pub fn from_ascii(rows: &str) -> PathfindingResult<Self> {
        let lines: Vec<&str> = rows.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let width = lines.first().map_or(0, |l| l.chars().count());
        if width == 0 {
            return Err(PlanningError::InvalidParameter("empty map".to_string()));
        }
        let mut map = GridMap::new(width, lines.len());
        for (y, line) in lines.iter().enumerate() {
            if line.chars().count() != width {
                return Err(PlanningError::InvalidParameter(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    line.chars().count(),
                    width
                )));
            }
            for (x, symbol) in line.chars().enumerate() {
                let terrain = Terrain::from_symbol(symbol).ok_or_else(|| {
                    PlanningError::InvalidParameter(format!("unknown map symbol '{}'", symbol))
                })?;
                map.grid.set_terrain(GridPos::new(x as i32, y as i32), terrain)?;
            }
        }
        Ok(map)
    }

    pub fn with_line_of_sight(mut self, enabled: bool) -> Self {
        self.grid.line_of_sight = enabled;
        self
    }

    pub fn with_change_tracking(mut self, enabled: bool) -> Self {
        self.grid.change_tracking = enabled;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.grid.connectivity = connectivity;
        self
    }

    pub fn with_corner_cutting(mut self, allowed: bool) -> Self {
        self.grid.corner_cutting = allowed;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Topology for reading and scratch state for writing at the same time.
    pub fn split_mut(&mut self) -> (&Grid, &mut SearchState) {
        (&self.grid, &mut self.state)
    }

    /// Clear all scratch values. Every engine calls this before searching.
    pub fn reset_search_state(&mut self) {
        self.state.reset();
        self.epoch += 1;
    }

    /// Number of resets so far; lets incremental engines notice that another
    /// search reused the scratch arena.
    pub fn search_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_walkable(&mut self, pos: GridPos, walkable: bool) -> PathfindingResult<()> {
        self.grid.set_walkable(pos, walkable)
    }

    pub fn set_obstacle(&mut self, pos: GridPos) -> PathfindingResult<()> {
        self.grid.set_obstacle(pos)
    }

    pub fn set_terrain(&mut self, pos: GridPos, terrain: Terrain) -> PathfindingResult<()> {
        self.grid.set_terrain(pos, terrain)
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.grid.is_walkable(pos)
    }

    pub fn is_valid(&self, pos: GridPos) -> bool {
        self.grid.is_valid(pos)
    }

    pub fn changed_cells(&self) -> Vec<GridPos> {
        self.grid.changed_cells()
    }

    pub fn clear_change_flags(&mut self) {
        self.grid.clear_change_flags();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pos(x: i32, y: i32) -> GridPos {
        GridPos::new(x, y)
    }

    #[test]
    fn test_neighbor_order_and_bounds() {
        let map = GridMap::new(3, 3);
        assert_eq!(
            map.grid().neighbors(pos(1, 1)),
            vec![pos(1, 2), pos(2, 1), pos(1, 0), pos(0, 1), pos(2, 2), pos(2, 0), pos(0, 2), pos(0, 0)]
        );
        assert_eq!(map.grid().neighbors(pos(0, 0)), vec![pos(0, 1), pos(1, 0), pos(1, 1)]);
    }

    #[test]
    fn test_four_connected_neighbors() {
        let map = GridMap::new(3, 3).with_connectivity(Connectivity::Four);
        assert_eq!(map.grid().neighbors(pos(1, 1)).len(), 4);
        assert!(map.grid().edge_cost(pos(0, 0), pos(1, 1)).is_infinite());
    }

    #[test]
    fn test_corner_cutting_rule() {
        let mut map = GridMap::new(3, 3);
        map.set_obstacle(pos(1, 0)).unwrap();
        assert!(map.grid().edge_cost(pos(0, 0), pos(1, 1)).is_infinite());
        assert!(!map.grid().neighbors(pos(0, 0)).contains(&pos(1, 1)));

        let mut cutting = GridMap::new(3, 3).with_corner_cutting(true);
        cutting.set_obstacle(pos(1, 0)).unwrap();
        assert_relative_eq!(cutting.grid().edge_cost(pos(0, 0), pos(1, 1)), SQRT_2);
    }

    #[test]
    fn test_edge_cost_terrain_average() {
        let mut map = GridMap::new(3, 1);
        map.set_terrain(pos(1, 0), Terrain::Water).unwrap();
        assert_relative_eq!(map.grid().edge_cost(pos(0, 0), pos(1, 0)), 2.0);
        assert_relative_eq!(map.grid().edge_cost(pos(1, 0), pos(0, 0)), 2.0);
        assert!(map.grid().edge_cost(pos(0, 0), pos(2, 0)).is_infinite());
        assert!(!map.grid().is_uniform_cost());
    }

    #[test]
    fn test_line_of_sight() {
        let mut map = GridMap::any_angle(10, 10);
        map.grid_mut().fill_rect(pos(5, 0), pos(5, 8), false);
        let los = map.grid().line_of_sight_support().unwrap();
        assert!(los.line_of_sight(pos(0, 0), pos(4, 8)));
        assert!(!los.line_of_sight(pos(0, 4), pos(9, 4)));
        assert!(los.line_of_sight(pos(0, 9), pos(9, 9)));
        assert!(!los.line_of_sight(pos(9, 0), pos(0, 0)));
    }

    #[test]
    fn test_line_of_sight_respects_corner_rule() {
        let mut map = GridMap::any_angle(4, 4);
        map.set_obstacle(pos(1, 0)).unwrap();
        map.set_obstacle(pos(0, 1)).unwrap();
        let los = map.grid().line_of_sight_support().unwrap();
        assert!(!los.line_of_sight(pos(0, 0), pos(1, 1)));
        assert!(!los.line_of_sight(pos(3, 3), pos(0, 0)));
        assert!(los.line_of_sight(pos(1, 1), pos(3, 3)));

        let mut cutting = GridMap::any_angle(4, 4).with_corner_cutting(true);
        cutting.set_obstacle(pos(1, 0)).unwrap();
        cutting.set_obstacle(pos(0, 1)).unwrap();
        let los = cutting.grid().line_of_sight_support().unwrap();
        assert!(los.line_of_sight(pos(0, 0), pos(3, 3)));
    }

    #[test]
    fn test_terrain_cost_below_one_rejected() {
        let mut map = GridMap::new(3, 3);
        assert!(matches!(
            map.grid_mut().set_terrain_cost(pos(1, 1), 0.5),
            Err(PlanningError::InvalidParameter(_))
        ));
        assert!(map.grid_mut().set_terrain_cost(pos(1, 1), f64::NAN).is_err());
        assert_relative_eq!(map.grid().terrain_cost(pos(1, 1)), 1.0);
        map.grid_mut().set_terrain_cost(pos(1, 1), 1.25).unwrap();
        assert_relative_eq!(map.grid().terrain_cost(pos(1, 1)), 1.25);
    }

    #[test]
    fn test_fill_rect_clipped_to_map() {
        let mut map = GridMap::dynamic(4, 3);
        map.grid_mut().fill_rect(pos(2, -5), pos(i32::MAX, i32::MAX), false);
        for y in 0..3 {
            assert!(map.is_walkable(pos(1, y)));
            assert!(!map.is_walkable(pos(2, y)) && !map.is_walkable(pos(3, y)));
        }
        assert_eq!(map.changed_cells().len(), 6);
    }

    #[test]
    fn test_capabilities() {
        assert!(GridMap::new(2, 2).grid().line_of_sight_support().is_none());
        assert!(GridMap::any_angle(2, 2).grid().change_tracking_support().is_none());
        let dynamic = GridMap::dynamic(2, 2);
        assert!(dynamic.grid().supports(MapCapability::LineOfSight));
        assert!(dynamic.grid().supports(MapCapability::ChangeTracking));
        assert!(dynamic.grid().supports(MapCapability::UniformOctileMovement));
    }

    #[test]
    fn test_change_tracking_only_on_toggle() {
        let mut map = GridMap::dynamic(4, 4);
        map.set_walkable(pos(1, 1), true).unwrap();
        assert!(map.changed_cells().is_empty());
        map.set_obstacle(pos(1, 1)).unwrap();
        map.set_obstacle(pos(2, 3)).unwrap();
        assert_eq!(map.changed_cells(), vec![pos(1, 1), pos(2, 3)]);
        map.clear_change_flags();
        assert!(map.changed_cells().is_empty());
    }

    #[test]
    fn test_untracked_map_records_nothing() {
        let mut map = GridMap::any_angle(4, 4);
        map.set_obstacle(pos(1, 1)).unwrap();
        assert!(map.changed_cells().is_empty());
    }

    #[test]
    fn test_out_of_bounds_edit() {
        let mut map = GridMap::new(2, 2);
        assert_eq!(
            map.set_obstacle(pos(2, 0)),
            Err(PlanningError::InvalidPosition { pos: pos(2, 0) })
        );
        assert!(!map.is_valid(pos(-1, 0)));
    }

    #[test]
    fn test_from_ascii() {
        let map = GridMap::from_ascii(
            "
            ..#
            ~.^
            ",
        )
        .unwrap();
        assert_eq!(map.grid().width(), 3);
        assert_eq!(map.grid().height(), 2);
        assert!(!map.is_walkable(pos(2, 0)));
        assert_relative_eq!(map.grid().terrain_cost(pos(0, 1)), 3.0);
        assert!(GridMap::from_ascii("..\n.").is_err());
        assert!(GridMap::from_ascii("..x").is_err());
    }

    #[test]
    fn test_random_obstacles_seeded() {
        let mut a = GridMap::new(20, 20);
        let mut b = GridMap::new(20, 20);
        let blocked = a.grid_mut().add_random_obstacles(0.2, Some(7));
        b.grid_mut().add_random_obstacles(0.2, Some(7));
        assert!(blocked > 0 && blocked <= 80);
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(a.is_walkable(pos(x, y)), b.is_walkable(pos(x, y)));
            }
        }
    }

    #[test]
    fn test_maze_pattern() {
        let mut map = GridMap::new(9, 9);
        map.grid_mut().add_maze_pattern();
        assert!(!map.is_walkable(pos(0, 0)));
        assert!(!map.is_walkable(pos(4, 2)));
        assert!(map.is_walkable(pos(1, 1)));
        assert!(map.is_walkable(pos(2, 1)));
        map.grid_mut().clear_obstacles();
        assert!(map.is_walkable(pos(0, 0)));
    }

    #[test]
    fn test_segment_is_free() {
        let mut map = GridMap::new(10, 10);
        map.set_obstacle(pos(5, 5)).unwrap();
        let grid = map.grid();
        assert!(grid.segment_is_free(Point2D::new(0.0, 0.0), Point2D::new(9.0, 0.0), 0.1));
        assert!(!grid.segment_is_free(Point2D::new(0.0, 0.0), Point2D::new(9.0, 9.0), 0.1));
        assert!(!grid.segment_is_free(Point2D::new(0.0, 0.0), Point2D::new(12.0, 0.0), 0.1));
    }

    #[test]
    fn test_reset_bumps_epoch() {
        let mut map = GridMap::new(2, 2);
        let before = map.search_epoch();
        {
            let (_, state) = map.split_mut();
            state[0].g = 1.0;
        }
        map.reset_search_state();
        assert_eq!(map.search_epoch(), before + 1);
        assert!(map.state()[0].g.is_infinite());
    }
}
