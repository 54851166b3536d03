//! Common types used throughout rust_pathfinding

use std::fmt;

use itertools::Itertools;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Cell containing this point, rounding to the nearest cell center.
    pub fn to_grid(&self) -> GridPos {
        GridPos::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<GridPos> for Point2D {
    fn from(pos: GridPos) -> Self {
        Self { x: pos.x as f64, y: pos.y as f64 }
    }
}

/// Discrete cell coordinate on a grid map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// True for the eight surrounding cells, false for the cell itself.
    pub fn is_adjacent(&self, other: &GridPos) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && (dx + dy) > 0
    }

    pub fn to_point(&self) -> Point2D {
        Point2D::from(*self)
    }
}

impl From<(i32, i32)> for GridPos {
    fn from(tuple: (i32, i32)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Family an engine belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmCategory {
    Classical,
    AnyAngle,
    Optimized,
    Dynamic,
    Sampling,
}

impl fmt::Display for AlgorithmCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlgorithmCategory::Classical => "Classical",
            AlgorithmCategory::AnyAngle => "Any-Angle",
            AlgorithmCategory::Optimized => "Optimized",
            AlgorithmCategory::Dynamic => "Dynamic",
            AlgorithmCategory::Sampling => "Sampling",
        };
        f.write_str(name)
    }
}

/// Path representation as a sequence of 2D points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path2D {
    pub points: Vec<Point2D>,
}

impl Path2D {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn from_cells(cells: &[GridPos]) -> Self {
        Self { points: cells.iter().map(GridPos::to_point).collect() }
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&Point2D> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    /// Sum of the Euclidean lengths of consecutive segments.
    pub fn total_length(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.distance(b))
            .sum()
    }

    /// True when the path visits `pos` as one of its waypoints.
    pub fn contains_cell(&self, pos: GridPos) -> bool {
        let target = pos.to_point();
        self.points.iter().any(|p| p.distance(&target) < 1e-9)
    }
}
