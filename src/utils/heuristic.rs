//! Distance heuristics
//!
//! All functions are pure and admissible for the movement model they are
//! named after when the straight move costs 1 and the diagonal move costs √2.

use serde::{Deserialize, Serialize};

use crate::common::GridPos;
use crate::utils::grid_map::Connectivity;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

pub fn manhattan(dx: f64, dy: f64) -> f64 {
    dx.abs() + dy.abs()
}

pub fn euclidean(dx: f64, dy: f64) -> f64 {
    (dx * dx + dy * dy).sqrt()
}

/// Diagonal distance with unit diagonal cost.
pub fn chebyshev(dx: f64, dy: f64) -> f64 {
    dx.abs().max(dy.abs())
}

/// Diagonal distance with √2 diagonal cost.
pub fn octile(dx: f64, dy: f64) -> f64 {
    let (dx, dy) = (dx.abs(), dy.abs());
    (dx + dy) + (SQRT_2 - 2.0) * dx.min(dy)
}

/// Heuristic selector carried in planner configs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    Manhattan,
    Euclidean,
    Chebyshev,
    Octile,
    /// Always zero; turns A* into Dijkstra
    Zero,
}

impl Heuristic {
    /// Tightest admissible choice for a movement model.
    pub fn for_connectivity(connectivity: Connectivity) -> Self {
        match connectivity {
            Connectivity::Four => Heuristic::Manhattan,
            Connectivity::Eight => Heuristic::Octile,
        }
    }

    pub fn estimate(&self, from: GridPos, to: GridPos) -> f64 {
        let dx = (to.x - from.x) as f64;
        let dy = (to.y - from.y) as f64;
        match self {
            Heuristic::Manhattan => manhattan(dx, dy),
            Heuristic::Euclidean => euclidean(dx, dy),
            Heuristic::Chebyshev => chebyshev(dx, dy),
            Heuristic::Octile => octile(dx, dy),
            Heuristic::Zero => 0.0,
        }
    }
}
