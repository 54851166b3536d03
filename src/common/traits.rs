//! Common traits defining the map and planner interfaces

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::result::PlanningResult;
use crate::common::types::{AlgorithmCategory, GridPos};
use crate::utils::GridMap;

/// Optional map features an engine may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapCapability {
    /// Discrete line-of-sight queries between cells
    LineOfSight,
    /// Enumeration of cells whose walkability toggled
    ChangeTracking,
    /// 8-connected, uniform-cost movement with corner cutting disabled
    UniformOctileMovement,
}

impl fmt::Display for MapCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapCapability::LineOfSight => f.write_str("line-of-sight"),
            MapCapability::ChangeTracking => f.write_str("change tracking"),
            MapCapability::UniformOctileMovement => {
                f.write_str("uniform-cost 8-connected movement without corner cutting")
            }
        }
    }
}

/// Topology queries every engine consumes
pub trait SpatialMap {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Inside the map bounds.
    fn is_valid(&self, pos: GridPos) -> bool;

    /// Inside the map bounds and not blocked.
    fn is_walkable(&self, pos: GridPos) -> bool;

    /// Walkable cells reachable in one move, in a fixed enumeration order.
    fn neighbors(&self, pos: GridPos) -> Vec<GridPos>;

    /// Cost of moving between two cells; `f64::INFINITY` when the move is not allowed.
    fn edge_cost(&self, a: GridPos, b: GridPos) -> f64;

    fn line_of_sight_support(&self) -> Option<&dyn LineOfSight> {
        None
    }

    fn change_tracking_support(&self) -> Option<&dyn ChangeTracking> {
        None
    }

    /// Whether the map provides `capability`.
    fn supports(&self, capability: MapCapability) -> bool {
        match capability {
            MapCapability::LineOfSight => self.line_of_sight_support().is_some(),
            MapCapability::ChangeTracking => self.change_tracking_support().is_some(),
            MapCapability::UniformOctileMovement => false,
        }
    }
}

/// Any-angle capability
pub trait LineOfSight {
    /// Discrete traversal from `a` to `b`; fails on the first blocked cell.
    /// Must not mutate anything.
    fn line_of_sight(&self, a: GridPos, b: GridPos) -> bool;
}

/// Incremental capability
pub trait ChangeTracking {
    /// Cells whose walkability toggled since the last clear, in row-major order.
    fn changed_cells(&self) -> Vec<GridPos>;

    fn clear_change_flags(&mut self);
}

/// Trait implemented by every search engine
pub trait PathPlanner {
    /// Short identifier used in logs and the planner registry
    fn name(&self) -> &'static str;

    fn category(&self) -> AlgorithmCategory;

    /// Capabilities the map must provide; checked before any search work.
    fn required_capabilities(&self) -> &'static [MapCapability] {
        &[]
    }

    /// Plan from `start` to `goal`, resetting the map's search scratch first.
    fn find_path(&mut self, map: &mut GridMap, start: GridPos, goal: GridPos) -> PlanningResult;
}
