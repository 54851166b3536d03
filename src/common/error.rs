//! Error types for rust_pathfinding
//!
//! Planning failures are values: engines never return them through `Err` from
//! `find_path`, they are carried inside [`PlanningResult`](crate::common::PlanningResult).

use serde::Serialize;
use thiserror::Error;

use crate::common::traits::MapCapability;
use crate::common::types::GridPos;

/// Reasons a planning call can fail
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum PlanningError {
    /// Start or goal lies outside the map bounds
    #[error("position {pos} is outside the map")]
    InvalidPosition { pos: GridPos },

    /// Start or goal cell is blocked
    #[error("position {pos} is not walkable")]
    Unwalkable { pos: GridPos },

    /// The frontier was exhausted without reaching the goal
    #[error("no path exists between start and goal")]
    NoPathExists,

    /// The iteration or expansion cap ran out before a result was reached
    #[error("iteration budget of {limit} exhausted")]
    IterationBudgetExceeded { limit: usize },

    /// The map lacks a capability the engine depends on
    #[error("map does not support {capability}")]
    UnsupportedMapCapability { capability: MapCapability },

    /// `replan` was called before any successful `find_path`
    #[error("no active plan to repair")]
    NoActivePlan,

    /// Map construction or planner lookup received a bad argument
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PlanningError {
    /// Stable reason string reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanningError::InvalidPosition { .. } => "InvalidPosition",
            PlanningError::Unwalkable { .. } => "Unwalkable",
            PlanningError::NoPathExists => "NoPathExists",
            PlanningError::IterationBudgetExceeded { .. } => "IterationBudgetExceeded",
            PlanningError::UnsupportedMapCapability { .. } => "UnsupportedMapCapability",
            PlanningError::NoActivePlan => "NoActivePlan",
            PlanningError::InvalidParameter(_) => "InvalidParameter",
        }
    }

    /// Whether the failure proves that no path exists.
    ///
    /// Budget exhaustion in IDA*, RBFS and the sampling planners is
    /// inconclusive and reports `false` here.
    pub fn is_definitive(&self) -> bool {
        matches!(self, PlanningError::NoPathExists)
    }
}

/// Result type alias for fallible helpers outside `find_path`
pub type PathfindingResult<T> = Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanningError::Unwalkable { pos: GridPos::new(1, 2) };
        assert_eq!(format!("{}", err), "position (1, 2) is not walkable");
        assert_eq!(err.kind(), "Unwalkable");
    }

    #[test]
    fn test_capability_display() {
        let err = PlanningError::UnsupportedMapCapability { capability: MapCapability::LineOfSight };
        assert_eq!(format!("{}", err), "map does not support line-of-sight");
    }

    #[test]
    fn test_definitive_failures() {
        assert!(PlanningError::NoPathExists.is_definitive());
        assert!(!PlanningError::IterationBudgetExceeded { limit: 10 }.is_definitive());
        assert!(!PlanningError::NoActivePlan.is_definitive());
    }
}
