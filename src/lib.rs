//! rust_pathfinding - grid and sampling-based path planning engines
//!
//! Every engine consumes a [`GridMap`] plus start and goal cells and returns a
//! [`PlanningResult`]: the path, its cost, search counters, engine-specific
//! diagnostics and, on failure, a [`PlanningError`] reason.
//!
//! Engines:
//! - classical: A*, weighted A*, Dijkstra, bidirectional A*
//! - any-angle: Theta*, Lazy Theta*, incremental Phi*
//! - optimized: Jump Point Search, IDA*, RBFS
//! - sampling: RRT, RRT*, RRT-Connect
//!
//! ```
//! use rust_pathfinding::{GridMap, GridPos, PathPlanner};
//! use rust_pathfinding::path_planning::AStarPlanner;
//!
//! let mut map = GridMap::new(5, 5);
//! let result = AStarPlanner::default().find_path(&mut map, GridPos::new(0, 0), GridPos::new(4, 4));
//! assert!(result.found());
//! assert!((result.cost() - 4.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
//! ```

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{AlgorithmCategory, GridPos, Path2D, Point2D};
pub use common::{ChangeTracking, LineOfSight, MapCapability, PathPlanner, SpatialMap};
pub use common::{Diagnostic, PathfindingResult, PlanningError, PlanningResult};
pub use path_planning::planner_by_name;
pub use utils::{Connectivity, GridMap, Heuristic, Terrain};
