//! Map, scratch state and search building blocks for rust_pathfinding

pub mod frontier;
pub mod grid_map;
pub mod heuristic;
pub mod sampling_tree;
pub mod search_state;

pub use frontier::OpenList;
pub use grid_map::{Connectivity, Grid, GridMap, Terrain};
pub use heuristic::Heuristic;
pub use sampling_tree::{SamplingTree, TreeNode};
pub use search_state::{CellState, SearchState};
