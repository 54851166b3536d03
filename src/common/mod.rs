//! Common types, traits, and error definitions for rust_pathfinding
//!
//! This module provides the value types, the map and planner interfaces,
//! and the result contract shared by every engine in this crate.

pub mod types;
pub mod traits;
pub mod error;
pub mod result;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use result::{Diagnostic, PlanningResult};
pub(crate) use result::SearchStats;
