//! Planning result and the counters engines fill while searching

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use crate::common::error::PlanningError;
use crate::common::types::Path2D;

/// Algorithm specific diagnostic value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Diagnostic {
    Flag(bool),
    Count(usize),
    Value(f64),
    Text(String),
    Series(Vec<f64>),
}

impl Diagnostic {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Diagnostic::Value(v) => Some(*v),
            Diagnostic::Count(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<usize> {
        match self {
            Diagnostic::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Diagnostic::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Diagnostic::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Diagnostic::Series(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Diagnostic {
    fn from(v: bool) -> Self {
        Diagnostic::Flag(v)
    }
}

impl From<usize> for Diagnostic {
    fn from(v: usize) -> Self {
        Diagnostic::Count(v)
    }
}

impl From<f64> for Diagnostic {
    fn from(v: f64) -> Self {
        Diagnostic::Value(v)
    }
}

impl From<&str> for Diagnostic {
    fn from(v: &str) -> Self {
        Diagnostic::Text(v.to_string())
    }
}

impl From<String> for Diagnostic {
    fn from(v: String) -> Self {
        Diagnostic::Text(v)
    }
}

impl From<Vec<f64>> for Diagnostic {
    fn from(v: Vec<f64>) -> Self {
        Diagnostic::Series(v)
    }
}

/// Outcome of one `find_path` call
///
/// Built once by the engine and handed to the caller; there are no setters.
/// A failed search always carries an empty path and an infinite cost.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningResult {
    algorithm: String,
    path: Path2D,
    found: bool,
    cost: f64,
    path_length: f64,
    elapsed: Duration,
    nodes_expanded: usize,
    nodes_visited: usize,
    max_frontier_size: usize,
    iterations: usize,
    diagnostics: BTreeMap<String, Diagnostic>,
    failure: Option<PlanningError>,
}

impl PlanningResult {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn path(&self) -> &Path2D {
        &self.path
    }

    pub fn into_path(self) -> Path2D {
        self.path
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Geometric length of the returned waypoints.
    pub fn path_length(&self) -> f64 {
        self.path_length
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn nodes_expanded(&self) -> usize {
        self.nodes_expanded
    }

    pub fn nodes_visited(&self) -> usize {
        self.nodes_visited
    }

    pub fn max_frontier_size(&self) -> usize {
        self.max_frontier_size
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn diagnostics(&self) -> &BTreeMap<String, Diagnostic> {
        &self.diagnostics
    }

    pub fn diagnostic(&self, key: &str) -> Option<&Diagnostic> {
        self.diagnostics.get(key)
    }

    pub fn failure(&self) -> Option<&PlanningError> {
        self.failure.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&'static str> {
        self.failure.as_ref().map(PlanningError::kind)
    }
}

/// Per-call counters; consumed into a [`PlanningResult`]
#[derive(Debug)]
pub(crate) struct SearchStats {
    algorithm: &'static str,
    started: Instant,
    pub nodes_expanded: usize,
    pub nodes_visited: usize,
    pub max_frontier_size: usize,
    pub iterations: usize,
    diagnostics: BTreeMap<String, Diagnostic>,
}

impl SearchStats {
    pub fn start(algorithm: &'static str) -> Self {
        Self {
            algorithm,
            started: Instant::now(),
            nodes_expanded: 0,
            nodes_visited: 0,
            max_frontier_size: 0,
            iterations: 0,
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn expand(&mut self) {
        self.nodes_expanded += 1;
    }

    pub fn visit(&mut self) {
        self.nodes_visited += 1;
    }

    pub fn iterate(&mut self) {
        self.iterations += 1;
    }

    /// Record the current frontier size, keeping the peak.
    pub fn frontier(&mut self, len: usize) {
        self.max_frontier_size = self.max_frontier_size.max(len);
    }

    pub fn diag(&mut self, key: &str, value: impl Into<Diagnostic>) {
        self.diagnostics.insert(key.to_string(), value.into());
    }

    pub fn found(self, path: Path2D, cost: f64) -> PlanningResult {
        let path_length = path.total_length();
        debug!(
            "{}: path found, cost {:.3}, {} waypoints, {} expanded, {} visited",
            self.algorithm,
            cost,
            path.len(),
            self.nodes_expanded,
            self.nodes_visited
        );
        self.build(path, true, cost, path_length, None)
    }

    pub fn failed(self, error: PlanningError) -> PlanningResult {
        debug!(
            "{}: search failed ({}), {} expanded, {} iterations",
            self.algorithm, error, self.nodes_expanded, self.iterations
        );
        self.build(Path2D::new(), false, f64::INFINITY, 0.0, Some(error))
    }

    fn build(
        self,
        path: Path2D,
        found: bool,
        cost: f64,
        path_length: f64,
        failure: Option<PlanningError>,
    ) -> PlanningResult {
        PlanningResult {
            algorithm: self.algorithm.to_string(),
            path,
            found,
            cost,
            path_length,
            elapsed: self.started.elapsed(),
            nodes_expanded: self.nodes_expanded,
            nodes_visited: self.nodes_visited,
            max_frontier_size: self.max_frontier_size,
            iterations: self.iterations,
            diagnostics: self.diagnostics,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{GridPos, Point2D};

    #[test]
    fn test_failed_result_is_empty() {
        let mut stats = SearchStats::start("test");
        stats.expand();
        let result = stats.failed(PlanningError::NoPathExists);
        assert!(!result.found());
        assert!(result.path().is_empty());
        assert!(result.cost().is_infinite());
        assert_eq!(result.failure_reason(), Some("NoPathExists"));
        assert_eq!(result.nodes_expanded(), 1);
    }

    #[test]
    fn test_found_result_measures_path() {
        let mut stats = SearchStats::start("test");
        stats.frontier(4);
        stats.frontier(2);
        stats.diag("epsilon", 2.5);
        let path = Path2D::from_points(vec![Point2D::new(0.0, 0.0), Point2D::new(3.0, 4.0)]);
        let result = stats.found(path, 5.0);
        assert!(result.found());
        assert_eq!(result.path_length(), 5.0);
        assert_eq!(result.max_frontier_size(), 4);
        assert_eq!(result.diagnostic("epsilon").and_then(Diagnostic::as_f64), Some(2.5));
        assert!(result.failure_reason().is_none());
    }

    #[test]
    fn test_result_serializes() {
        let stats = SearchStats::start("test");
        let result = stats.failed(PlanningError::Unwalkable { pos: GridPos::new(0, 1) });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["found"], serde_json::Value::Bool(false));
        assert_eq!(json["algorithm"], "test");
        assert!(json["failure"].is_object());
    }
}
