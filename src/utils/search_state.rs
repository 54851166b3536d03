//! Per-cell search scratch state
//!
//! One [`CellState`] per map cell, stored in a flat arena indexed by
//! `y * width + x`. Parent links are arena indices, so the parent relation
//! can be walked and checked without any reference cycles.

use std::ops::{Index, IndexMut};

use crate::common::Point2D;

/// Tolerance below which `g` and `rhs` are considered equal
pub const CONSISTENCY_EPSILON: f64 = 1e-6;

/// Scratch values for one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState {
    /// Best known cost from the search root
    pub g: f64,
    /// Heuristic estimate to the target
    pub h: f64,
    /// Search priority, `g + w·h` for the A* family
    pub f: f64,
    /// One-step lookahead estimate used by incremental search
    pub rhs: f64,
    /// Predecessor cell
    pub parent: Option<usize>,
    /// Continuous parent coordinate for any-angle segments
    pub parent_point: Option<Point2D>,
    pub open: bool,
    pub closed: bool,
}

impl CellState {
    pub fn is_consistent(&self) -> bool {
        self.g == self.rhs || (self.g - self.rhs).abs() < CONSISTENCY_EPSILON
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            g: f64::INFINITY,
            h: 0.0,
            f: f64::INFINITY,
            rhs: f64::INFINITY,
            parent: None,
            parent_point: None,
            open: false,
            closed: false,
        }
    }
}

/// Arena of [`CellState`] values owned by a map
#[derive(Debug, Clone)]
pub struct SearchState {
    cells: Vec<CellState>,
}

impl SearchState {
    pub fn new(cell_count: usize) -> Self {
        Self { cells: vec![CellState::default(); cell_count] }
    }

    /// Return every cell to its initial values.
    pub fn reset(&mut self) {
        self.cells.fill(CellState::default());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CellState> {
        self.cells.get(index)
    }

    /// Walk parent links from `target` back to a root and return the chain
    /// root-first.
    ///
    /// Returns `None` if the walk revisits a cell, which would mean the
    /// parent relation is no longer a forest.
    pub fn trace_parents(&self, target: usize) -> Option<Vec<usize>> {
        let mut chain = vec![target];
        let mut current = target;
        while let Some(parent) = self.cells[current].parent {
            if chain.len() > self.cells.len() {
                return None;
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        Some(chain)
    }
}

impl Index<usize> for SearchState {
    type Output = CellState;

    fn index(&self, index: usize) -> &CellState {
        &self.cells[index]
    }
}

impl IndexMut<usize> for SearchState {
    fn index_mut(&mut self, index: usize) -> &mut CellState {
        &mut self.cells[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = SearchState::new(4);
        state[2].g = 3.0;
        state[2].closed = true;
        state[2].parent = Some(1);
        state.reset();
        assert_eq!(state[2], CellState::default());
        assert!(state[2].g.is_infinite());
    }

    #[test]
    fn test_trace_parents() {
        let mut state = SearchState::new(5);
        state[3].parent = Some(1);
        state[1].parent = Some(0);
        assert_eq!(state.trace_parents(3), Some(vec![0, 1, 3]));
        assert_eq!(state.trace_parents(0), Some(vec![0]));
    }

    #[test]
    fn test_trace_parents_detects_cycle() {
        let mut state = SearchState::new(3);
        state[0].parent = Some(1);
        state[1].parent = Some(0);
        assert_eq!(state.trace_parents(0), None);
    }

    #[test]
    fn test_consistency() {
        let mut cell = CellState::default();
        assert!(cell.is_consistent());
        cell.rhs = 2.0;
        assert!(!cell.is_consistent());
        cell.g = 2.0 + 1e-9;
        assert!(cell.is_consistent());
    }
}
