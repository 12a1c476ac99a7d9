//! Recognition of gates from cell geometry.

use std::f64::consts::SQRT_2;

use itertools::Itertools;
use petgraph::prelude::*;
use tracing::debug;

use crate::cell::{Cell, CellFunction};
use crate::component::Component;
use crate::error::Result;
use crate::graph::Topology;
use crate::layout::TOLERANCE;

/// What a structure-recognition pass found.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Recognized {
    /// Majority gates synthesized.
    pub majority_gates: usize,
    /// Negators synthesized.
    pub negators: usize,
}

impl Topology {
    /// Cell neighbors of `node` one grid step away horizontally or vertically.
    #[must_use]
    pub fn orthogonal_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let Some(cell) = self.try_unwrap_cell(node) else {
            return Vec::new();
        };

        self.cell_neighbors(node)
            .into_iter()
            .unique()
            .filter(|&n| {
                self.try_unwrap_cell(n)
                    .is_some_and(|other| (cell.manhattan(other) - 1.0).abs() < TOLERANCE)
            })
            .collect()
    }

    /// Replace a plain cell with exactly four orthogonal neighbors by a majority gate wired to those neighbors.
    ///
    /// The diagonal wires between the four arms are artifacts of connecting the whole neighborhood and are
    /// removed as well.
    pub(crate) fn transform_majority(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let center = self.try_unwrap_cell(node)?;
        if center.function() != CellFunction::Normal {
            return None;
        }

        let arms = self.orthogonal_neighbors(node);
        if arms.len() != 4 {
            return None;
        }

        let component = Component::majority(center, arms.iter().filter_map(|&arm| self.try_unwrap_cell(arm)));
        let gate = self.add_component(component);

        for &arm in &arms {
            self.add_wire(arm, gate);
        }

        self.remove_component(node);

        for (a, b) in arms.iter().tuple_combinations() {
            self.remove_wire(*a, *b);
        }

        debug!(gate = %self.component(gate).id(), "recognized majority gate");

        Some(gate)
    }

    /// Bridge two diagonally adjacent cells sharing no neighbor with a negator.
    ///
    /// A majority gate both cells are wired to counts as a shared neighbor, so the arms of one gate are never
    /// bridged.
    pub(crate) fn transform_negator(&mut self, a: NodeIndex, b: NodeIndex) -> Result<Option<NodeIndex>> {
        let (Some(cell_a), Some(cell_b)) = (self.try_unwrap_cell(a), self.try_unwrap_cell(b)) else {
            return Ok(None);
        };

        if cell_a.index() >= cell_b.index() || (cell_a.euclidean(cell_b) - SQRT_2).abs() >= TOLERANCE {
            return Ok(None);
        }

        let neighbors_b = self.neighbors(b);
        if self.neighbors(a).iter().any(|n| neighbors_b.contains(n)) {
            return Ok(None);
        }

        let component = Component::negator(cell_a, cell_b);
        let negator = self.add_component(component);

        while self.contains_connection(a, b) {
            self.remove_connection(a, b)?;
        }
        while self.contains_connection(b, a) {
            self.remove_connection(b, a)?;
        }

        self.add_wire(a, negator);
        self.add_wire(b, negator);

        debug!(gate = %self.component(negator).id(), "recognized negator");

        Ok(Some(negator))
    }

    /// Rewrite clusters of cells into the gates they encode: plus-shaped clusters become majority gates, isolated
    /// diagonal pairs become negators.
    ///
    /// Cells are visited in node order. Majority gates are recognized first, so a cell consumed as a gate center
    /// is never considered for a negator.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingConnection`] if an edge vanishes while being rewired.
    pub fn recognize_structures(&mut self) -> Result<Recognized> {
        let mut recognized = Recognized::default();

        let cells = self
            .nodes()
            .filter(|&node| self.try_unwrap_cell(node).is_some())
            .collect::<Vec<_>>();

        for &node in &cells {
            if self.transform_majority(node).is_some() {
                recognized.majority_gates += 1;
            }
        }

        let cells = cells
            .into_iter()
            .filter(|&node| self.try_unwrap_cell(node).is_some())
            .collect::<Vec<_>>();

        for (a, b) in cells.iter().tuple_combinations() {
            let (a, b) = if self.try_unwrap_cell(*a).map(Cell::index) < self.try_unwrap_cell(*b).map(Cell::index) {
                (*a, *b)
            } else {
                (*b, *a)
            };

            if self.transform_negator(a, b)?.is_some() {
                recognized.negators += 1;
            }
        }

        debug!(
            majority_gates = recognized.majority_gates,
            negators = recognized.negators,
            "structure recognition done"
        );

        Ok(recognized)
    }
}
