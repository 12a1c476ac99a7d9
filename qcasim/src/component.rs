//! The components a topology graph is made of.

use std::fmt;

use crate::cell::{Cell, CellFunction, Polarization};

/// The kind of a synthesized gate.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum GateType {
    /// Inverter bridging two diagonally adjacent cells.
    Negator,
    /// Majority vote over the arms of a plus-shaped cluster.
    Majority,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negator => write!(f, "NEGATOR"),
            Self::Majority => write!(f, "MAJORITY"),
        }
    }
}

/// A node of the topology graph: either a cell from the design file or a gate inferred from the layout.
///
/// Gates own no cells; they are attached to the cells they stand for through graph edges only.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    /// A cell from the design file.
    Cell(Cell),
    /// A synthesized gate.
    Gate {
        /// Which gate.
        kind: GateType,
        /// Concatenated ids of the cells this gate replaces or bridges.
        id: String,
    },
}

impl From<Cell> for Component {
    fn from(cell: Cell) -> Self {
        Self::Cell(cell)
    }
}

impl Component {
    /// A negator bridging `a` and `b`.
    #[must_use]
    pub fn negator(a: &Cell, b: &Cell) -> Self {
        Self::Gate {
            kind: GateType::Negator,
            id: format!("{}/{}", a.id(), b.id()),
        }
    }

    /// A majority gate replacing `center`, voting over `arms`.
    #[must_use]
    pub fn majority<'a>(center: &'a Cell, arms: impl IntoIterator<Item = &'a Cell>) -> Self {
        let id = std::iter::once(center)
            .chain(arms)
            .map(Cell::id)
            .collect::<Vec<_>>()
            .join("+");
        Self::Gate {
            kind: GateType::Majority,
            id,
        }
    }

    /// Identifier: the cell id, or the gate's concatenated id.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Cell(cell) => cell.id(),
            Self::Gate { id, .. } => id.clone(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Cell(cell) => cell.name(),
            Self::Gate { kind, id } => format!("{kind} ({id})"),
        }
    }

    /// The wrapped cell, if this is one.
    #[must_use]
    pub const fn try_unwrap_cell(&self) -> Option<&Cell> {
        match self {
            Self::Cell(cell) => Some(cell),
            Self::Gate { .. } => None,
        }
    }

    /// The gate type, if this is a gate.
    #[must_use]
    pub const fn try_unwrap_gate(&self) -> Option<GateType> {
        match self {
            Self::Cell(_) => None,
            Self::Gate { kind, .. } => Some(*kind),
        }
    }

    /// Returns true if this is a cell with the given function.
    #[must_use]
    pub fn is_cell(&self, function: CellFunction) -> bool {
        self.try_unwrap_cell().is_some_and(|cell| cell.function() == function)
    }

    /// Visualization color: cells by function and clock zone, gates red.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Cell(cell) => cell.color(),
            Self::Gate { .. } => "red",
        }
    }

    /// Visualization shape: cells are circles, gates squares.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Cell(_) => "circle",
            Self::Gate { .. } => "square",
        }
    }

    /// This component's polarization rule, given the polarizations of its already-polarized neighbors in neighbor
    /// order.
    ///
    /// - A cell copies the first value.
    /// - A negator inverts the first value.
    /// - A majority gate takes the most frequent value. On a tie, the value of the earliest neighbor wins.
    ///
    /// With no polarized neighbors, every rule yields `None`.
    #[must_use]
    pub fn resolve_self(&self, neighbors: &[Polarization]) -> Option<Polarization> {
        let first = *neighbors.first()?;
        match self {
            Self::Cell(_) => Some(first),
            Self::Gate { kind: GateType::Negator, .. } => Some(first.invert()),
            Self::Gate { kind: GateType::Majority, .. } => {
                let ones = neighbors.iter().filter(|&&p| p == Polarization::One).count();
                let zeros = neighbors.len() - ones;
                Some(match ones.cmp(&zeros) {
                    std::cmp::Ordering::Greater => Polarization::One,
                    std::cmp::Ordering::Less => Polarization::Zero,
                    std::cmp::Ordering::Equal => first,
                })
            }
        }
    }
}
