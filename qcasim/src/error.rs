//! Error types for parsing, layout and simulation.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A coordinate axis of the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
        }
    }
}

fn describe_open(expected: &Option<String>) -> String {
    match expected {
        Some(section) => format!("opening tag [{section}]"),
        None => "any open section".to_string(),
    }
}

/// Everything that can go wrong between reading a design file and producing a truth table.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading a design file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A closing section tag did not match the most recently opened section.
    #[error("line {line}: closing tag [#{found}] does not match {}", describe_open(.expected))]
    MalformedFile {
        /// One-based line number of the closing tag.
        line: usize,
        /// The section on top of the stack, if any.
        expected: Option<String>,
        /// The section named by the closing tag.
        found: String,
    },

    /// The file ended with sections still open.
    #[error("section [{section}] is never closed")]
    UnclosedSection {
        /// The innermost section still open.
        section: String,
    },

    /// A numeric attribute could not be parsed.
    #[error("line {line}: {key}={value} is not a number")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// Attribute key.
        key: String,
        /// Raw attribute value.
        value: String,
    },

    /// A clock attribute was outside `-1..=3`.
    #[error("line {line}: clock {clock} is not one of -1, 0, 1, 2, 3")]
    InvalidClock {
        /// One-based line number.
        line: usize,
        /// The offending clock number.
        clock: i64,
    },

    /// A fixed cell's label does not encode a number.
    #[error("fixed cell {cell} has label {label:?}, which is not a number")]
    InvalidFixedLabel {
        /// Id of the fixed cell.
        cell: String,
        /// The label, if there was one.
        label: Option<String>,
    },

    /// Fewer than two distinct coordinates exist along an axis, so no grid spacing can be derived.
    #[error("degenerate layout: fewer than two distinct {axis} coordinates")]
    DegenerateLayout {
        /// The axis lacking spread.
        axis: Axis,
    },

    /// Removal of a connection that is not in the graph.
    #[error("no connection from {from} to {sink}")]
    MissingConnection {
        /// Id of the source component.
        from: String,
        /// Id of the sink component.
        sink: String,
    },

    /// Simulation parameters that cannot produce any samples.
    #[error("invalid simulation parameters: {0}")]
    InvalidSimulation(String),
}
