//! Utilities for working with quantum-dot cellular automata (QCA) designs.
//!
//! A QCA design is a grid of cells, each holding a binary polarization which it passes on to its neighbors. Logic
//! arises from geometry alone: two cells touching only at their corners invert the signal between them (a
//! negator), and a cell with four neighbors in a plus shape takes on the majority of the three signals driving it
//! (a majority gate). Holding one arm of a majority gate at a fixed polarization turns it into an AND gate (fixed
//! at zero) or an OR gate (fixed at one).
//!
//! Signals are moved along by four clock signals, each a quarter period out of phase with the previous one. Every
//! cell belongs to one of the four clock zones.
//!
//! The pipeline is:
//! - [`parse`] reads cells from a QCADesigner design file.
//! - [`layout`] snaps the cells onto a unit grid and wires up neighbors into a [`Topology`].
//! - [`Topology::recognize_structures`] rewrites plus-shaped clusters into majority gates and isolated diagonal
//!   pairs into negators.
//! - [`Simulator`] sweeps every input combination through the graph and collects a [`TruthTable`].
//!
//! Polarization is a discrete 0/1 abstraction; nothing here models the underlying physics.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod cell;
pub mod component;
pub mod error;
pub mod graph;
pub mod graph_recognize;
pub mod layout;
pub mod parse;
pub mod simulate;

pub use cell::{Cell, CellFunction, ClockZone, Polarization};
pub use component::{Component, GateType};
pub use error::{Error, Result};
pub use graph::Topology;
pub use graph_recognize::Recognized;
pub use petgraph::stable_graph::NodeIndex;
pub use simulate::{ClockSample, Simulation, SimulationConfig, Simulator, Trace, TruthTable};
