//! From raw cell coordinates to a connected topology graph.
//!
//! Design files place cells at arbitrary real coordinates. Normalization moves the layout onto a grid where the
//! smallest gap between distinct coordinates is one, and adjacency is inferred from the most common gap on each
//! axis, which tolerates a few irregularly spaced cells.

use itertools::Itertools;
use tracing::debug;

use crate::cell::Cell;
use crate::error::{Axis, Error, Result};
use crate::graph::Topology;

/// Two coordinates closer than this are the same grid line.
pub const TOLERANCE: f64 = 1e-6;

fn coordinates(cells: &[Cell], axis: Axis) -> impl Iterator<Item = f64> + '_ {
    cells.iter().map(move |cell| match axis {
        Axis::X => cell.x(),
        Axis::Y => cell.y(),
    })
}

/// Sorted distinct coordinates along `axis`.
fn grid_lines(cells: &[Cell], axis: Axis) -> Result<Vec<f64>> {
    let lines = coordinates(cells, axis)
        .sorted_by(f64::total_cmp)
        .dedup_by(|a, b| (a - b).abs() < TOLERANCE)
        .collect::<Vec<_>>();

    if lines.len() < 2 {
        return Err(Error::DegenerateLayout { axis });
    }

    Ok(lines)
}

fn gaps(lines: &[f64]) -> impl Iterator<Item = f64> + '_ {
    lines.iter().tuple_windows().map(|(a, b)| b - a)
}

/// Rescale every cell so that, per axis, the minimum coordinate is zero and the smallest gap between distinct
/// coordinates is one.
///
/// # Errors
/// Returns [`Error::DegenerateLayout`] if an axis has fewer than two distinct coordinates.
pub fn normalize(cells: &mut [Cell]) -> Result<()> {
    let mut scale = [(0.0, 1.0); 2];

    for (i, axis) in [Axis::X, Axis::Y].into_iter().enumerate() {
        let lines = grid_lines(cells, axis)?;
        let gap = gaps(&lines).fold(f64::INFINITY, f64::min);
        scale[i] = (lines[0], gap);
    }

    let [(min_x, gap_x), (min_y, gap_y)] = scale;
    for cell in cells.iter_mut() {
        cell.move_to((cell.x() - min_x) / gap_x, (cell.y() - min_y) / gap_y);
    }

    debug!(cells = cells.len(), gap_x, gap_y, "normalized layout");

    Ok(())
}

/// The most frequent gap between adjacent grid lines. Equally frequent gaps resolve to the smallest.
///
/// # Errors
/// Returns [`Error::DegenerateLayout`] if an axis has fewer than two distinct coordinates.
pub fn majority_spacing(cells: &[Cell], axis: Axis) -> Result<f64> {
    let lines = grid_lines(cells, axis)?;
    let groups = gaps(&lines)
        .sorted_by(f64::total_cmp)
        .group_by(|&gap| (gap / TOLERANCE).round() as i64);

    let mut best = (0, f64::INFINITY);
    for (_, group) in &groups {
        let group = group.collect::<Vec<_>>();
        if group.len() > best.0 {
            best = (group.len(), group[0]);
        }
    }

    Ok(best.1)
}

/// Build a graph with one node per cell, in order, and a wire between every two cells lying within the majority
/// spacing of each other on both axes.
///
/// # Errors
/// Returns [`Error::DegenerateLayout`] if an axis has fewer than two distinct coordinates.
pub fn connect(cells: Vec<Cell>) -> Result<Topology> {
    let spacing_x = majority_spacing(&cells, Axis::X)? + TOLERANCE;
    let spacing_y = majority_spacing(&cells, Axis::Y)? + TOLERANCE;

    let adjacent = cells
        .iter()
        .enumerate()
        .tuple_combinations()
        .filter(|((_, a), (_, b))| (a.x() - b.x()).abs() <= spacing_x && (a.y() - b.y()).abs() <= spacing_y)
        .map(|((i, _), (j, _))| (i, j))
        .collect::<Vec<_>>();

    let mut graph = Topology::new();
    let nodes = cells
        .into_iter()
        .map(|cell| graph.add_component(cell.into()))
        .collect::<Vec<_>>();

    for (i, j) in adjacent {
        graph.add_wire(nodes[i], nodes[j]);
    }

    debug!(
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        "connected layout"
    );

    Ok(graph)
}

/// Normalize, connect and recognize structures in one go.
///
/// # Errors
/// Returns [`Error::DegenerateLayout`] for layouts without spread, or [`Error::MissingConnection`] if structure
/// recognition finds the graph in an inconsistent state.
pub fn build_graph(mut cells: Vec<Cell>) -> Result<Topology> {
    normalize(&mut cells)?;
    let mut graph = connect(cells)?;
    graph.recognize_structures()?;
    Ok(graph)
}
