//! The topology graph.

use std::io::Write;

use petgraph::prelude::*;
use petgraph::visit::{VisitMap, Visitable};

use crate::cell::{Cell, CellFunction, Polarization};
use crate::component::Component;
use crate::error::{Error, Result};

/// A component together with its transient polarization.
#[derive(Clone, Debug, PartialEq)]
struct Node {
    component: Component,
    polarization: Option<Polarization>,
}

impl Node {
    fn new(component: Component) -> Self {
        let polarization = component.try_unwrap_cell().and_then(Cell::constant);
        Self {
            component,
            polarization,
        }
    }

    /// Fixed cells keep their constant; everything else becomes unset.
    fn reset(&mut self) {
        self.polarization = self.component.try_unwrap_cell().and_then(Cell::constant);
    }
}

/// The topology graph: components connected by directed edges.
///
/// Wires are undirected in the circuit, so they are always added as a pair of edges. Nodes are addressed by
/// stable [`NodeIndex`] handles which survive removal of other nodes.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    graph: StableGraph<Node, (), Directed>,
}

impl Topology {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component. Fixed cells start out at their constant polarization.
    pub fn add_component(&mut self, component: Component) -> NodeIndex {
        self.graph.add_node(Node::new(component))
    }

    /// Record a directed edge. Duplicate edges are permitted.
    pub fn add_connection(&mut self, source: NodeIndex, sink: NodeIndex) {
        self.graph.add_edge(source, sink, ());
    }

    /// Connect `a` and `b` in both directions.
    pub fn add_wire(&mut self, a: NodeIndex, b: NodeIndex) {
        self.add_connection(a, b);
        self.add_connection(b, a);
    }

    /// Returns true if at least one edge leads from `source` to `sink`.
    #[must_use]
    pub fn contains_connection(&self, source: NodeIndex, sink: NodeIndex) -> bool {
        self.graph.find_edge(source, sink).is_some()
    }

    /// Remove one edge from `source` to `sink`.
    ///
    /// # Errors
    /// Returns [`Error::MissingConnection`] if there is no such edge; the graph is left unchanged.
    pub fn remove_connection(&mut self, source: NodeIndex, sink: NodeIndex) -> Result<()> {
        let edge = self.graph.find_edge(source, sink).ok_or_else(|| Error::MissingConnection {
            from: self.describe(source),
            sink: self.describe(sink),
        })?;
        self.graph.remove_edge(edge);
        Ok(())
    }

    /// Remove every edge between `a` and `b`, in either direction. Returns how many were removed.
    pub fn remove_wire(&mut self, a: NodeIndex, b: NodeIndex) -> usize {
        let mut removed = 0;
        while let Some(edge) = self.graph.find_edge(a, b).or_else(|| self.graph.find_edge(b, a)) {
            self.graph.remove_edge(edge);
            removed += 1;
        }
        removed
    }

    /// Remove a node along with every edge touching it.
    pub fn remove_component(&mut self, node: NodeIndex) -> Option<Component> {
        self.graph.remove_node(node).map(|node| node.component)
    }

    /// Sinks of every edge leaving `node`, in edge insertion order.
    #[must_use]
    pub fn neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph lists the most recently added edge first.
        let mut neighbors = self.graph.neighbors_directed(node, Outgoing).collect::<Vec<_>>();
        neighbors.reverse();
        neighbors
    }

    /// Neighbors of `node` which are cells.
    #[must_use]
    pub fn cell_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(node)
            .into_iter()
            .filter(|&n| self.try_unwrap_cell(n).is_some())
            .collect()
    }

    /// The component at `node`.
    ///
    /// # Panics
    /// Panics if `node` has been removed.
    #[must_use]
    pub fn component(&self, node: NodeIndex) -> &Component {
        &self.graph[node].component
    }

    /// The cell at `node`, if it is one.
    #[must_use]
    pub fn try_unwrap_cell(&self, node: NodeIndex) -> Option<&Cell> {
        self.graph.node_weight(node)?.component.try_unwrap_cell()
    }

    /// Current polarization of `node`.
    #[must_use]
    pub fn polarization(&self, node: NodeIndex) -> Option<Polarization> {
        self.graph.node_weight(node)?.polarization
    }

    pub(crate) fn set_polarization(&mut self, node: NodeIndex, polarization: Option<Polarization>) {
        if let Some(node) = self.graph.node_weight_mut(node) {
            node.polarization = polarization;
        }
    }

    /// Unset every polarization except those of fixed cells.
    pub fn reset_all(&mut self) {
        for node in self.graph.node_indices().collect::<Vec<_>>() {
            self.graph[node].reset();
        }
    }

    /// Every node handle, in index order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Every edge as `(source, sink)`.
    pub fn connections(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |edge| self.graph.edge_endpoints(edge))
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Cells with the given function, ordered by their position in the design file.
    #[must_use]
    pub fn cells_with(&self, function: CellFunction) -> Vec<NodeIndex> {
        let mut cells = self
            .nodes()
            .filter(|&node| self.component(node).is_cell(function))
            .collect::<Vec<_>>();
        cells.sort_by_key(|&node| self.try_unwrap_cell(node).map(Cell::index));
        cells
    }

    /// Input cells, in file order.
    #[must_use]
    pub fn inputs(&self) -> Vec<NodeIndex> {
        self.cells_with(CellFunction::Input)
    }

    /// Output cells, in file order.
    #[must_use]
    pub fn outputs(&self) -> Vec<NodeIndex> {
        self.cells_with(CellFunction::Output)
    }

    /// A fresh visited set over this graph's nodes.
    pub(crate) fn visit_map(&self) -> impl VisitMap<NodeIndex> {
        self.graph.visit_map()
    }

    fn describe(&self, node: NodeIndex) -> String {
        self.graph
            .node_weight(node)
            .map_or_else(|| format!("<removed {}>", node.index()), |node| node.component.id())
    }

    /// Dump the graph in DOT format.
    #[allow(clippy::missing_errors_doc)]
    pub fn to_graphviz<W: Write>(&self, mut f: W) -> std::io::Result<()> {
        writeln!(f, "digraph {{")?;

        for node in self.nodes() {
            let component = self.component(node);
            writeln!(
                f,
                "{} [shape={},color={},label={:?}];",
                node.index(),
                component.shape(),
                component.color(),
                component.name()
            )?;
        }

        for (source, sink) in self.connections() {
            writeln!(f, "{} -> {};", source.index(), sink.index())?;
        }

        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::GateType;

    fn cell(index: usize, function: CellFunction, label: Option<&str>) -> Component {
        Component::Cell(Cell::new(index, (0.0, 0.0), function, None, label.map(str::to_string)).unwrap())
    }

    #[test]
    fn neighbors_in_insertion_order() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, CellFunction::Normal, None));
        let b = graph.add_component(cell(1, CellFunction::Normal, None));
        let c = graph.add_component(cell(2, CellFunction::Normal, None));
        let d = graph.add_component(cell(3, CellFunction::Normal, None));

        graph.add_connection(a, c);
        graph.add_connection(a, b);
        graph.add_connection(a, d);
        graph.add_connection(b, a);

        assert_eq!(graph.neighbors(a), vec![c, b, d]);
        assert_eq!(graph.neighbors(b), vec![a]);
        assert!(graph.neighbors(c).is_empty());
    }

    #[test]
    fn remove_connection_reports_missing_edge() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, CellFunction::Normal, None));
        let b = graph.add_component(cell(1, CellFunction::Normal, None));
        graph.add_connection(a, b);
        graph.add_connection(a, b);

        graph.remove_connection(a, b).expect("first edge to exist");
        assert!(graph.contains_connection(a, b));
        graph.remove_connection(a, b).expect("duplicate edge to exist");

        let err = graph.remove_connection(a, b).unwrap_err();
        assert!(matches!(err, Error::MissingConnection { ref from, ref sink } if from == "c0" && sink == "c1"));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn remove_component_cascades() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, CellFunction::Normal, None));
        let b = graph.add_component(cell(1, CellFunction::Normal, None));
        let c = graph.add_component(cell(2, CellFunction::Normal, None));
        graph.add_wire(a, b);
        graph.add_wire(b, c);
        graph.add_wire(a, c);

        let removed = graph.remove_component(b).expect("node to exist");
        assert_eq!(removed.id(), "c1");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.connection_count(), 2);
        assert_eq!(graph.neighbors(a), vec![c]);
        assert!(graph.remove_component(b).is_none());
    }

    #[test]
    fn remove_wire_removes_both_directions() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, CellFunction::Normal, None));
        let b = graph.add_component(cell(1, CellFunction::Normal, None));
        graph.add_wire(a, b);
        graph.add_connection(a, b);

        assert_eq!(graph.remove_wire(a, b), 3);
        assert_eq!(graph.remove_wire(a, b), 0);
    }

    #[test]
    fn reset_keeps_fixed_cells() {
        let mut graph = Topology::new();
        let fixed = graph.add_component(cell(0, CellFunction::Fixed, Some("-1")));
        let normal = graph.add_component(cell(1, CellFunction::Normal, None));
        let gate = graph.add_component(Component::Gate {
            kind: GateType::Negator,
            id: "g".to_string(),
        });

        assert_eq!(graph.polarization(fixed), Some(Polarization::Zero));

        graph.set_polarization(normal, Some(Polarization::One));
        graph.set_polarization(gate, Some(Polarization::One));
        graph.reset_all();

        assert_eq!(graph.polarization(fixed), Some(Polarization::Zero));
        assert_eq!(graph.polarization(normal), None);
        assert_eq!(graph.polarization(gate), None);
    }

    #[test]
    fn inputs_and_outputs_in_file_order() {
        let mut graph = Topology::new();
        let out = graph.add_component(cell(2, CellFunction::Output, Some("Y")));
        let b = graph.add_component(cell(1, CellFunction::Input, Some("B")));
        let a = graph.add_component(cell(0, CellFunction::Input, Some("A")));

        assert_eq!(graph.inputs(), vec![a, b]);
        assert_eq!(graph.outputs(), vec![out]);
    }

    #[test]
    fn graphviz_lists_nodes_and_edges() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, CellFunction::Input, Some("A")));
        let g = graph.add_component(Component::Gate {
            kind: GateType::Negator,
            id: "c0/c1".to_string(),
        });
        graph.add_wire(a, g);

        let mut out = Vec::new();
        graph.to_graphviz(&mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("0 [shape=circle,color=blue,label=\"A\"];"));
        assert!(dot.contains("1 [shape=square,color=red,label=\"NEGATOR (c0/c1)\"];"));
        assert!(dot.contains("0 -> 1;"));
        assert!(dot.contains("1 -> 0;"));
    }
}
