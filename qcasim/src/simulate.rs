//! Clock-driven polarization simulation.
//!
//! Every time step starts from a clean slate: all polarizations except those of fixed cells are cleared, the
//! input cells are forced to the current input combination, and each output is resolved on demand. Resolution
//! recurses through unpolarized neighbors and then applies the component's own rule; a visited set, fresh for
//! every output, stops it from looping on feedback wiring.
//!
//! This is a single relaxation sweep, not an iteration to a fixed point. An output is only resolved when a
//! polarized anchor (an input or a fixed cell) is reachable within one recursive descent; otherwise it stays
//! unset for that sample.

use std::fmt;

use petgraph::prelude::*;
use petgraph::visit::VisitMap;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::cell::{CellFunction, ClockZone, Polarization};
use crate::error::{Error, Result};
use crate::graph::Topology;

/// The four clock signals at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockSample([f64; 4]);

impl ClockSample {
    /// Clock values given directly, indexed by zone.
    #[must_use]
    pub const fn new(values: [f64; 4]) -> Self {
        Self(values)
    }

    /// Sample every zone's waveform at scaled time `t`.
    #[must_use]
    pub fn at(t: f64) -> Self {
        Self(ClockZone::ALL.map(|zone| zone.signal(t)))
    }

    /// The signal of `zone`.
    #[must_use]
    pub const fn signal(&self, zone: ClockZone) -> f64 {
        self.0[zone.index()]
    }

    /// Returns true while `zone` is in its active (positive) half-period.
    #[must_use]
    pub fn is_active(&self, zone: ClockZone) -> bool {
        self.signal(zone) > 0.0
    }
}

/// Simulation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Total number of clock cycles, shared equally between all input combinations.
    pub num_cycles: u32,
    /// Time between samples.
    pub step: f64,
    /// Only let a plain cell with an assigned clock zone take on a value while that zone is active.
    ///
    /// Off by default: propagation ignores the clocks and they are only recorded.
    pub clock_gating: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_cycles: 10,
            step: 0.01,
            clock_gating: false,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        if self.num_cycles == 0 {
            return Err(Error::InvalidSimulation("number of cycles must be positive".to_string()));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::InvalidSimulation(format!("step {} must be positive", self.step)));
        }
        Ok(())
    }
}

/// Settled output values for every input combination.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TruthTable {
    /// Input names, most significant first.
    pub inputs: Vec<String>,
    /// Output names.
    pub outputs: Vec<String>,
    /// One row per input combination, in counting order; unresolved outputs are `None`.
    pub values: Vec<Vec<Option<Polarization>>>,
}

impl TruthTable {
    /// The output row for the given input values (most significant first), if it exists.
    #[must_use]
    pub fn row(&self, inputs: &[Polarization]) -> Option<&[Option<Polarization>]> {
        let index = inputs
            .iter()
            .fold(0, |index, &p| (index << 1) | usize::from(u8::from(p)));
        self.values.get(index).map(Vec::as_slice)
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_in = self.inputs.join(" ");
        let header_out = self.outputs.join(" ");
        writeln!(f, "{header_in} | {header_out}")?;

        for (row, values) in self.values.iter().enumerate() {
            let n = self.inputs.len();
            for (i, name) in self.inputs.iter().enumerate() {
                let bit = Polarization::from_bit(row, n - 1 - i);
                write!(f, "{bit:>width$} ", width = name.len())?;
            }
            write!(f, "|")?;
            for (name, value) in self.outputs.iter().zip(values) {
                match value {
                    Some(p) => write!(f, " {p:>width$}", width = name.len())?,
                    None => write!(f, " {:>width$}", "-", width = name.len())?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Per-sample series recorded during a simulation, for charting.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    /// Sample times.
    pub time: Vec<f64>,
    /// One series per input.
    pub inputs: Vec<Vec<Polarization>>,
    /// One series per output.
    pub outputs: Vec<Vec<Option<Polarization>>>,
    /// One series per clock zone.
    pub clocks: [Vec<f64>; 4],
}

/// The result of [`Simulator::simulate`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Simulation {
    /// Settled outputs per input combination.
    pub truth_table: TruthTable,
    /// Everything sampled along the way.
    pub trace: Trace,
}

impl Topology {
    /// Resolve the polarization of `node` for the current time step.
    ///
    /// Already polarized nodes and input cells answer immediately. Otherwise `node` is marked visited, every
    /// unpolarized and unvisited neighbor is resolved first, and then the node's own rule is applied to the
    /// neighbors that ended up polarized. The result is stored on the node.
    pub fn resolve<V: VisitMap<NodeIndex>>(
        &mut self,
        node: NodeIndex,
        visited: &mut V,
        clocks: &ClockSample,
        clock_gating: bool,
    ) -> Option<Polarization> {
        if let Some(polarization) = self.polarization(node) {
            return Some(polarization);
        }

        if self.component(node).is_cell(CellFunction::Input) {
            return None;
        }

        visited.visit(node);

        let neighbors = self.neighbors(node);
        for &neighbor in &neighbors {
            if self.polarization(neighbor).is_none() && !visited.is_visited(&neighbor) {
                self.resolve(neighbor, visited, clocks, clock_gating);
            }
        }

        let values = neighbors
            .iter()
            .filter_map(|&neighbor| self.polarization(neighbor))
            .collect::<Vec<_>>();

        let component = self.component(node);
        let gated = clock_gating
            && component
                .try_unwrap_cell()
                .filter(|cell| cell.function() == CellFunction::Normal)
                .and_then(|cell| cell.clock())
                .is_some_and(|zone| !clocks.is_active(zone));

        let polarization = if gated { None } else { component.resolve_self(&values) };

        trace!(component = %component.id(), ?polarization, gated, "resolved");

        self.set_polarization(node, polarization);
        polarization
    }
}

/// Drives a graph through every input combination and collects the truth table.
///
/// The simulator owns its graph exclusively for the duration of a run.
#[derive(Clone, Debug)]
pub struct Simulator {
    graph: Topology,
    config: SimulationConfig,
}

impl Simulator {
    /// Create a simulator over a graph whose structures have already been recognized.
    #[must_use]
    pub const fn new(graph: Topology, config: SimulationConfig) -> Self {
        Self { graph, config }
    }

    /// The simulated graph, holding the polarizations of the last sample.
    #[must_use]
    pub const fn graph(&self) -> &Topology {
        &self.graph
    }

    /// Give the graph back.
    #[must_use]
    pub fn into_graph(self) -> Topology {
        self.graph
    }

    /// Sweep all `2^n` combinations of the `n` input cells. Each combination holds for an equal share of the
    /// configured cycles, sampled every `step`; the outputs after a combination's last sample form its truth-table
    /// row.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSimulation`] for a zero cycle count, a non-positive step, or more inputs than
    /// combinations can be counted.
    #[allow(clippy::cast_precision_loss)]
    pub fn simulate(&mut self) -> Result<Simulation> {
        self.config.validate()?;

        let inputs = self.graph.inputs();
        let outputs = self.graph.outputs();

        let combinations = u32::try_from(inputs.len())
            .ok()
            .and_then(|n| 1usize.checked_shl(n))
            .filter(|&c| c <= 1 << 24)
            .ok_or_else(|| Error::InvalidSimulation(format!("{} inputs is too many to enumerate", inputs.len())))?;

        let cycles = f64::from(self.config.num_cycles);
        let duration = cycles / combinations as f64;

        debug!(
            combinations,
            step = self.config.step,
            cycles = self.config.num_cycles,
            "simulating"
        );

        let mut simulation = Simulation {
            truth_table: TruthTable {
                inputs: inputs.iter().map(|&n| self.graph.component(n).name()).collect(),
                outputs: outputs.iter().map(|&n| self.graph.component(n).name()).collect(),
                values: Vec::with_capacity(combinations),
            },
            trace: Trace {
                inputs: vec![Vec::new(); inputs.len()],
                outputs: vec![Vec::new(); outputs.len()],
                ..Trace::default()
            },
        };

        for combination in 0..combinations {
            let start = combination as f64 * duration;
            let end = start + duration;

            let mut sample = 0u32;
            loop {
                let t = self.config.step.mul_add(f64::from(sample), start);
                if t >= end {
                    break;
                }
                self.step(combination, &inputs, &outputs, t, &mut simulation.trace);
                sample += 1;
            }

            let row = outputs
                .iter()
                .map(|&n| self.graph.polarization(n))
                .collect::<Vec<_>>();

            for (name, value) in simulation.truth_table.outputs.iter().zip(&row) {
                if value.is_none() {
                    warn!(output = %name, combination, "output did not resolve");
                }
            }

            debug!(combination, ?row, "settled");
            simulation.truth_table.values.push(row);
        }

        Ok(simulation)
    }

    fn step(&mut self, combination: usize, inputs: &[NodeIndex], outputs: &[NodeIndex], t: f64, trace: &mut Trace) {
        self.graph.reset_all();

        for (i, &input) in inputs.iter().enumerate() {
            let polarization = Polarization::from_bit(combination, inputs.len() - 1 - i);
            self.graph.set_polarization(input, Some(polarization));
            trace.inputs[i].push(polarization);
        }

        let clocks = ClockSample::at(t * f64::from(self.config.num_cycles));

        for &output in outputs {
            let mut visited = self.graph.visit_map();
            self.graph.resolve(output, &mut visited, &clocks, self.config.clock_gating);
        }

        for (i, &output) in outputs.iter().enumerate() {
            trace.outputs[i].push(self.graph.polarization(output));
        }

        for zone in ClockZone::ALL {
            trace.clocks[zone.index()].push(clocks.signal(zone));
        }
        trace.time.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::component::Component;
    use crate::layout::build_graph;
    use Polarization::{One, Zero};

    fn cell(index: usize, (x, y): (f64, f64), function: CellFunction, label: Option<&str>) -> Cell {
        Cell::new(index, (x, y), function, None, label.map(str::to_string)).unwrap()
    }

    fn quick() -> SimulationConfig {
        SimulationConfig {
            num_cycles: 4,
            step: 0.25,
            clock_gating: false,
        }
    }

    fn simulate(cells: Vec<Cell>, config: SimulationConfig) -> Simulation {
        let graph = build_graph(cells).unwrap();
        Simulator::new(graph, config).simulate().unwrap()
    }

    #[test]
    fn negator_inverts_input() {
        let cells = vec![
            cell(0, (0.0, 0.0), CellFunction::Input, Some("A")),
            cell(1, (20.0, 20.0), CellFunction::Output, Some("Y")),
        ];
        let simulation = simulate(cells, quick());
        let table = simulation.truth_table;

        assert_eq!(table.inputs, vec!["A"]);
        assert_eq!(table.outputs, vec!["Y"]);
        assert_eq!(table.values, vec![vec![Some(One)], vec![Some(Zero)]]);
        assert_eq!(table.row(&[One]), Some(&[Some(Zero)][..]));
    }

    fn majority_design(third: Cell) -> Vec<Cell> {
        vec![
            cell(0, (1.0, 0.0), CellFunction::Input, Some("A")),
            cell(1, (0.0, 1.0), CellFunction::Input, Some("B")),
            third,
            cell(3, (1.0, 1.0), CellFunction::Normal, None),
            cell(4, (2.0, 1.0), CellFunction::Output, Some("Y")),
        ]
    }

    #[test]
    fn majority_gate_votes() {
        let design = majority_design(cell(2, (1.0, 2.0), CellFunction::Input, Some("C")));
        let table = simulate(design, quick()).truth_table;

        assert_eq!(table.inputs, vec!["A", "B", "C"]);
        assert_eq!(table.values.len(), 8);
        assert_eq!(table.row(&[One, One, Zero]), Some(&[Some(One)][..]));
        assert_eq!(table.row(&[One, Zero, Zero]), Some(&[Some(Zero)][..]));

        let column = table.values.iter().map(|row| row[0]).collect::<Vec<_>>();
        let expected = [0, 0, 0, 1, 0, 1, 1, 1].map(|b| Some(if b == 1 { One } else { Zero }));
        assert_eq!(column, expected);
    }

    #[test]
    fn fixed_cell_turns_majority_into_and() {
        let design = majority_design(cell(2, (1.0, 2.0), CellFunction::Fixed, Some("-1")));
        let simulation = simulate(design, quick());

        let column = simulation.truth_table.values.iter().map(|row| row[0]).collect::<Vec<_>>();
        assert_eq!(column, vec![Some(Zero), Some(Zero), Some(Zero), Some(One)]);
    }

    #[test]
    fn fixed_cell_turns_majority_into_or() {
        let design = majority_design(cell(2, (1.0, 2.0), CellFunction::Fixed, Some("1")));
        let simulator = {
            let graph = build_graph(design).unwrap();
            let mut simulator = Simulator::new(graph, quick());
            let simulation = simulator.simulate().unwrap();
            let column = simulation.truth_table.values.iter().map(|row| row[0]).collect::<Vec<_>>();
            assert_eq!(column, vec![Some(Zero), Some(One), Some(One), Some(One)]);
            simulator
        };

        // The constant survives every reset.
        let graph = simulator.into_graph();
        let fixed = graph.cells_with(CellFunction::Fixed)[0];
        assert_eq!(graph.polarization(fixed), Some(One));
    }

    #[test]
    fn feedback_loop_without_anchor_stays_unset() {
        let mut graph = Topology::new();
        let a = graph.add_component(cell(0, (0.0, 0.0), CellFunction::Normal, None).into());
        let b = graph.add_component(cell(1, (1.0, 0.0), CellFunction::Normal, None).into());
        graph.add_wire(a, b);
        graph.add_connection(a, a);

        let clocks = ClockSample::at(0.0);
        for node in [a, b] {
            graph.reset_all();
            let mut visited = graph.visit_map();
            assert_eq!(graph.resolve(node, &mut visited, &clocks, false), None);
        }
    }

    #[test]
    fn every_combination_gets_a_row() {
        let mut graph = Topology::new();
        let mut input = |i, name| graph.add_component(cell(i, (0.0, 0.0), CellFunction::Input, Some(name)).into());
        let _ = (input(0, "A"), input(1, "B"));
        let o = graph.add_component(cell(2, (0.0, 0.0), CellFunction::Output, Some("Y")).into());
        let n = graph.add_component(cell(3, (0.0, 0.0), CellFunction::Normal, None).into());
        graph.add_component(cell(4, (0.0, 0.0), CellFunction::Output, Some("Z")).into());
        graph.add_wire(o, n);

        let simulation = Simulator::new(graph, quick()).simulate().unwrap();
        let table = &simulation.truth_table;

        assert_eq!(table.values.len(), 4);
        assert!(table.values.iter().all(|row| row == &vec![None, None]));

        // 4 cycles over 4 combinations at step 0.25: four samples each.
        assert_eq!(simulation.trace.time.len(), 16);
        assert_eq!(simulation.trace.inputs[0][..8], [Zero; 8]);
        assert_eq!(simulation.trace.inputs[1][4..8], [One; 4]);
        assert!(simulation.trace.clocks.iter().all(|series| series.len() == 16));
    }

    #[test]
    fn no_inputs_still_yields_one_row() {
        let mut graph = Topology::new();
        let fixed = graph.add_component(cell(0, (0.0, 0.0), CellFunction::Fixed, Some("-1")).into());
        let out = graph.add_component(cell(1, (1.0, 0.0), CellFunction::Output, None).into());
        graph.add_wire(fixed, out);

        let table = Simulator::new(graph, quick()).simulate().unwrap().truth_table;
        assert_eq!(table.values, vec![vec![Some(Zero)]]);
        assert_eq!(table.outputs, vec!["c1"]);
    }

    #[test]
    fn clock_gating_blocks_inactive_cells() {
        let mut graph = Topology::new();
        let i = graph.add_component(cell(0, (0.0, 0.0), CellFunction::Input, None).into());
        let wire = Cell::new(1, (1.0, 0.0), CellFunction::Normal, Some(ClockZone::One), None).unwrap();
        let w = graph.add_component(wire.into());
        let o = graph.add_component(cell(2, (2.0, 0.0), CellFunction::Output, None).into());
        graph.add_wire(i, w);
        graph.add_wire(w, o);

        let inactive = ClockSample::new([1.0, -1.0, 1.0, 1.0]);
        let active = ClockSample::new([-1.0, 1.0, -1.0, -1.0]);

        for (clocks, gating, expected) in [
            (inactive, true, None),
            (inactive, false, Some(One)),
            (active, true, Some(One)),
        ] {
            graph.reset_all();
            graph.set_polarization(i, Some(One));
            let mut visited = graph.visit_map();
            assert_eq!(graph.resolve(o, &mut visited, &clocks, gating), expected);
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        for config in [
            SimulationConfig { num_cycles: 0, ..quick() },
            SimulationConfig { step: 0.0, ..quick() },
            SimulationConfig { step: f64::NAN, ..quick() },
        ] {
            let result = Simulator::new(Topology::new(), config).simulate();
            assert!(matches!(result, Err(Error::InvalidSimulation(_))));
        }
    }

    #[test]
    fn truth_table_display_and_json() {
        let table = TruthTable {
            inputs: vec!["A".to_string(), "B".to_string()],
            outputs: vec!["Y".to_string()],
            values: vec![vec![Some(Zero)], vec![Some(One)], vec![None], vec![Some(One)]],
        };

        assert_eq!(table.to_string(), "A B | Y\n0 0 | 0\n0 1 | 1\n1 0 | -\n1 1 | 1\n");

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"inputs":["A","B"],"outputs":["Y"],"values":[[0],[1],[null],[1]]}"#);
    }

    #[test]
    fn and_gate_design_file() {
        let cells = crate::parse::parse_str(include_str!("../../demos/and.qca")).unwrap();
        let table = simulate(cells, quick()).truth_table;

        assert_eq!(table.inputs, vec!["A", "B"]);
        assert_eq!(table.outputs, vec!["Y"]);
        assert_eq!(table.to_string(), "A B | Y\n0 0 | 0\n0 1 | 0\n1 0 | 0\n1 1 | 1\n");
    }

    #[test]
    fn inverter_design_file() {
        let cells = crate::parse::parse_str(include_str!("../../demos/inverter.qca")).unwrap();
        let table = simulate(cells, quick()).truth_table;

        assert_eq!(table.values, vec![vec![Some(One)], vec![Some(Zero)]]);
    }

    #[test]
    fn gates_carry_no_constant() {
        let mut graph = Topology::new();
        let gate = graph.add_component(Component::Gate {
            kind: crate::component::GateType::Majority,
            id: "m".to_string(),
        });
        let mut visited = graph.visit_map();
        assert_eq!(graph.resolve(gate, &mut visited, &ClockSample::at(1.0), false), None);
    }
}
