//! Reader for QCADesigner design files.
//!
//! A design file is a stack of bracketed sections, `[NAME]` ... `[#NAME]`, holding `key=value` lines. Only cells
//! are of interest here: a `TYPE:QCADCell` section supplies position, clock and function, and a nested
//! `TYPE:QCADLabel` section supplies the label. The dot sub-sections of a cell and the label's own geometry are
//! skipped.

use std::io::BufRead;
use std::path::Path;

use tracing::{debug, trace};

use crate::cell::{Cell, CellFunction, ClockZone};
use crate::error::{Error, Result};

const CELL: &str = "TYPE:QCADCell";
const CELL_DOT: &str = "TYPE:CELL_DOT";
const LABEL: &str = "TYPE:QCADLabel";

/// Attributes collected so far for the cell being read.
#[derive(Debug, Default)]
struct PartialCell {
    x: Option<f64>,
    y: Option<f64>,
    clock: Option<ClockZone>,
    function: Option<CellFunction>,
    label: Option<String>,
}

#[derive(Debug, Default)]
struct Parser {
    sections: Vec<String>,
    cells: Vec<Cell>,
    current: Option<PartialCell>,
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<f64> {
    value
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| Error::InvalidNumber {
            line,
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl Parser {
    fn inside(&self, section: &str) -> bool {
        self.sections.iter().any(|s| s == section)
    }

    fn push_section(&mut self, section: &str) {
        trace!(section, "entering section");
        if section == CELL {
            self.current = Some(PartialCell::default());
        }
        self.sections.push(section.to_string());
    }

    fn pop_section(&mut self, line: usize, section: &str) -> Result<()> {
        match self.sections.last() {
            Some(last) if last == section => {}
            last => {
                return Err(Error::MalformedFile {
                    line,
                    expected: last.cloned(),
                    found: section.to_string(),
                })
            }
        }

        trace!(section, "leaving section");
        self.sections.pop();

        if section == CELL {
            if let Some(partial) = self.current.take() {
                self.finish_cell(line, partial)?;
            }
        }

        Ok(())
    }

    fn finish_cell(&mut self, line: usize, partial: PartialCell) -> Result<()> {
        let missing = |key: &str| Error::InvalidNumber {
            line,
            key: key.to_string(),
            value: String::new(),
        };
        let x = partial.x.ok_or_else(|| missing("x"))?;
        let y = partial.y.ok_or_else(|| missing("y"))?;

        let cell = Cell::new(
            self.cells.len(),
            (x, y),
            partial.function.unwrap_or(CellFunction::Normal),
            partial.clock,
            partial.label,
        )?;

        trace!(cell = %cell.id(), x, y, function = ?cell.function(), "read cell");
        self.cells.push(cell);
        Ok(())
    }

    fn attribute(&mut self, line: usize, key: &str, value: &str) -> Result<()> {
        let in_label = self.inside(LABEL);
        let in_dot = self.inside(CELL_DOT);
        let Some(cell) = self.current.as_mut() else {
            return Ok(());
        };

        if in_label {
            if key == "psz" {
                cell.label = Some(value.to_string());
            }
            return Ok(());
        }

        if in_dot {
            return Ok(());
        }

        match key {
            "x" => cell.x = Some(parse_number(line, key, value)?),
            "y" => cell.y = Some(parse_number(line, key, value)?),
            "cell_options.clock" => {
                let number = parse_number(line, key, value)?;
                #[allow(clippy::cast_possible_truncation)]
                let clock = number.round() as i64;
                cell.clock = ClockZone::from_number(clock).ok_or(Error::InvalidClock { line, clock })?;
            }
            "cell_function" => cell.function = Some(CellFunction::from_design(value)),
            _ => {}
        }

        Ok(())
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        if let Some(section) = line.strip_prefix("[#").and_then(|l| l.strip_suffix(']')) {
            self.pop_section(line_no, section)
        } else if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            self.push_section(section);
            Ok(())
        } else if let Some((key, value)) = line.split_once('=') {
            self.attribute(line_no, key.trim(), value.trim())
        } else {
            Ok(())
        }
    }

    fn finish(self) -> Result<Vec<Cell>> {
        if let Some(section) = self.sections.last() {
            return Err(Error::UnclosedSection {
                section: section.clone(),
            });
        }
        debug!(cells = self.cells.len(), "parsed design");
        Ok(self.cells)
    }
}

/// Read every cell from a design held in memory, in file order.
///
/// # Errors
/// Returns [`Error::MalformedFile`] or [`Error::UnclosedSection`] for badly nested sections, and
/// [`Error::InvalidNumber`], [`Error::InvalidClock`] or [`Error::InvalidFixedLabel`] for bad cell attributes.
pub fn parse_str(text: &str) -> Result<Vec<Cell>> {
    let mut parser = Parser::default();
    for (i, line) in text.lines().enumerate() {
        parser.feed(i + 1, line)?;
    }
    parser.finish()
}

/// Read every cell from a design, line by line.
///
/// # Errors
/// As [`parse_str`], plus [`Error::Io`] if reading fails.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<Cell>> {
    let mut parser = Parser::default();
    for (i, line) in reader.lines().enumerate() {
        parser.feed(i + 1, &line?)?;
    }
    parser.finish()
}

/// Read every cell from a design file.
///
/// # Errors
/// As [`parse_reader`].
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Cell>> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file))
}
