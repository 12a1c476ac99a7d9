//! Cells and their attributes.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// The discrete polarization of a cell or gate.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(into = "u8")]
pub enum Polarization {
    /// Logic zero (physical polarization -1).
    Zero,
    /// Logic one (physical polarization +1).
    One,
}

impl Polarization {
    /// The complementary polarization.
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    /// Bit `bit` of `word`, as a polarization.
    #[must_use]
    pub const fn from_bit(word: usize, bit: usize) -> Self {
        if (word >> bit) & 1 == 1 {
            Self::One
        } else {
            Self::Zero
        }
    }
}

impl From<Polarization> for u8 {
    fn from(p: Polarization) -> Self {
        match p {
            Polarization::Zero => 0,
            Polarization::One => 1,
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Zero => "0",
            Self::One => "1",
        })
    }
}

/// What a cell does in the design.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CellFunction {
    /// Driven externally by the simulation.
    Input,
    /// Plain wire cell.
    Normal,
    /// Observed by the simulation.
    Output,
    /// Held at a constant polarization.
    Fixed,
}

impl CellFunction {
    /// Map a design-file `cell_function` value. Unknown values are plain cells.
    #[must_use]
    pub fn from_design(value: &str) -> Self {
        match value {
            "QCAD_CELL_INPUT" => Self::Input,
            "QCAD_CELL_OUTPUT" => Self::Output,
            "QCAD_CELL_FIXED" => Self::Fixed,
            _ => Self::Normal,
        }
    }
}

/// One of the four phase-shifted clock zones.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ClockZone {
    /// Clock 0, phase 0.
    Zero,
    /// Clock 1, phase 3π/2.
    One,
    /// Clock 2, phase π.
    Two,
    /// Clock 3, phase π/2.
    Three,
}

impl ClockZone {
    /// All zones, in index order.
    pub const ALL: [Self; 4] = [Self::Zero, Self::One, Self::Two, Self::Three];

    /// Decode a design-file clock number; `-1` means unassigned.
    #[must_use]
    pub const fn from_number(clock: i64) -> Option<Option<Self>> {
        match clock {
            -1 => Some(None),
            0 => Some(Some(Self::Zero)),
            1 => Some(Some(Self::One)),
            2 => Some(Some(Self::Two)),
            3 => Some(Some(Self::Three)),
            _ => None,
        }
    }

    /// Position of this zone in [`ClockZone::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Phase offset of this zone's waveform.
    #[must_use]
    pub fn phase(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::One => 3.0 * FRAC_PI_2,
            Self::Two => PI,
            Self::Three => FRAC_PI_2,
        }
    }

    /// The clock signal of this zone at (already scaled) time `t`.
    #[must_use]
    pub fn signal(self, t: f64) -> f64 {
        (t + self.phase()).sin()
    }
}

/// A single automaton cell, as read from a design file.
///
/// Apart from its position, which normalization rescales once, a cell does not change after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    index: usize,
    x: f64,
    y: f64,
    function: CellFunction,
    clock: Option<ClockZone>,
    label: Option<String>,
    constant: Option<Polarization>,
}

impl Cell {
    /// Create a cell. Fixed cells derive their constant polarization from `label`: -1 is zero, any other number
    /// is one.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFixedLabel`] when a fixed cell's label is missing or not numeric.
    pub fn new(
        index: usize,
        (x, y): (f64, f64),
        function: CellFunction,
        clock: Option<ClockZone>,
        label: Option<String>,
    ) -> Result<Self> {
        let constant = if function == CellFunction::Fixed {
            let value = label
                .as_deref()
                .and_then(|label| label.trim().replace(',', ".").parse::<f64>().ok())
                .ok_or_else(|| Error::InvalidFixedLabel {
                    cell: format!("c{index}"),
                    label: label.clone(),
                })?;

            Some(if (value + 1.0).abs() < f64::EPSILON { Polarization::Zero } else { Polarization::One })
        } else {
            None
        };

        Ok(Self {
            index,
            x,
            y,
            function,
            clock,
            label,
            constant,
        })
    }

    /// Sequential index of this cell in its design file.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Stable identifier, `c<index>`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("c{}", self.index)
    }

    /// Display name: the label if there is one, otherwise the id.
    #[must_use]
    pub fn name(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.id())
    }

    /// Horizontal position.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical position.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// What the cell does.
    #[must_use]
    pub const fn function(&self) -> CellFunction {
        self.function
    }

    /// Clock zone, if assigned.
    #[must_use]
    pub const fn clock(&self) -> Option<ClockZone> {
        self.clock
    }

    /// Label text, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The constant polarization of a fixed cell.
    #[must_use]
    pub const fn constant(&self) -> Option<Polarization> {
        self.constant
    }

    pub(crate) fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Manhattan distance to `other`.
    #[must_use]
    pub fn manhattan(&self, other: &Self) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn euclidean(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Visualization color, keyed to function and clock zone.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match (self.function, self.clock) {
            (CellFunction::Input, _) => "blue",
            (CellFunction::Output, _) => "yellow",
            (CellFunction::Fixed, _) => "orange",
            (CellFunction::Normal, Some(ClockZone::Zero)) => "green",
            (CellFunction::Normal, Some(ClockZone::One)) => "magenta",
            (CellFunction::Normal, Some(ClockZone::Two)) => "turquoise",
            (CellFunction::Normal, Some(ClockZone::Three)) => "gray",
            (CellFunction::Normal, None) => "black",
        }
    }
}
