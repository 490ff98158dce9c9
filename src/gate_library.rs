// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Gate-library catalog lowered from parsed Liberty.
//!
//! The catalog is what netlist tools consume to instantiate and connect
//! gates: the set of cell types, global and per-cell pin-name indexes
//! keyed by direction, and the cells recognized as constant-0/constant-1
//! sources.

use crate::liberty_parser::{LibertyError, LibertyLibrary};
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

/// Pin direction recognized in the Liberty subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Inout,
    Output,
}

impl std::fmt::Display for PinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Inout => write!(f, "inout"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// The gate-library catalog.
///
/// Per-cell pin lists keep declaration order. `global_gnd_gate_types` and
/// `global_vcc_gate_types` hold the cells whose output function is the
/// constant `0` / `1`; a library that declares no tie-low cell gets a
/// synthesized `GLOBAL_GND` with a single output pin `O` (and only then,
/// if it also declares no tie-high cell, no `GLOBAL_VCC` is added — the
/// supply default is evaluated only when a ground source already exists).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateLibrary {
    /// Library name, used for display.
    pub name: String,
    /// Names of every cell type in the library.
    pub gate_types: IndexSet<CompactString>,
    /// Input pin names across all cells.
    pub input_pin_types: IndexSet<CompactString>,
    /// Inout pin names across all cells.
    pub inout_pin_types: IndexSet<CompactString>,
    /// Output pin names across all cells.
    pub output_pin_types: IndexSet<CompactString>,
    /// Input pin names of each cell, in declaration order.
    pub gate_to_input_map: IndexMap<CompactString, Vec<CompactString>>,
    /// Inout pin names of each cell, in declaration order.
    pub gate_to_inout_map: IndexMap<CompactString, Vec<CompactString>>,
    /// Output pin names of each cell, in declaration order.
    pub gate_to_output_map: IndexMap<CompactString, Vec<CompactString>>,
    /// Cells driving constant 0.
    pub global_gnd_gate_types: IndexSet<CompactString>,
    /// Cells driving constant 1.
    pub global_vcc_gate_types: IndexSet<CompactString>,
}

impl GateLibrary {
    /// Parse a Liberty file from disk and lower it to a catalog.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, LibertyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LibertyError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse_str(&content)
    }

    /// Parse Liberty text and lower it to a catalog.
    pub fn parse_str(input: &str) -> Result<Self, LibertyError> {
        Ok(LibertyLibrary::parse_str(input)?.into())
    }

    /// Parse a Liberty source stream and lower it to a catalog.
    pub fn parse_reader(reader: impl BufRead) -> Result<Self, LibertyError> {
        Ok(LibertyLibrary::parse_reader(reader)?.into())
    }

    /// Direction of `pin` on `cell`, if the catalog knows it.
    pub fn pin_direction(&self, cell: &str, pin: &str) -> Option<PinDirection> {
        let listed = |map: &IndexMap<CompactString, Vec<CompactString>>| {
            map.get(cell)
                .map_or(false, |pins| pins.iter().any(|p| p.as_str() == pin))
        };
        if listed(&self.gate_to_input_map) {
            Some(PinDirection::Input)
        } else if listed(&self.gate_to_inout_map) {
            Some(PinDirection::Inout)
        } else if listed(&self.gate_to_output_map) {
            Some(PinDirection::Output)
        } else {
            None
        }
    }

    /// Whether `cell` drives constant 0.
    pub fn is_global_gnd(&self, cell: &str) -> bool {
        self.global_gnd_gate_types.contains(cell)
    }

    /// Whether `cell` drives constant 1.
    pub fn is_global_vcc(&self, cell: &str) -> bool {
        self.global_vcc_gate_types.contains(cell)
    }

    /// One-line statistics for debug output.
    pub fn summary(&self) -> String {
        format!(
            "gate library {}: {} gate types, {} input / {} inout / {} output pin types, {} tie-low, {} tie-high",
            self.name,
            self.gate_types.len(),
            self.input_pin_types.len(),
            self.inout_pin_types.len(),
            self.output_pin_types.len(),
            self.global_gnd_gate_types.len(),
            self.global_vcc_gate_types.len()
        )
    }

    /// Register a synthesized constant-source cell with one output pin `O`.
    fn synthesize_constant_source(&mut self, name: &str, is_gnd: bool) {
        let name = CompactString::from(name);
        if is_gnd {
            self.global_gnd_gate_types.insert(name.clone());
        } else {
            self.global_vcc_gate_types.insert(name.clone());
        }
        self.gate_types.insert(name.clone());
        self.output_pin_types.insert("O".into());
        self.gate_to_output_map
            .entry(name)
            .or_default()
            .push("O".into());
    }
}

impl From<LibertyLibrary> for GateLibrary {
    fn from(inter: LibertyLibrary) -> GateLibrary {
        let mut lib = GateLibrary {
            name: inter.name,
            ..Default::default()
        };

        for cell in &inter.cells {
            lib.gate_types.insert(cell.name.clone());

            for pin in &cell.pins {
                match pin.direction.as_deref() {
                    Some("input") => {
                        lib.input_pin_types.insert(pin.name.clone());
                        lib.gate_to_input_map
                            .entry(cell.name.clone())
                            .or_default()
                            .push(pin.name.clone());
                    }
                    Some("inout") => {
                        lib.inout_pin_types.insert(pin.name.clone());
                        lib.gate_to_inout_map
                            .entry(cell.name.clone())
                            .or_default()
                            .push(pin.name.clone());
                    }
                    Some("output") => {
                        lib.output_pin_types.insert(pin.name.clone());
                        lib.gate_to_output_map
                            .entry(cell.name.clone())
                            .or_default()
                            .push(pin.name.clone());

                        if pin.function.as_deref() == Some("0") {
                            lib.global_gnd_gate_types.insert(cell.name.clone());
                        } else if pin.function.as_deref() == Some("1") {
                            lib.global_vcc_gate_types.insert(cell.name.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        // default constant sources; the supply default is evaluated only
        // when a ground source already exists
        if lib.global_gnd_gate_types.is_empty() {
            lib.synthesize_constant_source("GLOBAL_GND", true);
        } else if lib.global_vcc_gate_types.is_empty() {
            lib.synthesize_constant_source("GLOBAL_VCC", false);
        }

        lib
    }
}
