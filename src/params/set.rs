// src/params/set.rs

use tracing::debug;

use crate::errors::{JobError, Result};
use crate::params::tables;
use crate::params::{ParamGroup, ParamValue};

/// Engine input sections, in the order they are written to an input deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputGroup {
    Contrl,
    Scf,
    System,
    Mp2,
    Dft,
    Guess,
    Statpt,
    Basis,
}

impl InputGroup {
    pub const ALL: [InputGroup; 8] = [
        InputGroup::Contrl,
        InputGroup::Scf,
        InputGroup::System,
        InputGroup::Mp2,
        InputGroup::Dft,
        InputGroup::Guess,
        InputGroup::Statpt,
        InputGroup::Basis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InputGroup::Contrl => "CONTRL",
            InputGroup::Scf => "SCF",
            InputGroup::System => "SYSTEM",
            InputGroup::Mp2 => "MP2",
            InputGroup::Dft => "DFT",
            InputGroup::Guess => "GUESS",
            InputGroup::Statpt => "STATPT",
            InputGroup::Basis => "BASIS",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Int,
    Bool,
    Text,
}

/// Every UI parameter, its type and its default.
const UI_SCHEMA: &[(&str, Kind)] = &[
    ("comment", Kind::Text),
    ("conv", Kind::Int),
    ("damp", Kind::Bool),
    ("dfttyp", Kind::Int),
    ("diis", Kind::Bool),
    ("dirscf", Kind::Bool),
    ("ecm", Kind::Int),
    ("extrap", Kind::Bool),
    ("gbasis", Kind::Int),
    ("gbasisname", Kind::Text),
    ("gridsize", Kind::Int),
    ("icharg", Kind::Int),
    ("iterations", Kind::Int),
    ("memory", Kind::Int),
    ("mult", Kind::Int),
    ("ncore", Kind::Bool),
    ("rmsdconv", Kind::Int),
    ("rstrct", Kind::Bool),
    ("runtyp", Kind::Int),
    ("scftyp", Kind::Int),
    ("shift", Kind::Bool),
    ("soscf", Kind::Bool),
];

fn default_ui() -> ParamGroup {
    use ParamValue::*;
    ParamGroup::new("UI")
        .with("comment", Text(String::new()))
        .with("conv", Int(1))
        .with("damp", Bool(false))
        .with("dfttyp", Int(4))
        .with("diis", Bool(true))
        .with("dirscf", Bool(true))
        .with("ecm", Int(0))
        .with("extrap", Bool(true))
        .with("gbasis", Int(0))
        .with("gbasisname", Text("AM1".to_string()))
        .with("gridsize", Int(1))
        .with("icharg", Int(0))
        .with("iterations", Int(50))
        .with("memory", Int(70))
        .with("mult", Int(0))
        .with("ncore", Bool(false))
        .with("rmsdconv", Int(1))
        .with("rstrct", Bool(false))
        .with("runtyp", Int(0))
        .with("scftyp", Int(0))
        .with("shift", Bool(false))
        .with("soscf", Bool(false))
}

fn kind_of(name: &str) -> Option<Kind> {
    UI_SCHEMA
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

fn decode_int(val: &str) -> Option<i64> {
    val.trim().parse().ok()
}

fn decode_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// All parameters for one quantum-chemistry job.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    name: String,
    ui: ParamGroup,
    inputs: Vec<ParamGroup>,
}

impl ParameterSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ui: default_ui(),
            inputs: InputGroup::ALL
                .iter()
                .map(|g| ParamGroup::new(g.label()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The master group; everything persisted comes from here.
    pub fn ui(&self) -> &ParamGroup {
        &self.ui
    }

    pub fn group(&self, group: InputGroup) -> &ParamGroup {
        &self.inputs[group.index()]
    }

    pub(crate) fn group_mut(&mut self, group: InputGroup) -> &mut ParamGroup {
        &mut self.inputs[group.index()]
    }

    pub fn ui_int(&self, key: &str) -> i64 {
        self.ui.get(key).and_then(ParamValue::as_int).unwrap_or(0)
    }

    pub fn ui_bool(&self, key: &str) -> bool {
        self.ui.get(key).and_then(ParamValue::as_bool).unwrap_or(false)
    }

    pub fn ui_text(&self, key: &str) -> &str {
        self.ui.get(key).and_then(ParamValue::as_text).unwrap_or("")
    }

    /// Typed UI setter. The name must be a known UI parameter and the value
    /// must have its type.
    pub fn set_ui(&mut self, key: &str, value: ParamValue) -> Result<()> {
        let kind = kind_of(key)
            .ok_or_else(|| JobError::Parameter(format!("unknown parameter {key:?}")))?;
        let ok = matches!(
            (kind, &value),
            (Kind::Int, ParamValue::Int(_))
                | (Kind::Bool, ParamValue::Bool(_))
                | (Kind::Text, ParamValue::Text(_))
        );
        if !ok {
            return Err(JobError::Parameter(format!(
                "parameter {key:?} expects {kind:?}, got {value:?}"
            )));
        }
        self.ui.set(key, value);
        Ok(())
    }

    /// Set a UI parameter from its textual form.
    ///
    /// Returns `Ok(true)` when the value was applied. A value that does not
    /// decode leaves the old value in place (`Ok(false)`). Unknown names are
    /// skipped unless `strict`, in which case they are an error.
    pub fn set_item(&mut self, name: &str, val: &str, strict: bool) -> Result<bool> {
        let Some(kind) = kind_of(name) else {
            if strict {
                return Err(JobError::Parameter(format!(
                    "unrecognized parameter name {name:?}"
                )));
            }
            debug!(param = name, "skipping unrecognized parameter");
            return Ok(false);
        };

        let decoded = match kind {
            Kind::Int => decode_int(val).map(ParamValue::Int),
            Kind::Bool => decode_bool(val).map(ParamValue::Bool),
            Kind::Text => Some(ParamValue::Text(val.trim().to_string())),
        };

        match decoded {
            Some(value) => {
                self.ui.set(name, value);
                Ok(true)
            }
            None => {
                debug!(param = name, value = val, "value does not decode; keeping previous");
                Ok(false)
            }
        }
    }

    /// `(name, value)` pairs for every persisted parameter.
    pub fn names_and_values(&self) -> Vec<(String, String)> {
        self.ui.to_records()
    }

    /// Independent copy built only through `names_and_values` and
    /// `set_item`, so it shares nothing with `self`.
    pub fn deep_copy(&self, alter_name: bool) -> Result<ParameterSet> {
        let name = if alter_name {
            format!("{} copy", self.name)
        } else {
            self.name.clone()
        };
        let mut copy = ParameterSet::new(name);
        for (key, value) in self.names_and_values() {
            copy.set_item(&key, value.trim(), true)?;
        }
        Ok(copy)
    }

    /// Select a basis set by display name (`6-31G`, `AM1`, ...).
    ///
    /// The stored index is relative to the bases offered for the current
    /// correlation method, so set `ecm` first.
    pub fn set_basis(&mut self, name: &str) -> Result<()> {
        let index = tables::GBASIS_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| JobError::Parameter(format!("unknown basis set {name:?}")))?;
        let offset = if self.ui_int("ecm") != 0 {
            tables::CORRELATED_BASIS_OFFSET
        } else {
            0
        };
        if index < offset {
            return Err(JobError::Parameter(format!(
                "basis {name} cannot be used with a correlation method"
            )));
        }
        self.set_ui("gbasis", ParamValue::Int((index - offset) as i64))?;
        self.set_ui("gbasisname", ParamValue::Text(tables::GBASIS_NAMES[index].to_string()))
    }

    /// Calculation tag shown in the job list.
    pub fn calculation(&self) -> &'static str {
        if self.ui_int("runtyp") == 1 {
            "Optimize"
        } else {
            "Energy"
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new("Parameter Set 1")
    }
}
