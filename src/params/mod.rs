// src/params/mod.rs

//! Quantum-chemistry parameter sets.
//!
//! A [`ParameterSet`] holds a master `UI` group (what the user chose, and
//! what gets persisted) plus the engine input groups (`$CONTRL`, `$SCF`, ...)
//! that are derived from it right before an input deck is written. The
//! mapping is not one-to-one and differs between GAMESS and PC GAMESS; see
//! [`derive`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

pub mod derive;
pub mod records;
pub mod set;
pub mod tables;

pub use records::{read_parameter_sets, write_parameter_sets};
pub use set::ParameterSet;

/// Value of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
    Unset,
}

impl ParamValue {
    /// Null parameters are left out of engine input decks.
    pub fn is_null(&self) -> bool {
        match self {
            ParamValue::Int(v) => *v == 0,
            ParamValue::Bool(v) => !*v,
            ParamValue::Float(v) => *v == 0.0,
            ParamValue::Text(v) => v.is_empty(),
            ParamValue::Unset => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            ParamValue::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            ParamValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(true) => f.write_str("True"),
            ParamValue::Bool(false) => f.write_str("False"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
            ParamValue::Unset => f.write_str("None"),
        }
    }
}

/// A named group of parameters with unique names, kept sorted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamGroup {
    name: String,
    params: BTreeMap<String, ParamValue>,
}

impl ParamGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Insert or replace; returns the previous value.
    pub fn set(&mut self, key: &str, value: ParamValue) -> Option<ParamValue> {
        self.params.insert(key.to_string(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Flat `name=value` records, sorted by name.
    pub fn to_records(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Write the group as an engine input section, ` $NAME k=v ... $END`,
    /// skipping null values and wrapping before column 70.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, " ${} ", self.name)?;
        let mut col = self.name.len() + 3;
        for (key, value) in &self.params {
            if value.is_null() {
                continue;
            }
            let phrase = format!("{}={}", key.to_uppercase(), value);
            col += 1 + phrase.len();
            if col > 70 {
                col = phrase.len();
                writeln!(out)?;
            }
            write!(out, "{phrase} ")?;
        }
        writeln!(out, "$END")
    }
}
