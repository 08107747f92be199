// src/params/records.rs

//! Flat line-oriented persistence of parameter sets.
//!
//! ```text
//! # gamess parameter set 0 for preceding jig
//! info gamess 0 conv = 1
//! info gamess 0 gbasisname = 6-31G
//! # end of gamess parameter set 0
//! ```
//!
//! The set index lets one file carry several sets.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use tracing::{debug, error};

use crate::params::ParameterSet;

/// Longest line (newline excluded) the record format allows.
pub const MAX_RECORD_LINE: usize = 511;

const RECORD_PREFIX: &str = "info gamess ";

impl ParameterSet {
    /// Append this set's records under `pset_index`.
    pub fn write_records(&self, out: &mut String, pset_index: usize) {
        let _ = writeln!(out, "# gamess parameter set {pset_index} for preceding jig");
        for (name, value) in self.names_and_values() {
            let mut value = value.trim().to_string();
            if let Some((first, _)) = value.split_once('\n') {
                error!(param = %name, "multi-line value; writing only the first line");
                value = first.trim().to_string();
            }
            let line = format!("{RECORD_PREFIX}{pset_index} {name} = {value}");
            if line.len() > MAX_RECORD_LINE {
                error!(param = %name, "record too long for the parameter file; not written");
                let _ = writeln!(
                    out,
                    "# didn't write too-long valstring for info gamess {pset_index} {name} = ..."
                );
            } else {
                out.push_str(&line);
                out.push('\n');
            }
        }
        let _ = writeln!(out, "# end of gamess parameter set {pset_index}");
    }

    /// Apply every record for `pset_index` found in `text`; returns how many
    /// were applied. Records for other sets, comments, unknown names and
    /// undecodable values are skipped.
    pub fn read_records(&mut self, text: &str, pset_index: usize) -> usize {
        parse_records(text)
            .filter(|(idx, _, _)| *idx == pset_index)
            .filter(|(_, name, value)| matches!(self.set_item(name, value, false), Ok(true)))
            .count()
    }
}

/// Iterate `(index, name, value)` over well-formed record lines.
fn parse_records(text: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    text.lines().filter_map(|line| {
        let rest = line.trim_start().strip_prefix(RECORD_PREFIX)?;
        let (key, value) = rest.split_once('=')?;
        let mut key_words = key.split_whitespace();
        let idx = key_words.next()?.parse().ok();
        let name = key_words.next();
        match (idx, name, key_words.next()) {
            (Some(idx), Some(name), None) => Some((idx, name, value.trim())),
            _ => {
                debug!(line, "malformed parameter record");
                None
            }
        }
    })
}

/// Serialize several sets, indexed by position.
pub fn write_parameter_sets(sets: &[ParameterSet]) -> String {
    let mut out = String::new();
    for (idx, set) in sets.iter().enumerate() {
        set.write_records(&mut out, idx);
    }
    out
}

/// Rebuild every set mentioned in `text`, ordered by index. Sets are named
/// `Parameter Set <n>` (1-based), as freshly created sets are.
pub fn read_parameter_sets(text: &str) -> Vec<ParameterSet> {
    let indices: BTreeSet<usize> = parse_records(text).map(|(idx, _, _)| idx).collect();
    indices
        .into_iter()
        .map(|idx| {
            let mut set = ParameterSet::new(format!("Parameter Set {}", idx + 1));
            set.read_records(text, idx);
            set
        })
        .collect()
}
