// src/structure/gamess_out.rs

//! Scraping results out of GAMESS / PC GAMESS logs.

use std::sync::OnceLock;

use regex::Regex;

use super::{Atom, Energy};

fn energy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // "FINAL RHF ENERGY IS  -76.0107465155 AFTER  10 ITERATIONS"
        // "FINAL R-B3LYP ENERGY IS -76.4..."
        Regex::new(r"FINAL\s+(?:[A-Z0-9()-]+\s+)?ENERGY\s+IS\s+(-?\d+\.\d+)").expect("energy pattern")
    })
}

fn coord_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // " C           6.0   0.0000000000   0.0000000000   0.0000000000"
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9]*)\s+\d+\.\d+\s+(-?\d+\.\d+)\s+(-?\d+\.\d+)\s+(-?\d+\.\d+)\s*$")
            .expect("coordinate pattern")
    })
}

const COORD_HEADER: &str = "COORDINATES OF ALL ATOMS ARE (ANGS)";

/// Last reported total energy, in Hartree.
pub fn final_energy(log: &str) -> Option<Energy> {
    energy_re()
        .captures_iter(log)
        .last()
        .and_then(|c| c[1].parse().ok())
        .map(|value| Energy {
            value,
            unit: "Hartree".to_string(),
        })
}

/// Atoms of the last coordinate block in the log.
pub fn final_geometry(log: &str) -> Option<Vec<Atom>> {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.iter().rposition(|l| l.contains(COORD_HEADER))?;

    let atoms: Vec<Atom> = lines[start + 1..]
        .iter()
        .skip_while(|l| !coord_re().is_match(l))
        .map_while(|l| coord_re().captures(l))
        .filter_map(|c| {
            Some(Atom {
                symbol: c[1].to_string(),
                position: [c[2].parse().ok()?, c[3].parse().ok()?, c[4].parse().ok()?],
            })
        })
        .collect();

    if atoms.is_empty() { None } else { Some(atoms) }
}
