// src/params/tables.rs

//! Lookup tables from UI choices (indices) to engine keywords.

/// RUNTYP by `ui.runtyp`.
pub const RUNTYP: [&str; 2] = ["ENERGY", "OPTIMIZE"];

/// SCFTYP by `ui.scftyp`.
pub const SCFTYP: [&str; 3] = ["RHF", "UHF", "ROHF"];

/// Electron correlation method by `ui.ecm`.
pub const ECM: [&str; 3] = ["None", "DFT", "MP2"];

/// MPLEVL by `ui.ecm`.
pub const MPLEVL: [i64; 3] = [0, 0, 2];

/// INTTYP by `ui.ecm`.
pub const INTTYP: [&str; 3] = ["POPLE", "POPLE", "HONDO"];

/// GBASIS keyword by basis index. The first two are semi-empirical and
/// unavailable with a correlation method, so with DFT/MP2 the index is
/// shifted by [`CORRELATED_BASIS_OFFSET`].
pub const GBASIS: [&str; 8] = ["AM1", "PM3", "STO", "N21", "N31", "N311", "DZV", "TZV"];

/// Display names matching [`GBASIS`].
pub const GBASIS_NAMES: [&str; 8] = [
    "AM1", "PM3", "STO-3G", "3-21G", "6-31G", "6-311G", "DZV", "TZV",
];

pub const CORRELATED_BASIS_OFFSET: usize = 2;

/// NGAUSS for Pople basis sets.
pub fn ngauss(gbasis: &str) -> i64 {
    match gbasis {
        "STO" | "N21" => 3,
        "N31" | "N311" => 6,
        _ => 0,
    }
}

/// Density/energy convergence, GAMESS `CONV`, by `ui.conv`.
pub const CONV: [&str; 4] = ["1.0E-05", "1.0E-06", "1.0E-07", "1.0E-08"];

/// Same convergence levels as PC GAMESS `NCONV` exponents.
pub const NCONV: [i64; 4] = [5, 6, 7, 8];

/// RMS gradient tolerance for optimizations by `ui.rmsdconv`.
pub const OPTTOL: [f64; 4] = [0.001, 0.0005, 0.0001, 0.00001];

/// DFT functionals understood by GAMESS, by `ui.dfttyp`.
pub const GMS_DFTTYP: [&str; 6] = [
    "SLATER (Slater exchange)",
    "BECKE (Becke 1988 exchange)",
    "SVWN (Slater + VWN5)",
    "BLYP (Becke + Lee-Yang-Parr)",
    "B3LYP (Becke 3-parameter hybrid)",
    "PBE (Perdew-Burke-Ernzerhof)",
];

/// DFT functionals understood by PC GAMESS, by `ui.dfttyp`.
pub const PCGMS_DFTTYP: [&str; 6] = [
    "SLATER (Slater exchange)",
    "B88 (Becke 1988 exchange)",
    "SVWN1RPA (Slater + VWN1 RPA)",
    "BLYP (Becke + Lee-Yang-Parr)",
    "B3LYP1 (Becke 3-parameter hybrid, VWN1)",
    "B3LYP5 (Becke 3-parameter hybrid, VWN5)",
];

/// Radial grid points by `ui.gridsize` (coarse, default, fine, army grade).
pub const GMS_GRIDSIZE: [i64; 4] = [48, 96, 120, 150];
pub const PCGMS_GRIDSIZE: [i64; 4] = [32, 64, 96, 128];

/// Time limit written to `$SYSTEM`, minutes.
pub const TIMLIN_MINUTES: i64 = 1000;

/// Fortran logical literals.
pub fn tf(v: bool) -> &'static str {
    if v { ".T." } else { ".F." }
}

/// Functional keyword: the first word of a table entry.
pub fn functional_keyword(item: &str) -> &str {
    item.split(' ').next().unwrap_or(item)
}

/// Bounds-checked table lookup; out-of-range indices fall back to entry 0.
pub fn pick<T: Copy>(table: &[T], index: i64) -> T {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i).copied())
        .unwrap_or(table[0])
}
