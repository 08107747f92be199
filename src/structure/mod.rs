// src/structure/mod.rs

//! Boundary to the molecular model.
//!
//! The job machinery never looks inside a structure; it asks a
//! [`StructureModel`] to write the engine input and to read results back.
//! [`XyzStructure`] is the file-backed model the CLI uses.

use std::fmt;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::trajectory::{self, TrajectoryFormat};

pub mod gamess_out;

/// Cartesian position in Angstrom.
pub type Position = [f64; 3];

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub symbol: String,
    pub position: Position,
}

/// Final energy reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Energy {
    pub value: f64,
    pub unit: String,
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.10} {}", self.value, self.unit)
    }
}

/// Hooks the runner needs from the molecular model.
///
/// The result readers have defaults that understand the trajectory formats
/// and GAMESS output; a model with its own formats can override them.
pub trait StructureModel: Send + Sync {
    fn atoms(&self) -> Vec<Atom>;

    fn atom_count(&self) -> usize {
        self.atoms().len()
    }

    /// Extension of the file written by [`Self::write_structural_input`].
    fn input_extension(&self) -> &str;

    fn write_structural_input(&self, path: &Path) -> Result<()>;

    /// Geometry at the end of a run: last trajectory frame, or the final
    /// coordinates in a quantum-chemistry log.
    fn read_result_geometry(&self, path: &Path) -> Result<Vec<Position>> {
        match TrajectoryFormat::from_path(path) {
            Some(TrajectoryFormat::Dpb) => {
                let file = fs::File::open(path).with_context(|| format!("opening {:?}", path))?;
                let initial: Vec<Position> = self.atoms().iter().map(|a| a.position).collect();
                let (_, frames) = trajectory::read_dpb(BufReader::new(file), &initial)
                    .with_context(|| format!("decoding {:?}", path))?;
                frames
                    .into_iter()
                    .last()
                    .ok_or_else(|| anyhow!("{:?} contains no frames", path))
            }
            Some(TrajectoryFormat::Xyz) => {
                let text =
                    fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
                let frames = trajectory::read_xyz(&text).map_err(|e| anyhow!("{:?}: {e}", path))?;
                frames
                    .last()
                    .map(|f| f.positions())
                    .ok_or_else(|| anyhow!("{:?} contains no frames", path))
            }
            None => {
                let text =
                    fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
                let atoms = gamess_out::final_geometry(&text)
                    .ok_or_else(|| anyhow!("no coordinates found in {:?}", path))?;
                Ok(atoms.into_iter().map(|a| a.position).collect())
            }
        }
    }

    fn read_final_energy(&self, path: &Path) -> Result<Energy> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        gamess_out::final_energy(&text).ok_or_else(|| anyhow!("no final energy found in {:?}", path))
    }
}

/// A structure loaded from an XYZ file (first frame).
#[derive(Debug, Clone)]
pub struct XyzStructure {
    source: PathBuf,
    atoms: Vec<Atom>,
}

impl XyzStructure {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        let frames = trajectory::read_xyz(&text).map_err(|e| anyhow!("{:?}: {e}", path))?;
        let Some(first) = frames.into_iter().next() else {
            bail!("{:?} contains no atoms", path);
        };
        Ok(Self {
            source: path.to_path_buf(),
            atoms: first.atoms,
        })
    }

    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self {
            source: PathBuf::new(),
            atoms,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl StructureModel for XyzStructure {
    fn atoms(&self) -> Vec<Atom> {
        self.atoms.clone()
    }

    fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    fn input_extension(&self) -> &str {
        "xyz"
    }

    fn write_structural_input(&self, path: &Path) -> Result<()> {
        let mut out = Vec::new();
        trajectory::write_xyz_frame(&mut out, 0, &self.atoms)?;
        fs::write(path, out).with_context(|| format!("writing {:?}", path))
    }
}

const ELEMENTS: [&str; 36] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr",
];

/// Nuclear charge for the elements up to krypton (case-insensitive).
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|e| e.eq_ignore_ascii_case(symbol.trim()))
        .map(|i| i as u32 + 1)
}
