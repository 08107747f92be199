// src/trajectory/mod.rs

//! Trajectory output of the MD simulator.
//!
//! Two encodings exist:
//! - DPB: compact binary frames, fixed width, so the final size is known
//!   exactly before the run starts.
//! - XYZ: verbose text frames; only an upper bound on the size is known.
//!
//! The size formulas drive the runner's progress estimate, and
//! [`publish::publish`] moves finished output to its final name.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub mod dpb;
pub mod publish;
pub mod xyz;

pub use dpb::{read_dpb, DpbWriter};
pub use publish::publish;
pub use xyz::{read_xyz, write_xyz_frame, XyzFrame};

/// Bytes before the first DPB frame (little-endian `u32` frame count).
pub const DPB_HEADER_BYTES: u64 = 4;
/// One signed byte per axis.
pub const DPB_BYTES_PER_ATOM: u64 = 3;
/// Upper bound on one XYZ atom line, newline included.
pub const XYZ_ATOM_LINE_BYTES: u64 = 32;
/// Upper bound on the atom-count and comment lines of one XYZ frame.
pub const XYZ_FRAME_HEADER_BYTES: u64 = 25;

/// Trajectory encoding. `Dpb` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrajectoryFormat {
    #[default]
    Dpb,
    Xyz,
}

impl TrajectoryFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TrajectoryFormat::Dpb => "dpb",
            TrajectoryFormat::Xyz => "xyz",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "dpb" => Some(TrajectoryFormat::Dpb),
            "xyz" => Some(TrajectoryFormat::Xyz),
            _ => None,
        }
    }

    /// Expected final size of a trajectory with `frames` frames of `atoms`
    /// atoms.
    ///
    /// Exact for DPB. For XYZ this is an upper bound: it may overestimate, so
    /// progress stays below 1.0 until the engine exits, but never
    /// underestimates.
    pub fn expected_size(self, frames: u32, atoms: usize) -> u64 {
        let frames = u64::from(frames);
        let atoms = atoms as u64;
        match self {
            TrajectoryFormat::Dpb => frames * atoms * DPB_BYTES_PER_ATOM + DPB_HEADER_BYTES,
            TrajectoryFormat::Xyz => frames * (atoms * XYZ_ATOM_LINE_BYTES + XYZ_FRAME_HEADER_BYTES),
        }
    }

    /// Bytes one frame adds to the file (upper bound for XYZ).
    pub fn frame_size(self, atoms: usize) -> u64 {
        self.expected_size(1, atoms) - self.expected_size(0, atoms)
    }
}

impl fmt::Display for TrajectoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TrajectoryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dpb" => Ok(TrajectoryFormat::Dpb),
            "xyz" => Ok(TrajectoryFormat::Xyz),
            other => Err(format!(
                "invalid trajectory format: {other} (expected \"dpb\" or \"xyz\")"
            )),
        }
    }
}

/// `min(1.0, current / expected)`. An expected size of zero counts as done.
pub fn progress_fraction(current: u64, expected: u64) -> f64 {
    if expected == 0 {
        return 1.0;
    }
    (current as f64 / expected as f64).min(1.0)
}

impl TrajectoryFormat {
    /// Progress of a trajectory of `current` bytes towards `frames` frames.
    pub fn progress(self, current: u64, frames: u32, atoms: usize) -> f64 {
        progress_fraction(current, self.expected_size(frames, atoms))
    }
}
