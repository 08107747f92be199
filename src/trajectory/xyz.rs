// src/trajectory/xyz.rs

//! XYZ text trajectories: per frame an atom-count line, a comment line and
//! one `Sym x y z` line per atom.
//!
//! Lines written here stay within [`super::XYZ_ATOM_LINE_BYTES`] and
//! [`super::XYZ_FRAME_HEADER_BYTES`] for coordinates below 1000 Angstrom and
//! fewer than a million atoms.

use std::io::{self, Write};

use crate::structure::{Atom, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct XyzFrame {
    pub comment: String,
    pub atoms: Vec<Atom>,
}

impl XyzFrame {
    pub fn positions(&self) -> Vec<Position> {
        self.atoms.iter().map(|a| a.position).collect()
    }
}

pub fn write_xyz_frame<W: Write>(out: &mut W, index: usize, atoms: &[Atom]) -> io::Result<()> {
    writeln!(out, "{}", atoms.len())?;
    writeln!(out, "frame {}", index)?;
    for atom in atoms {
        writeln!(
            out,
            "{:<2} {:>8.3} {:>8.3} {:>8.3}",
            atom.symbol, atom.position[0], atom.position[1], atom.position[2]
        )?;
    }
    Ok(())
}

/// Parse every complete frame in `text`.
///
/// A frame cut off mid-way (engine still writing, or killed) ends the parse
/// without error. A malformed line inside a complete frame is an error.
pub fn read_xyz(text: &str) -> Result<Vec<XyzFrame>, String> {
    let mut frames = Vec::new();
    let mut lines = text.lines().enumerate().peekable();

    while let Some((lineno, count_line)) = lines.next() {
        if count_line.trim().is_empty() {
            continue;
        }
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| format!("line {}: expected atom count, got {:?}", lineno + 1, count_line))?;

        let Some((_, comment)) = lines.next() else {
            break;
        };

        let mut atoms = Vec::with_capacity(count);
        for _ in 0..count {
            let Some((n, line)) = lines.next() else {
                return Ok(frames);
            };
            atoms.push(parse_atom_line(line).map_err(|e| format!("line {}: {e}", n + 1))?);
        }
        frames.push(XyzFrame {
            comment: comment.trim().to_string(),
            atoms,
        });
    }

    Ok(frames)
}

pub(crate) fn parse_atom_line(line: &str) -> Result<Atom, String> {
    let mut fields = line.split_whitespace();
    let symbol = fields
        .next()
        .ok_or_else(|| "empty atom line".to_string())?
        .to_string();
    let mut position = [0.0; 3];
    for (axis, slot) in position.iter_mut().enumerate() {
        let field = fields
            .next()
            .ok_or_else(|| format!("missing coordinate {axis} for {symbol}"))?;
        *slot = field
            .parse()
            .map_err(|_| format!("bad coordinate {field:?} for {symbol}"))?;
    }
    Ok(Atom { symbol, position })
}
