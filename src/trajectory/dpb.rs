// src/trajectory/dpb.rs

//! DPB ("data part binary") trajectory codec.
//!
//! Layout: `u32` little-endian frame count, then one record per frame of
//! `atoms * 3` signed bytes. Each byte is the per-axis displacement since the
//! previous frame in units of 0.01 Angstrom; the starting geometry is the
//! structure the simulation was launched from.

use std::io::{self, Read, Write};

use crate::structure::Position;

/// Angstrom per DPB delta unit.
pub const DPB_UNIT: f64 = 0.01;

/// Streaming DPB encoder.
///
/// Positions are quantized against the previously *encoded* frame, so
/// rounding error does not accumulate across frames. Displacements larger
/// than one byte can hold are clamped.
pub struct DpbWriter<W: Write> {
    out: W,
    quantized: Vec<[i64; 3]>,
}

impl<W: Write> DpbWriter<W> {
    /// Write the header and remember the starting geometry.
    pub fn new(mut out: W, frames: u32, initial: &[Position]) -> io::Result<Self> {
        out.write_all(&frames.to_le_bytes())?;
        let quantized = initial.iter().map(quantize).collect();
        Ok(Self { out, quantized })
    }

    pub fn write_frame(&mut self, positions: &[Position]) -> io::Result<()> {
        if positions.len() != self.quantized.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame has {} atoms, trajectory has {}",
                    positions.len(),
                    self.quantized.len()
                ),
            ));
        }
        let mut record = Vec::with_capacity(positions.len() * 3);
        for (prev, pos) in self.quantized.iter_mut().zip(positions) {
            let target = quantize(pos);
            for axis in 0..3 {
                let delta = (target[axis] - prev[axis]).clamp(i8::MIN as i64, i8::MAX as i64);
                prev[axis] += delta;
                record.push(delta as i8 as u8);
            }
        }
        self.out.write_all(&record)
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn quantize(p: &Position) -> [i64; 3] {
    [
        (p[0] / DPB_UNIT).round() as i64,
        (p[1] / DPB_UNIT).round() as i64,
        (p[2] / DPB_UNIT).round() as i64,
    ]
}

/// Decode a DPB stream into absolute positions per frame.
///
/// Returns `(declared_frames, frames)`. A trailing partial frame (a run that
/// was cut short) is ignored rather than treated as an error.
pub fn read_dpb<R: Read>(mut input: R, initial: &[Position]) -> io::Result<(u32, Vec<Vec<Position>>)> {
    let mut header = [0u8; 4];
    input.read_exact(&mut header)?;
    let declared = u32::from_le_bytes(header);

    let mut body = Vec::new();
    input.read_to_end(&mut body)?;

    let record_len = initial.len() * 3;
    let mut frames = Vec::new();
    if record_len == 0 {
        return Ok((declared, frames));
    }

    let mut current: Vec<[i64; 3]> = initial.iter().map(quantize).collect();
    for record in body.chunks_exact(record_len).take(declared as usize) {
        for (atom, delta) in current.iter_mut().zip(record.chunks_exact(3)) {
            for axis in 0..3 {
                atom[axis] += i64::from(delta[axis] as i8);
            }
        }
        frames.push(
            current
                .iter()
                .map(|q| {
                    [
                        q[0] as f64 * DPB_UNIT,
                        q[1] as f64 * DPB_UNIT,
                        q[2] as f64 * DPB_UNIT,
                    ]
                })
                .collect(),
        );
    }
    Ok((declared, frames))
}
