// src/exec/engine.rs

//! Engine drivers: how each external engine is invoked, where it writes,
//! and how its results are read back.
//!
//! The runner only talks to [`EngineDriver`], so the simulator and the two
//! quantum-chemistry flavours share one poll loop.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::EnginesSection;
use crate::jobs::metadata::{self, quote_arg, Metadata};
use crate::jobs::{JobPaths, JobSpec, QuantumParams, SimulationParams};
use crate::params::ParameterSet;
use crate::structure::{atomic_number, Energy, Position, StructureModel};
use crate::trajectory::TrajectoryFormat;
use crate::types::QuantumServer;

/// Simulator: number of frames.
pub const FLAG_FRAMES: &str = "-f";
/// Simulator: temperature in Kelvin.
pub const FLAG_TEMPERATURE: &str = "-t";
/// Simulator: integration steps per frame.
pub const FLAG_STEPS_PER_FRAME: &str = "-i";
/// Simulator: write XYZ text instead of DPB.
pub const FLAG_XYZ: &str = "-x";
/// Simulator and PC GAMESS: output file.
pub const FLAG_OUTPUT: &str = "-o";
/// PC GAMESS: input deck.
pub const FLAG_INPUT: &str = "-i";

/// Structural input the simulator reads, relative to the scratch dir.
pub const SIM_INPUT_FILE: &str = "simulate.mmp";
/// Binary trajectory while the simulator is still writing it.
pub const SIM_SCRATCH_OUTPUT: &str = "simulate.dpb";

/// A fully resolved engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// File that receives the engine's stdout.
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    /// Shell form, as stored in the metadata script.
    pub fn command_line(&self) -> String {
        let mut line = quote_arg(&self.program.to_string_lossy());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        if let Some(stdout) = &self.stdout {
            line.push_str(" > ");
            line.push_str(&quote_arg(&stdout.to_string_lossy()));
        }
        line
    }
}

/// Results read back from a completed job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobResult {
    pub energy: Option<Energy>,
    pub geometry: Option<Vec<Position>>,
}

pub trait EngineDriver: Send + Sync {
    fn paths(&self) -> &JobPaths;

    fn invocation(&self) -> Invocation;

    /// Where the engine writes while it runs.
    fn work_output(&self) -> PathBuf;

    /// Where the output lives once the job is Completed.
    fn final_output(&self) -> PathBuf;

    /// Whether `work_output` is a temporary that gets published.
    fn publishes(&self) -> bool {
        self.work_output() != self.final_output()
    }

    /// Write everything the engine reads.
    fn prepare_input(&self, model: &dyn StructureModel) -> Result<()>;

    /// Expected size of `work_output` at the end of the run, when known.
    fn expected_output_size(&self, model: &dyn StructureModel) -> Option<u64>;

    fn parse_result(&self, model: &dyn StructureModel) -> Result<JobResult>;

    /// Engine-specific metadata keys.
    fn describe(&self, meta: &mut Metadata);
}

/// Pick the driver for `spec`.
pub fn driver_for(
    spec: &JobSpec,
    engines: &EnginesSection,
    paths: JobPaths,
) -> Box<dyn EngineDriver> {
    match spec {
        JobSpec::Simulation(params) => Box::new(SimulatorDriver {
            executable: engines.simulator.executable.clone(),
            params: params.clone(),
            paths,
        }),
        JobSpec::Quantum(params) => Box::new(QuantumDriver {
            executable: engines.quantum.executable.clone(),
            params: params.clone(),
            paths,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorDriver {
    executable: PathBuf,
    params: SimulationParams,
    paths: JobPaths,
}

impl SimulatorDriver {
    pub fn new(executable: impl Into<PathBuf>, params: SimulationParams, paths: JobPaths) -> Self {
        Self {
            executable: executable.into(),
            params,
            paths,
        }
    }
}

impl EngineDriver for SimulatorDriver {
    fn paths(&self) -> &JobPaths {
        &self.paths
    }

    fn invocation(&self) -> Invocation {
        let p = &self.params;
        let mut args = vec![
            format!("{FLAG_FRAMES}{}", p.frames),
            format!("{FLAG_TEMPERATURE}{}", p.temperature),
            format!("{FLAG_STEPS_PER_FRAME}{}", p.steps_per_frame),
        ];
        if p.format == TrajectoryFormat::Xyz {
            args.push(FLAG_XYZ.to_string());
        }
        args.push(format!("{FLAG_OUTPUT}{}", self.work_output().display()));
        args.push(SIM_INPUT_FILE.to_string());
        Invocation {
            program: self.executable.clone(),
            args,
            stdout: None,
        }
    }

    // DPB goes through scratch and is published; XYZ is written in place.
    fn work_output(&self) -> PathBuf {
        match self.params.format {
            TrajectoryFormat::Dpb => self.paths.scratch().join(SIM_SCRATCH_OUTPUT),
            TrajectoryFormat::Xyz => self.final_output(),
        }
    }

    fn final_output(&self) -> PathBuf {
        self.params
            .output
            .clone()
            .unwrap_or_else(|| self.paths.file(self.params.format.extension()))
    }

    fn prepare_input(&self, model: &dyn StructureModel) -> Result<()> {
        let scratch = self.paths.scratch();
        fs::create_dir_all(&scratch).with_context(|| format!("creating {:?}", scratch))?;
        model.write_structural_input(&scratch.join(SIM_INPUT_FILE))
    }

    fn expected_output_size(&self, model: &dyn StructureModel) -> Option<u64> {
        Some(
            self.params
                .format
                .expected_size(self.params.frames, model.atom_count()),
        )
    }

    fn parse_result(&self, model: &dyn StructureModel) -> Result<JobResult> {
        let geometry = model.read_result_geometry(&self.final_output())?;
        Ok(JobResult {
            energy: None,
            geometry: Some(geometry),
        })
    }

    fn describe(&self, meta: &mut Metadata) {
        meta.set(metadata::KEY_FRAMES, self.params.frames);
        meta.set(metadata::KEY_TEMPERATURE, self.params.temperature);
        meta.set(metadata::KEY_STEPS_PER_FRAME, self.params.steps_per_frame);
        meta.set(metadata::KEY_FORMAT, self.params.format);
        meta.set(metadata::KEY_OUTPUT, self.final_output().display());
    }
}

#[derive(Debug, Clone)]
pub struct QuantumDriver {
    executable: PathBuf,
    params: QuantumParams,
    paths: JobPaths,
}

impl QuantumDriver {
    pub fn new(executable: impl Into<PathBuf>, params: QuantumParams, paths: JobPaths) -> Self {
        Self {
            executable: executable.into(),
            params,
            paths,
        }
    }

    fn input_deck(&self) -> PathBuf {
        self.paths.file("inp")
    }
}

impl EngineDriver for QuantumDriver {
    fn paths(&self) -> &JobPaths {
        &self.paths
    }

    fn invocation(&self) -> Invocation {
        let input = self.input_deck().display().to_string();
        let output = self.final_output();
        match self.params.server {
            QuantumServer::Gamess => Invocation {
                program: self.executable.clone(),
                args: vec![input],
                stdout: Some(output),
            },
            QuantumServer::PcGamess => Invocation {
                program: self.executable.clone(),
                args: vec![
                    FLAG_INPUT.to_string(),
                    input,
                    FLAG_OUTPUT.to_string(),
                    output.display().to_string(),
                ],
                stdout: None,
            },
        }
    }

    fn work_output(&self) -> PathBuf {
        self.final_output()
    }

    fn final_output(&self) -> PathBuf {
        self.paths.file("out")
    }

    fn prepare_input(&self, model: &dyn StructureModel) -> Result<()> {
        let deck = render_deck(&self.params.pset, self.params.server, model)?;
        let path = self.input_deck();
        fs::write(&path, deck).with_context(|| format!("writing {:?}", path))?;
        debug!(path = ?path, "input deck written");
        Ok(())
    }

    fn expected_output_size(&self, _model: &dyn StructureModel) -> Option<u64> {
        None
    }

    fn parse_result(&self, model: &dyn StructureModel) -> Result<JobResult> {
        let output = self.final_output();
        let energy = model.read_final_energy(&output)?;
        let geometry = if self.params.pset.calculation() == "Optimize" {
            Some(model.read_result_geometry(&output)?)
        } else {
            None
        };
        Ok(JobResult {
            energy: Some(energy),
            geometry,
        })
    }

    fn describe(&self, meta: &mut Metadata) {
        meta.set(metadata::KEY_OUTPUT, self.final_output().display());
    }
}

/// Input deck: derived parameter groups, then the `$DATA` block with the
/// structure.
pub fn render_deck(
    pset: &ParameterSet,
    server: QuantumServer,
    model: &dyn StructureModel,
) -> Result<String> {
    let mut pset = pset.clone();
    pset.derive_input_groups(server);

    let mut groups = Vec::new();
    pset.render_input(&mut groups)?;
    let mut deck = format!("! {} {}\n", server, pset.summary("/", server));
    deck.push_str(&String::from_utf8_lossy(&groups));

    deck.push_str(" $DATA\n");
    let _ = writeln!(deck, "{}", pset.summary("/", server));
    deck.push_str("C1\n");
    for atom in model.atoms() {
        let charge = atomic_number(&atom.symbol).unwrap_or(0);
        let [x, y, z] = atom.position;
        let _ = writeln!(
            deck,
            "{:<2} {:>5.1} {:>12.6} {:>12.6} {:>12.6}",
            atom.symbol, charge as f64, x, y, z
        );
    }
    deck.push_str(" $END\n");
    Ok(deck)
}
