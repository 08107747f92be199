// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod jobs;
pub mod logging;
pub mod params;
pub mod structure;
pub mod trajectory;
pub mod types;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{CliArgs, Command, NewJob};
use crate::config::load_or_default;
use crate::errors::JobError;
use crate::exec::{event_channel, CancelFlag, JobEvent, RunOutcome};
use crate::fs::RealFileSystem;
use crate::jobs::{JobId, JobManager, JobRecord, JobRequest, JobSpec, QuantumParams};
use crate::params::{ParamValue, ParameterSet};
use crate::structure::{StructureModel, XyzStructure};
use crate::types::Status;

/// High-level entry point used by `main.rs`.
///
/// Loads the config (defaults when the file is missing), builds the
/// [`JobManager`] on the real filesystem and dispatches the subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config))?;
    if let Some(root) = &args.root {
        cfg = cfg.with_root(root);
    }
    debug!(root = ?cfg.root(), "using job root");

    let manager = JobManager::new(cfg, Arc::new(RealFileSystem));

    match args.command {
        Command::New { kind } => {
            let request = build_request(&manager, kind)?;
            let record = manager.submit(request)?;
            println!("{}", record.id);
        }
        Command::List => print_jobs(&manager.list()),
        Command::Status { id } => {
            let record = manager.load(JobId(id))?;
            match &record.failure {
                Some(reason) => println!("{} ({reason})", record.status),
                None => println!("{}", record.status),
            }
        }
        Command::SetStatus { id, status, force } => {
            let id = JobId(id);
            let status: Status = status.parse()?;
            if force {
                manager.store().force_status(id, status)?;
            } else {
                manager.set_status(id, status)?;
            }
        }
        Command::Run { id, structure } => run_job(&manager, JobId(id), &structure).await?,
        Command::Result { id, structure } => {
            let model = XyzStructure::load(&structure)?;
            let result = manager.parse_result(JobId(id), &model)?;
            if let Some(energy) = &result.energy {
                println!("energy: {energy}");
            }
            if let Some(geometry) = &result.geometry {
                for (atom, [x, y, z]) in model.atoms().iter().zip(geometry) {
                    println!("{:<2} {x:>12.6} {y:>12.6} {z:>12.6}", atom.symbol);
                }
            }
        }
        Command::Delete { id } => manager.delete(JobId(id))?,
    }
    Ok(())
}

fn build_request(manager: &JobManager, kind: NewJob) -> Result<JobRequest> {
    match kind {
        NewJob::Md {
            name,
            description,
            frames,
            temperature,
            steps_per_frame,
            format,
            output,
        } => {
            let mut params = manager.simulation_defaults();
            params.frames = frames.unwrap_or(params.frames);
            params.temperature = temperature.unwrap_or(params.temperature);
            params.steps_per_frame = steps_per_frame.unwrap_or(params.steps_per_frame);
            params.format = format.unwrap_or(params.format);
            params.output = output;
            Ok(JobRequest {
                name,
                description,
                spec: JobSpec::Simulation(params),
            })
        }
        NewJob::Quantum {
            name,
            description,
            server,
            optimize,
            method,
            basis,
            charge,
            multiplicity,
            params,
        } => {
            let mut pset = ParameterSet::default();
            pset.set_ui("runtyp", ParamValue::Int(i64::from(optimize)))?;
            pset.set_ui("ecm", ParamValue::Int(method.ecm_index()))?;
            if let Some(basis) = basis {
                pset.set_basis(&basis)?;
            }
            pset.set_ui("icharg", ParamValue::Int(charge))?;
            pset.set_ui("mult", ParamValue::Int(multiplicity.max(1) - 1))?;
            for param in &params {
                let (key, value) = param
                    .split_once('=')
                    .ok_or_else(|| JobError::Parameter(format!("expected NAME=VALUE, got {param:?}")))?;
                if !pset.set_item(key.trim(), value, true)? {
                    return Err(JobError::Parameter(format!("bad value for {key}: {value:?}")).into());
                }
            }
            let server = server.unwrap_or(manager.config().engines.quantum.server);
            Ok(JobRequest {
                name,
                description,
                spec: JobSpec::Quantum(QuantumParams { server, pset }),
            })
        }
    }
}

async fn run_job(manager: &JobManager, id: JobId, structure: &std::path::Path) -> Result<()> {
    let model = XyzStructure::load(structure)?;
    let (tx, mut rx) = event_channel();
    let cancel = CancelFlag::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let printer = tokio::spawn(async move {
        let mut last_percent = None;
        while let Some(event) = rx.recv().await {
            match event {
                JobEvent::Status { job, status } => println!("job {job}: {status}"),
                JobEvent::Progress { fraction: Some(f), .. } => {
                    let percent = (f * 100.0).floor() as u32;
                    if last_percent != Some(percent) {
                        last_percent = Some(percent);
                        print!("\rprogress {percent:>3}%");
                        let _ = std::io::stdout().flush();
                        if percent == 100 {
                            println!();
                        }
                    }
                }
                JobEvent::Progress { fraction: None, .. } | JobEvent::Busy(_) => {}
            }
        }
    });

    let outcome = manager.start(id, &model, tx, cancel).await;
    let _ = printer.await;

    match outcome? {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Cancelled => {
            println!("job {id} cancelled");
            Ok(())
        }
        RunOutcome::Failed(reason) => Err(JobError::RuntimeFailure { job: id, reason }.into()),
    }
}

fn print_jobs(records: &[JobRecord]) {
    println!(
        "{:<6} {:<16} {:<10} {:<10} {:<10} {:>8}  {}",
        "ID", "NAME", "ENGINE", "CALC", "STATUS", "TIME", "DESCRIPTION"
    );
    for r in records {
        println!(
            "{:<6} {:<16} {:<10} {:<10} {:<10} {:>8.1}  {}",
            r.id.to_string(),
            r.name,
            r.engine.to_string(),
            r.calculation,
            r.status.to_string(),
            r.elapsed_secs,
            r.description
        );
    }
}
