// src/types.rs

//! Small shared enums: job status, engine kind, quantum server flavour and
//! the job-id persistence policy.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::JobError;

/// Lifecycle state of a job, as encoded by its status marker file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Queued,
    Running,
    Completed,
    Suspended,
    Failed,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Queued,
        Status::Running,
        Status::Completed,
        Status::Suspended,
        Status::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Queued => "Queued",
            Status::Running => "Running",
            Status::Completed => "Completed",
            Status::Suspended => "Suspended",
            Status::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle state machine.
    ///
    /// - `Queued -> Running -> {Completed, Failed}`
    /// - `Running <-> Suspended`
    /// - `Queued` is re-enterable from `Queued` and from any terminal state.
    /// - Re-setting the current state is always allowed.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        if self == next {
            return true;
        }
        match (self, next) {
            (Queued, Running) => true,
            (Running, Completed | Failed | Suspended) => true,
            (Suspended, Running | Failed) => true,
            (Completed | Failed, Queued) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| JobError::InvalidStatus(s.to_string()))
    }
}

/// Which external engine a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    MdSimulator,
    QuantumChem,
}

impl Engine {
    /// Value written to the `Engine:` metadata line.
    pub fn label(self) -> &'static str {
        match self {
            Engine::MdSimulator => "nanoSIM-1",
            Engine::QuantumChem => "GAMESS",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "nanoSIM-1" | "Simulator" | "simulator" => Ok(Engine::MdSimulator),
            "GAMESS" | "PC GAMESS" | "gamess" => Ok(Engine::QuantumChem),
            other => Err(format!("unknown engine: {other}")),
        }
    }
}

/// Flavour of quantum-chemistry executable. Several parameter keywords
/// differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuantumServer {
    #[default]
    Gamess,
    PcGamess,
}

impl QuantumServer {
    pub fn label(self) -> &'static str {
        match self {
            QuantumServer::Gamess => "GAMESS",
            QuantumServer::PcGamess => "PC GAMESS",
        }
    }
}

impl fmt::Display for QuantumServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuantumServer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gamess" => Ok(QuantumServer::Gamess),
            "pc gamess" | "pc-gamess" => Ok(QuantumServer::PcGamess),
            other => Err(format!(
                "invalid quantum server: {other} (expected \"gamess\" or \"pc-gamess\")"
            )),
        }
    }
}

/// Which job id is written back to the preferences file after allocation.
///
/// Historically the id that was *read* is written back, not the one that was
/// allocated, so every allocation re-scans from the same base. Job numbering
/// in existing roots depends on that, so it stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdPersistence {
    #[default]
    Base,
    Allocated,
}
