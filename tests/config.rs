use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

use simjob::config::{load_and_validate, load_from_path, load_or_default, ConfigFile, RawConfigFile};
use simjob::errors::JobError;
use simjob::trajectory::TrajectoryFormat;
use simjob::types::{IdPersistence, QuantumServer};

#[test]
fn full_file_is_parsed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("simjob.toml");
    fs::write(
        &path,
        r#"
[jobs]
root = "/data/sim"
first_job_id = 7
id_persistence = "allocated"

[runner]
poll_interval_ms = 100
kill_grace_ms = 50
stderr_tail_lines = 3

[engines.simulator]
executable = "/opt/sim/bin/simulator"
frames = 120
temperature = 400
steps_per_frame = 5
format = "xyz"

[engines.quantum]
executable = "/opt/gamess/rungms"
server = "pc-gamess"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.jobs.first_job_id, 7);
    assert_eq!(cfg.jobs.id_persistence, IdPersistence::Allocated);
    assert_eq!(cfg.runner.poll_interval(), Duration::from_millis(100));
    assert_eq!(cfg.runner.kill_grace(), Duration::from_millis(50));
    assert_eq!(cfg.runner.stderr_tail_lines, 3);
    assert_eq!(cfg.engines.simulator.frames, 120);
    assert_eq!(cfg.engines.simulator.temperature, 400);
    assert_eq!(cfg.engines.simulator.format, TrajectoryFormat::Xyz);
    assert_eq!(cfg.engines.quantum.server, QuantumServer::PcGamess);
    assert_eq!(
        cfg.engines.quantum.executable,
        PathBuf::from("/opt/gamess/rungms")
    );
}

#[test]
fn empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("simjob.toml");
    fs::write(&path, "").unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.jobs.first_job_id, 100);
    assert_eq!(cfg.jobs.id_persistence, IdPersistence::Base);
    assert_eq!(cfg.runner.poll_interval(), Duration::from_millis(250));
    assert_eq!(cfg.runner.stderr_tail_lines, 5);
    assert_eq!(cfg.engines.simulator.frames, 900);
    assert_eq!(cfg.engines.simulator.format, TrajectoryFormat::Dpb);
    assert_eq!(cfg.engines.quantum.server, QuantumServer::Gamess);
}

#[test]
fn missing_file_is_an_io_error_unless_defaults_are_allowed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(load_from_path(&path), Err(JobError::IoError(_))));
    let cfg = load_or_default(&path).unwrap();
    assert_eq!(cfg.engines.simulator.executable, PathBuf::from("simulator"));
}

#[test]
fn broken_toml_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("simjob.toml");
    fs::write(&path, "[runner\npoll_interval_ms = 1").unwrap();

    assert!(matches!(load_or_default(&path), Err(JobError::TomlError(_))));
}

#[test]
fn unknown_enum_values_are_rejected() {
    let parsed: Result<RawConfigFile, _> = toml::from_str("[engines.simulator]\nformat = \"pdb\"\n");
    assert!(parsed.is_err());
    let parsed: Result<RawConfigFile, _> = toml::from_str("[jobs]\nid_persistence = \"latest\"\n");
    assert!(parsed.is_err());
}

fn validate(text: &str) -> Result<ConfigFile, JobError> {
    let raw: RawConfigFile = toml::from_str(text).unwrap();
    ConfigFile::try_from(raw)
}

#[test]
fn zero_poll_interval_is_rejected() {
    let err = validate("[runner]\npoll_interval_ms = 0\n").unwrap_err();
    assert!(matches!(err, JobError::ConfigError(ref msg) if msg.contains("poll_interval_ms")));
}

#[test]
fn zero_frames_is_rejected() {
    let err = validate("[engines.simulator]\nframes = 0\n").unwrap_err();
    assert!(matches!(err, JobError::ConfigError(ref msg) if msg.contains("frames")));
}

#[test]
fn empty_paths_are_rejected() {
    assert!(validate("[jobs]\nroot = \"\"\n").is_err());
    assert!(validate("[engines.quantum]\nexecutable = \"\"\n").is_err());
}

#[test]
fn root_override_wins() {
    let cfg = validate("[jobs]\nroot = \"/a\"\n").unwrap().with_root("/b");
    assert_eq!(cfg.root(), PathBuf::from("/b"));
}
