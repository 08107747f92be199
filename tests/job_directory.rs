mod common;
use crate::common::{init_tracing, mock_manager, MdRequestBuilder};

use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use simjob::errors::JobError;
use simjob::fs::mock::MockFileSystem;
use simjob::fs::{FileSystem, RealFileSystem};
use simjob::jobs::prefs;
use simjob::jobs::{JobDirectory, JobId};
use simjob::types::{Engine, IdPersistence, Status};

const JOBS: &str = "/sim/JobManager";

fn directory(fs: &MockFileSystem, mode: IdPersistence) -> JobDirectory {
    JobDirectory::new(Arc::new(fs.clone()), JOBS, 100, mode)
}

#[test]
fn first_allocations_are_100_then_101() {
    init_tracing();
    let fs = MockFileSystem::new();
    let dir = directory(&fs, IdPersistence::Base);

    let (first, first_dir) = dir.allocate().unwrap();
    let (second, _) = dir.allocate().unwrap();

    assert_eq!(first, JobId(100));
    assert_eq!(second, JobId(101));
    assert_eq!(first_dir, Path::new(JOBS).join("100"));
    assert_eq!(dir.store().get_status(first).unwrap(), Status::Queued);
    assert!(fs.is_file(&first_dir.join("Status-Queued")));
}

#[test]
fn base_persistence_writes_back_the_id_read() {
    let fs = MockFileSystem::new();
    let dir = directory(&fs, IdPersistence::Base);
    dir.allocate().unwrap();
    dir.allocate().unwrap();
    assert_eq!(prefs::load(&fs, Path::new(JOBS)).job_id, Some(100));
}

#[test]
fn allocated_persistence_writes_back_the_new_id() {
    let fs = MockFileSystem::new();
    let dir = directory(&fs, IdPersistence::Allocated);
    dir.allocate().unwrap();
    dir.allocate().unwrap();
    assert_eq!(prefs::load(&fs, Path::new(JOBS)).job_id, Some(101));
}

#[test]
fn allocation_starts_from_preferences_and_skips_taken_ids() {
    let fs = MockFileSystem::new();
    fs.add_file(Path::new(JOBS).join("preferences.toml"), "job_id = 500\n");
    fs.add_dir(Path::new(JOBS).join("500"));
    fs.add_dir(Path::new(JOBS).join("501"));

    let (id, _) = directory(&fs, IdPersistence::Base).allocate().unwrap();
    assert_eq!(id, JobId(502));
}

#[test]
fn failed_allocation_leaves_no_directory_behind() {
    let tmp = tempdir().unwrap();
    let jobs = tmp.path().join("JobManager");
    let dir = JobDirectory::new(Arc::new(RealFileSystem), &jobs, 100, IdPersistence::Base);
    // A directory in place of the preferences file makes saving it fail.
    let blocker = jobs.join("preferences.toml");
    std::fs::create_dir_all(&blocker).unwrap();

    assert!(dir.allocate().is_err());
    assert!(!jobs.join("100").exists());

    std::fs::remove_dir(&blocker).unwrap();
    let (id, path) = dir.allocate().unwrap();
    assert_eq!(id, JobId(100));
    assert!(path.join("Status-Queued").is_file());
}

#[test]
fn list_parses_metadata_and_sorts_by_id() {
    init_tracing();
    let (manager, fs) = mock_manager();
    manager
        .submit(MdRequestBuilder::new("beta").description("second").build())
        .unwrap();
    manager
        .submit(MdRequestBuilder::new("alpha").frames(12).build())
        .unwrap();
    // A directory without a metadata script is not a job.
    fs.add_dir(Path::new(JOBS).join("050"));

    let jobs = manager.list();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, JobId(100));
    assert_eq!(jobs[0].name, "beta");
    assert_eq!(jobs[0].description, "second");
    assert_eq!(jobs[1].name, "alpha");
    assert_eq!(jobs[1].description, "12 frames at 300 K");
    for job in &jobs {
        assert_eq!(job.engine, Engine::MdSimulator);
        assert_eq!(job.calculation, "Simulate");
        assert_eq!(job.server_id, "simulator");
        assert_eq!(job.status, Status::Queued);
        assert_eq!(job.elapsed_secs, 0.0);
        assert!(job.failure.is_none());
    }
    assert_eq!(
        jobs[0].output_path.as_deref(),
        Some(Path::new("/sim/JobManager/100/sim-100.dpb"))
    );
}

#[test]
fn hand_written_rem_script_is_listed() {
    let fs = MockFileSystem::new();
    let job = Path::new(JOBS).join("7");
    fs.add_file(job.join("Status-Completed"), "");
    fs.add_file(
        job.join("legacy.bat"),
        "REM Job Parameters\r\nREM Name: old\r\nREM Engine: PC GAMESS\r\n\
         REM Calculation: Energy\r\nREM Time: 12.5\r\n\
         pcgamess -i legacy.inp -o C:\\jobs\\legacy.out\r\n",
    );

    let jobs = directory(&fs, IdPersistence::Base).list();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.id, JobId(7));
    assert_eq!(job.engine, Engine::QuantumChem);
    assert_eq!(job.status, Status::Completed);
    assert_eq!(job.elapsed_secs, 12.5);
    assert_eq!(
        job.output_path.as_deref(),
        Some(Path::new("C:\\jobs\\legacy.out"))
    );
}

#[test]
fn unreadable_root_lists_nothing() {
    let fs = MockFileSystem::new();
    assert!(directory(&fs, IdPersistence::Base).list().is_empty());
}

#[test]
fn delete_refuses_running_jobs() {
    let (manager, fs) = mock_manager();
    let job = manager.submit(MdRequestBuilder::new("busy").build()).unwrap();
    manager.set_status(job.id, Status::Running).unwrap();

    assert!(matches!(manager.delete(job.id), Err(JobError::JobBusy(_))));
    assert!(fs.is_dir(&Path::new(JOBS).join("100")));

    manager.set_status(job.id, Status::Failed).unwrap();
    manager.delete(job.id).unwrap();
    assert!(!fs.exists(&Path::new(JOBS).join("100")));
    assert!(matches!(
        manager.delete(job.id),
        Err(JobError::JobNotFound(JobId(100)))
    ));
}
