#![cfg(unix)]

mod common;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::Mutex;

use common::*;
use simjob::errors::JobError;
use simjob::exec::{event_channel, CancelFlag, JobEvent, RunOutcome};
use simjob::jobs::{FailureReason, JobId, JobManager};
use simjob::params::ParameterSet;
use simjob::trajectory::TrajectoryFormat;
use simjob::types::{QuantumServer, Status};

// Scripts are written right before they are exec'd; running these tests one
// at a time keeps another test's fork from holding a script open for writing.
static SERIAL: Mutex<()> = Mutex::const_new(());

fn final_dpb(manager: &JobManager, id: JobId) -> PathBuf {
    manager.directory().job_dir(id).join(format!("sim-{id}.dpb"))
}

#[tokio::test]
async fn missing_executable_fails_the_job() {
    let _serial = SERIAL.lock().await;
    init_tracing();
    let tmp = tempdir().unwrap();
    let manager = real_manager(
        config_in(tmp.path())
            .with_simulator("/nonexistent/bin/simulator")
            .build(),
    );
    let job = manager.submit(MdRequestBuilder::new("water").build()).unwrap();
    let (tx, mut rx) = event_channel();

    let err = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap_err();

    match err {
        JobError::Spawn { executable, .. } => {
            assert_eq!(executable, PathBuf::from("/nonexistent/bin/simulator"))
        }
        other => panic!("expected spawn error, got {other:?}"),
    }
    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
    let reason = manager.store().failure_reason(job.id).unwrap().unwrap();
    assert!(
        reason.to_string().contains("/nonexistent/bin/simulator"),
        "{reason}"
    );

    let events = drain(&mut rx);
    assert_eq!(statuses(&events), vec![Status::Running, Status::Failed]);
}

#[tokio::test]
async fn dpb_run_publishes_trajectory() {
    let _serial = SERIAL.lock().await;
    init_tracing();
    let tmp = tempdir().unwrap();
    let engine = fake_engine::dpb_engine(tmp.path(), 6, 3, 0.05);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager
        .submit(MdRequestBuilder::new("water").frames(6).build())
        .unwrap();
    let (tx, mut rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(manager.status(job.id).unwrap(), Status::Completed);

    let published = final_dpb(&manager, job.id);
    let size = fs::metadata(&published).unwrap().len();
    assert_eq!(size, TrajectoryFormat::Dpb.expected_size(6, 3));
    assert_eq!(size, 6 * 3 * 3 + 4);
    let scratch = manager.directory().job_dir(job.id).join("scratch");
    assert!(!scratch.join("simulate.dpb").exists());
    assert!(scratch.join("simulate.mmp").is_file());

    let events = drain(&mut rx);
    assert_eq!(statuses(&events), vec![Status::Running, Status::Completed]);
    let fractions = progress(&events);
    assert_eq!(fractions.last(), Some(&1.0));
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
}

#[tokio::test]
async fn busy_indicator_brackets_the_run() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::dpb_engine(tmp.path(), 2, 3, 0.0);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager
        .submit(MdRequestBuilder::new("water").frames(2).build())
        .unwrap();
    let (tx, mut rx) = event_channel();

    with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&JobEvent::Busy(true)));
    assert_eq!(events.last(), Some(&JobEvent::Busy(false)));
    let busy_count = events
        .iter()
        .filter(|e| matches!(e, JobEvent::Busy(_)))
        .count();
    assert_eq!(busy_count, 2);
}

#[tokio::test]
async fn cancel_discards_partial_output() {
    let _serial = SERIAL.lock().await;
    init_tracing();
    let tmp = tempdir().unwrap();
    let engine = fake_engine::hanging_engine(tmp.path());
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager.submit(MdRequestBuilder::new("water").build()).unwrap();
    let (tx, mut rx) = event_channel();
    let cancel = CancelFlag::new();

    let trigger = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        }
    };
    let molecule = water();
    let (outcome, ()) = with_timeout(async {
        tokio::join!(manager.start(job.id, &molecule, tx, cancel.clone()), trigger)
    })
    .await;

    assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
    assert_eq!(
        manager.store().failure_reason(job.id).unwrap(),
        Some(FailureReason::Cancelled)
    );
    let record = manager.load(job.id).unwrap();
    assert!(record.failure.as_ref().is_some_and(FailureReason::is_cancelled));

    let scratch = manager.directory().job_dir(job.id).join("scratch");
    assert!(!scratch.join("simulate.dpb").exists());
    assert!(!final_dpb(&manager, job.id).exists());

    let events = drain(&mut rx);
    assert_eq!(statuses(&events), vec![Status::Running, Status::Failed]);
    assert_eq!(events.last(), Some(&JobEvent::Busy(false)));
}

#[tokio::test]
async fn non_zero_exit_reports_stderr_tail() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::failing_engine(
        tmp.path(),
        3,
        &["reading simulate.mmp", "bad bond", "", "giving up"],
    );
    let manager = real_manager(
        config_in(tmp.path())
            .with_simulator(engine)
            .with_stderr_tail_lines(2)
            .build(),
    );
    let job = manager.submit(MdRequestBuilder::new("water").build()).unwrap();
    let (tx, _rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();

    let RunOutcome::Failed(reason) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains("exited with code 3"), "{reason}");
    assert!(reason.ends_with("bad bond | giving up"), "{reason}");
    assert!(!reason.contains("reading simulate.mmp"), "{reason}");

    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
    assert_eq!(
        manager.store().failure_reason(job.id).unwrap(),
        Some(FailureReason::Error(reason))
    );
}

#[tokio::test]
async fn clean_exit_without_output_is_a_failure() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::silent_engine(tmp.path());
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager.submit(MdRequestBuilder::new("water").build()).unwrap();
    let (tx, _rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Failed(ref r) if r.contains("wrote no output")));
    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
}

#[tokio::test]
async fn xyz_output_is_written_in_place() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let text = "3\nframe 0\nO 0.0 0.0 0.1\nH 0.0 0.7 -0.4\nH 0.0 -0.7 -0.4";
    let engine = fake_engine::text_engine(tmp.path(), text);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let target = tmp.path().join("results").join("water.xyz");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    let job = manager
        .submit(
            MdRequestBuilder::new("water")
                .format(TrajectoryFormat::Xyz)
                .frames(1)
                .output(&target)
                .build(),
        )
        .unwrap();
    assert_eq!(job.output_path.as_deref(), Some(target.as_path()));
    let (tx, mut rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(fs::read_to_string(&target).unwrap().starts_with("3\nframe 0"));
    assert!(!manager.directory().job_dir(job.id).join("scratch").join("simulate.dpb").exists());
    assert_eq!(progress(&drain(&mut rx)).last(), Some(&1.0));

    let result = manager.parse_result(job.id, &water()).unwrap();
    let geometry = result.geometry.unwrap();
    assert_eq!(geometry.len(), 3);
    assert_eq!(geometry[1], [0.0, 0.7, -0.4]);
    assert!(result.energy.is_none());
}

#[tokio::test]
async fn second_start_is_refused_while_one_runs() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::dpb_engine(tmp.path(), 4, 3, 0.05);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let first = manager.submit(MdRequestBuilder::new("a").frames(4).build()).unwrap();
    let second = manager.submit(MdRequestBuilder::new("b").frames(4).build()).unwrap();
    let (tx, _rx) = event_channel();

    let molecule = water();
    let (a, b) = with_timeout(async {
        tokio::join!(
            manager.start(first.id, &molecule, tx.clone(), CancelFlag::new()),
            manager.start(second.id, &molecule, tx.clone(), CancelFlag::new()),
        )
    })
    .await;

    assert_eq!(a.unwrap(), RunOutcome::Completed);
    assert!(matches!(b, Err(JobError::JobBusy(ref id)) if *id == first.id.to_string()));
    assert_eq!(manager.status(second.id).unwrap(), Status::Queued);

    // The slot is free again once the first run is over.
    let again = with_timeout(manager.start(second.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();
    assert_eq!(again, RunOutcome::Completed);
}

#[tokio::test]
async fn stale_running_marker_blocks_start() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let manager = real_manager(
        config_in(tmp.path())
            .with_simulator("/nonexistent/bin/simulator")
            .build(),
    );
    let stuck = manager.submit(MdRequestBuilder::new("stuck").build()).unwrap();
    let job = manager.submit(MdRequestBuilder::new("next").build()).unwrap();
    manager.set_status(stuck.id, Status::Running).unwrap();
    let (tx, _rx) = event_channel();

    let err = manager
        .start(job.id, &water(), tx, CancelFlag::new())
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::JobBusy(ref id) if *id == stuck.id.to_string()));
    assert_eq!(manager.status(job.id).unwrap(), Status::Queued);
}

#[tokio::test]
async fn rerun_requeues_a_finished_job_and_records_time() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::dpb_engine(tmp.path(), 3, 3, 0.1);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager
        .submit(MdRequestBuilder::new("water").frames(3).build())
        .unwrap();
    assert_eq!(job.elapsed_secs, 0.0);

    for _ in 0..2 {
        let (tx, _rx) = event_channel();
        let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
    }

    let record = manager.load(job.id).unwrap();
    assert_eq!(record.status, Status::Completed);
    assert!(record.elapsed_secs > 0.0, "{}", record.elapsed_secs);
    assert_eq!(
        fs::metadata(final_dpb(&manager, job.id)).unwrap().len(),
        TrajectoryFormat::Dpb.expected_size(3, 3)
    );
}

#[tokio::test]
async fn gamess_log_goes_to_stdout_file() {
    let _serial = SERIAL.lock().await;
    init_tracing();
    let tmp = tempdir().unwrap();
    let engine = fake_engine::gamess_engine(tmp.path(), -76.0231);
    let manager = real_manager(
        config_in(tmp.path())
            .with_quantum(engine, QuantumServer::Gamess)
            .build(),
    );
    let job = manager
        .submit(quantum_request("water", QuantumServer::Gamess, ParameterSet::default()))
        .unwrap();
    let (tx, mut rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let dir = manager.directory().job_dir(job.id);
    let deck = fs::read_to_string(dir.join(format!("gms-{}.inp", job.id))).unwrap();
    assert!(deck.contains(" $DATA"));
    assert!(deck.contains("O    8.0"), "{deck}");
    assert!(fs::read_to_string(dir.join(format!("gms-{}.out", job.id)))
        .unwrap()
        .contains("FINAL RHF ENERGY IS"));

    // No size estimate for quantum runs until the end.
    let fractions: Vec<Option<f64>> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            JobEvent::Progress { fraction, .. } => Some(fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions.last(), Some(&Some(1.0)));
    assert!(fractions[..fractions.len() - 1].iter().all(Option::is_none));

    let result = manager.parse_result(job.id, &water()).unwrap();
    let energy = result.energy.unwrap();
    assert!((energy.value + 76.0231).abs() < 1e-9);
    assert_eq!(energy.unit, "Hartree");
    assert!(result.geometry.is_none());
}

#[tokio::test]
async fn results_need_a_completed_job() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let manager = real_manager(config_in(tmp.path()).build());
    let job = manager.submit(MdRequestBuilder::new("water").build()).unwrap();

    let err = manager.parse_result(job.id, &water()).unwrap_err();
    assert!(matches!(err, JobError::Parse { .. }));
}

#[tokio::test]
async fn half_written_dpb_reports_half_progress() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::stalled_dpb_engine(tmp.path(), 10, 5, 5);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager
        .submit(MdRequestBuilder::new("chain").frames(10).build())
        .unwrap();
    let chain = hydrogen_chain(5);
    let (tx, mut rx) = event_channel();
    let cancel = CancelFlag::new();

    let expected = TrajectoryFormat::Dpb.expected_size(10, 5) as f64;
    let tolerance = TrajectoryFormat::Dpb.frame_size(5) as f64 / expected;
    let watcher = {
        let cancel = cancel.clone();
        async move {
            let mut seen = Vec::new();
            for _ in 0..60 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                seen.extend(progress(&drain(&mut rx)));
                if seen.last().is_some_and(|p| (p - 0.5).abs() <= tolerance) {
                    break;
                }
            }
            cancel.cancel();
            seen
        }
    };
    let (outcome, seen) = with_timeout(async {
        tokio::join!(manager.start(job.id, &chain, tx, cancel.clone()), watcher)
    })
    .await;

    assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
    let last = *seen.last().unwrap();
    assert!((last - 0.5).abs() <= tolerance, "{seen:?}");
    assert!(seen.iter().all(|p| *p < 1.0), "{seen:?}");
    assert_eq!(last, (4 + 5 * 5 * 3) as f64 / expected);
}

#[tokio::test]
async fn xyz_progress_stays_below_one_until_exit() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::xyz_engine(tmp.path(), 4, 3, 0.1);
    let manager = real_manager(config_in(tmp.path()).with_simulator(engine).build());
    let job = manager
        .submit(
            MdRequestBuilder::new("water")
                .format(TrajectoryFormat::Xyz)
                .frames(4)
                .build(),
        )
        .unwrap();
    let (tx, mut rx) = event_channel();

    let outcome = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let events = drain(&mut rx);
    let fractions = progress(&events);
    let (last, running) = fractions.split_last().unwrap();
    assert_eq!(*last, 1.0);
    assert!(running.iter().all(|p| *p < 1.0), "{fractions:?}");
    assert!(running.iter().any(|p| *p > 0.0), "{fractions:?}");
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");

    // 1.0 only arrives together with the Completed marker.
    let done = events
        .iter()
        .position(|e| *e == JobEvent::Progress { job: job.id, fraction: Some(1.0) })
        .unwrap();
    assert_eq!(
        events[done + 1],
        JobEvent::Status {
            job: job.id,
            status: Status::Completed
        }
    );
}

#[tokio::test]
async fn filesystem_error_mid_run_marks_the_job_failed() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let manager = real_manager(
        config_in(tmp.path())
            .with_simulator("/nonexistent/bin/simulator")
            .build(),
    );
    // A directory where the trajectory should go cannot be cleared away.
    let target = tmp.path().join("blocked.xyz");
    fs::create_dir_all(target.join("inner")).unwrap();
    let job = manager
        .submit(
            MdRequestBuilder::new("blocked")
                .format(TrajectoryFormat::Xyz)
                .output(&target)
                .build(),
        )
        .unwrap();
    let (tx, mut rx) = event_channel();

    let err = with_timeout(manager.start(job.id, &water(), tx.clone(), CancelFlag::new()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("removing"), "{err}");
    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
    let reason = manager.store().failure_reason(job.id).unwrap().unwrap();
    assert!(reason.to_string().contains("removing"), "{reason}");
    assert_eq!(statuses(&drain(&mut rx)), vec![Status::Running, Status::Failed]);

    // Nothing is left Running, so the root stays usable.
    let next = manager.submit(MdRequestBuilder::new("next").build()).unwrap();
    let err = with_timeout(manager.start(next.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Spawn { .. }), "{err:?}");
    manager.delete(job.id).unwrap();
    assert!(!manager.directory().job_dir(job.id).exists());
}

#[tokio::test]
async fn unwritable_engine_log_is_not_a_launch_failure() {
    let _serial = SERIAL.lock().await;
    let tmp = tempdir().unwrap();
    let engine = fake_engine::gamess_engine(tmp.path(), -76.0231);
    let manager = real_manager(
        config_in(tmp.path())
            .with_quantum(engine, QuantumServer::Gamess)
            .build(),
    );
    let job = manager
        .submit(quantum_request("water", QuantumServer::Gamess, ParameterSet::default()))
        .unwrap();
    let log = manager
        .directory()
        .job_dir(job.id)
        .join(format!("gms-{}.out", job.id));
    std::os::unix::fs::symlink(tmp.path().join("missing").join("dir").join("x.out"), &log)
        .unwrap();
    let (tx, _rx) = event_channel();

    let err = with_timeout(manager.start(job.id, &water(), tx, CancelFlag::new()))
        .await
        .unwrap_err();

    let JobError::RuntimeFailure { job: failed, reason } = err else {
        panic!("expected runtime failure, got {err:?}");
    };
    assert_eq!(failed, job.id);
    assert!(reason.contains("cannot create engine output"), "{reason}");
    assert!(!reason.contains("cannot launch"), "{reason}");
    assert_eq!(manager.status(job.id).unwrap(), Status::Failed);
    assert_eq!(
        manager.store().failure_reason(job.id).unwrap(),
        Some(FailureReason::Error(reason))
    );
}
