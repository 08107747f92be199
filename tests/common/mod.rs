#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use simjob::config::ConfigFile;
use simjob::exec::{EventReceiver, JobEvent};
use simjob::fs::mock::MockFileSystem;
use simjob::fs::RealFileSystem;
use simjob::jobs::{JobId, JobManager, StatusObserver};
use simjob::types::Status;

pub use simjob_test_utils::builders::{
    hydrogen_chain, quantum_request, water, ConfigFileBuilder, MdRequestBuilder,
};
pub use simjob_test_utils::{fake_engine, init_tracing, with_timeout};

/// Manager over an in-memory filesystem rooted at `/sim`.
pub fn mock_manager() -> (JobManager, MockFileSystem) {
    let fs = MockFileSystem::new();
    let config = ConfigFileBuilder::new("/sim").build();
    (JobManager::new(config, Arc::new(fs.clone())), fs)
}

/// Manager over the real filesystem.
pub fn real_manager(config: ConfigFile) -> JobManager {
    JobManager::new(config, Arc::new(RealFileSystem))
}

pub fn config_in(root: &Path) -> ConfigFileBuilder {
    ConfigFileBuilder::new(root)
}

/// Everything received so far.
pub fn drain(rx: &mut EventReceiver) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn statuses(events: &[JobEvent]) -> Vec<Status> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Status { status, .. } => Some(*status),
            _ => None,
        })
        .collect()
}

pub fn progress(events: &[JobEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress { fraction, .. } => *fraction,
            _ => None,
        })
        .collect()
}

/// Observer that records every notification.
#[derive(Default)]
pub struct RecordingObserver {
    pub seen: Mutex<Vec<(JobId, Status)>>,
}

impl StatusObserver for RecordingObserver {
    fn status_changed(&self, job: JobId, status: Status) {
        self.seen.lock().unwrap().push((job, status));
    }
}
