use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use simjob::fs::FileSystem;
use simjob::fs::mock::MockFileSystem;
use simjob::jobs::{JobId, StatusStore};
use simjob::types::Status;

const JOBS: &str = "/sim/JobManager";

fn any_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

proptest! {
    #[test]
    fn last_write_wins_with_one_marker(writes in prop::collection::vec(any_status(), 1..12)) {
        let fs = MockFileSystem::new();
        fs.add_dir(Path::new(JOBS).join("100"));
        let store = StatusStore::new(Arc::new(fs.clone()), JOBS);
        let id = JobId(100);

        for status in &writes {
            store.force_status(id, *status).unwrap();
        }

        let last = *writes.last().unwrap();
        prop_assert_eq!(store.get_status(id).unwrap(), last);
        let markers = fs
            .read_dir(&Path::new(JOBS).join("100"))
            .unwrap()
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|n| n.to_string_lossy().starts_with("Status-")))
            .count();
        prop_assert_eq!(markers, 1);
    }
}
