use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use simjob::fs::mock::MockFileSystem;
use simjob::jobs::JobDirectory;
use simjob::types::IdPersistence;

const JOBS: &str = "/sim/JobManager";

proptest! {
    #[test]
    fn allocated_ids_are_unique(
        taken in prop::collection::hash_set(100u32..130, 0..20),
        count in 1usize..15,
        allocated_mode in any::<bool>(),
    ) {
        let fs = MockFileSystem::new();
        for id in &taken {
            fs.add_dir(Path::new(JOBS).join(id.to_string()));
        }
        let mode = if allocated_mode { IdPersistence::Allocated } else { IdPersistence::Base };
        let dir = JobDirectory::new(Arc::new(fs.clone()), JOBS, 100, mode);

        let mut seen = HashSet::new();
        for _ in 0..count {
            let (id, _) = dir.allocate().unwrap();
            prop_assert!(!taken.contains(&id.get()));
            prop_assert!(seen.insert(id));
        }
    }
}
