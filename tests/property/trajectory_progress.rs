use proptest::prelude::*;
use simjob::trajectory::TrajectoryFormat;

proptest! {
    #[test]
    fn dpb_progress_is_monotonic_and_bounded(
        frames in 1u32..2000,
        atoms in 1usize..500,
        mut sizes in prop::collection::vec(0u64..2_000_000, 1..30),
    ) {
        sizes.sort_unstable();
        let mut previous = 0.0;
        for size in sizes {
            let p = TrajectoryFormat::Dpb.progress(size, frames, atoms);
            prop_assert!((0.0..=1.0).contains(&p));
            prop_assert!(p >= previous);
            previous = p;
        }
    }

    #[test]
    fn dpb_progress_is_exact_at_frame_boundaries(
        frames in 1u32..500,
        atoms in 1usize..200,
        written in 0u32..500,
    ) {
        let written = written.min(frames);
        let size = TrajectoryFormat::Dpb.expected_size(written, atoms);
        let expected = TrajectoryFormat::Dpb.expected_size(frames, atoms);
        let p = TrajectoryFormat::Dpb.progress(size, frames, atoms);
        prop_assert_eq!(p, size as f64 / expected as f64);
        if written == frames {
            prop_assert_eq!(p, 1.0);
        }
    }

    #[test]
    fn xyz_progress_never_overshoots_while_writing(
        frames in 1u32..200,
        atoms in 1usize..100,
        written in 0u32..200,
    ) {
        // Real frames are never larger than the per-frame estimate.
        let written = written.min(frames.saturating_sub(1));
        let size = TrajectoryFormat::Xyz.expected_size(written, atoms);
        prop_assert!(TrajectoryFormat::Xyz.progress(size, frames, atoms) < 1.0);
    }
}
