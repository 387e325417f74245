use std::sync::Arc;

use banter_quota_tracker::storage::QuotaStore;
use banter_quota_tracker::tracker::QuotaTracker;
use tempfile::TempDir;

// Re-export the e2e harness so benches and downstream tooling can drive the
// real service binary with the same helpers the e2e suite uses.
#[cfg(feature = "bench-include")]
#[path = "../tests/e2e/harness.rs"]
pub mod e2e_harness;

#[cfg(feature = "bench-include")]
pub use e2e_harness::{find_free_port, random_user_id, TestHarness};

/// An on-disk tracker over a throwaway data directory, for benchmarks and
/// shared test tooling. The directory lives as long as the fixture.
pub struct QuotaBenchFixture {
    pub tracker: Arc<QuotaTracker>,
    pub temp_dir: TempDir,
}

impl QuotaBenchFixture {
    pub fn new(daily_limit: u64) -> Self {
        let temp_dir = TempDir::new().expect("tempdir");
        let store = QuotaStore::new(temp_dir.path().to_path_buf()).expect("store opened");
        let tracker = QuotaTracker::new(Arc::new(store), daily_limit);
        Self {
            tracker: Arc::new(tracker),
            temp_dir,
        }
    }

    /// Pre-spends `consumed` requests for `user_id`, so steady-state and
    /// denied paths start from a known count.
    pub fn seed_user(&self, user_id: &str, consumed: u64) {
        for _ in 0..consumed {
            let decision = self.tracker.consume(user_id).expect("seed consume");
            assert!(decision.allowed, "seeding exceeded the fixture limit");
        }
    }
}
