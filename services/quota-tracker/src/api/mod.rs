use std::sync::Arc;

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::*;
pub use router::create_router;
pub use types::*;

use crate::tracker::QuotaTracker;

pub struct ApiState {
    pub tracker: Arc<QuotaTracker>,
}

impl ApiState {
    pub fn new(tracker: Arc<QuotaTracker>) -> Self {
        Self { tracker }
    }
}
