use std::sync::Arc;

use crate::append::Appender;
use crate::error::AppError;
use crate::metrics::{RATE_KEYS, RATE_LIMITED};
use crate::policy::PolicyTable;
use crate::rate_key::RateKey;
use crate::rate_limit::RateGovernor;
use crate::store::CommentStore;

// app's shared state, built once at startup
pub struct AppState {
    pub governor: Arc<RateGovernor>,
    pub policies: PolicyTable,
    pub store: Arc<dyn CommentStore>,
    pub appender: Appender,
    pub max_comment_len: usize,
    pub trust_forwarded: bool, // key anonymous callers by x-forwarded-for first
}

impl AppState {
    /// Ask the governor for one slot on `route_id`, applying that route's policy.
    pub fn enforce(&self, route_id: &str, key: &RateKey) -> Result<(), AppError> {
        let policy = self.policies.get(route_id);
        let admitted = self
            .governor
            .admit(key, policy.limit_per_window, policy.window_ms);
        RATE_KEYS.set(self.governor.len() as f64);

        if admitted {
            Ok(())
        } else {
            RATE_LIMITED.with_label_values(&[route_id]).inc();
            Err(AppError::RateLimited {
                route: route_id.to_string(),
                message: policy.rejection_message.clone(),
            })
        }
    }
}
