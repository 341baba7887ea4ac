use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, register_counter, register_counter_vec, register_gauge};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("thumbnail_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMITED: CounterVec = register_counter_vec!(
        "thumbnail_rate_limited_total",
        "Requests rejected by the rate governor",
        &["route"]
    )
    .unwrap();
    pub static ref RATE_KEYS: Gauge =
        register_gauge!("thumbnail_rate_keys", "Keys currently tracked by the rate governor").unwrap();
    pub static ref APPEND_RETRIES: Counter =
        register_counter!("thumbnail_comment_append_retries_total", "Comment writes that lost a race and retried").unwrap();
    pub static ref APPEND_CONFLICTS: Counter =
        register_counter!("thumbnail_comment_append_conflicts_total", "Comment appends that ran out of attempts").unwrap();
}
