mod caller;
mod comments;
mod health;
mod metrics;

pub use caller::Caller;
pub use comments::{add_comment, create_thumbnail, list_comments};
pub use health::health_handler;
pub use metrics::metrics_handler;
