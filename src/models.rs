use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// One comment on a thumbnail, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: Option<String>, text: String) -> Self {
        Self {
            author_id,
            text,
            created_at: Utc::now(),
        }
    }
}

// POST body for adding a comment
#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

// Comment list as returned by both comment routes
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub thumbnail_id: String,
    pub comments: Vec<Comment>,
}
