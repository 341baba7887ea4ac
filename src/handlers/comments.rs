use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;

use super::Caller;
use crate::error::AppError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{AddCommentRequest, Comment, CommentsResponse};
use crate::policy::{COMMENT_CREATE, COMMENT_LIST, THUMBNAIL_CREATE};
use crate::state::AppState;
use crate::store::Scope;

fn validate_text(text: &str, max_len: usize) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text must not be empty".to_string()));
    }
    if text.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "Comment text must be at most {} characters",
            max_len
        )));
    }
    Ok(text.to_string())
}

// Registers an empty thumbnail record that comments can be added to
pub async fn create_thumbnail(
    State(state): State<Arc<AppState>>,
    Path((project_id, thumbnail_id)): Path<(String, String)>,
    caller: Caller,
) -> Result<(StatusCode, Json<CommentsResponse>), AppError> {
    REQUEST_TOTAL.inc();
    state.enforce(THUMBNAIL_CREATE, &caller.rate_key(THUMBNAIL_CREATE))?;

    if !state.store.create(&thumbnail_id, &Scope::project(project_id)).await? {
        return Err(AppError::AlreadyExists);
    }

    tracing::info!(thumbnail_id = %thumbnail_id, "thumbnail created");
    Ok((
        StatusCode::CREATED,
        Json(CommentsResponse {
            thumbnail_id,
            comments: Vec::new(),
        }),
    ))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path((project_id, thumbnail_id)): Path<(String, String)>,
    caller: Caller,
    Json(payload): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentsResponse>), AppError> {
    REQUEST_TOTAL.inc();
    state.enforce(COMMENT_CREATE, &caller.rate_key(COMMENT_CREATE))?;

    let text = validate_text(&payload.text, state.max_comment_len)?;
    let scope = Scope::project(project_id);
    let author_id = caller.user_id.clone();

    let comments = state
        .appender
        .append_with_retry(state.store.as_ref(), &thumbnail_id, &scope, || {
            Comment::new(author_id.clone(), text.clone())
        })
        .await?;

    tracing::info!(thumbnail_id = %thumbnail_id, total = comments.len(), "comment added");
    Ok((
        StatusCode::CREATED,
        Json(CommentsResponse {
            thumbnail_id,
            comments,
        }),
    ))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((project_id, thumbnail_id)): Path<(String, String)>,
    caller: Caller,
) -> Result<Json<CommentsResponse>, AppError> {
    REQUEST_TOTAL.inc();
    state.enforce(COMMENT_LIST, &caller.rate_key(COMMENT_LIST))?;

    let snapshot = state
        .store
        .get(&thumbnail_id, &Scope::project(project_id))
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(CommentsResponse {
        thumbnail_id,
        comments: snapshot.comments,
    }))
}
