// Optimistic append to a record's comment list, no lock held across round trips

use crate::metrics::{APPEND_CONFLICTS, APPEND_RETRIES};
use crate::models::Comment;
use crate::store::{CommentStore, Scope, StoreError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error("record not found in scope")]
    NotFound,
    #[error("write conflict persisted after {attempts} attempts")]
    ConflictExhausted { attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Outcome of a single read-compute-write pass
#[derive(Debug)]
pub enum AttemptResult {
    Applied(Vec<Comment>),
    NotFound,
    Lost,
    Failed(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry,
    Return,
}

/// Retry only a lost race, and only while attempts remain.
pub fn should_retry(result: &AttemptResult, attempts_so_far: u32, max_attempts: u32) -> Decision {
    match result {
        AttemptResult::Lost if attempts_so_far < max_attempts => Decision::Retry,
        _ => Decision::Return,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Appender {
    max_attempts: u32,
}

impl Appender {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    // build runs once per attempt so the timestamp matches the write that lands
    pub async fn append_with_retry<S, F>(
        &self,
        store: &S,
        record_id: &str,
        scope: &Scope,
        mut build: F,
    ) -> Result<Vec<Comment>, AppendError>
    where
        S: CommentStore + ?Sized,
        F: FnMut() -> Comment,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = attempt(store, record_id, scope, &mut build).await;

            match should_retry(&result, attempts, self.max_attempts) {
                Decision::Retry => {
                    APPEND_RETRIES.inc();
                    tracing::debug!(record_id, attempt = attempts, "comment write lost race, re-reading");
                    continue;
                }
                Decision::Return => {}
            }

            return match result {
                AttemptResult::Applied(comments) => Ok(comments),
                AttemptResult::NotFound => Err(AppendError::NotFound),
                AttemptResult::Failed(e) => Err(AppendError::Store(e)),
                AttemptResult::Lost => {
                    APPEND_CONFLICTS.inc();
                    tracing::warn!(record_id, attempts, "comment append gave up after repeated conflicts");
                    Err(AppendError::ConflictExhausted { attempts })
                }
            };
        }
    }
}

impl Default for Appender {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

// Reading -> Computing -> Writing
async fn attempt<S, F>(store: &S, record_id: &str, scope: &Scope, build: &mut F) -> AttemptResult
where
    S: CommentStore + ?Sized,
    F: FnMut() -> Comment,
{
    let snapshot = match store.get(record_id, scope).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return AttemptResult::NotFound,
        Err(e) => return AttemptResult::Failed(e),
    };

    let mut comments = snapshot.comments;
    comments.push(build());

    // a record with no version yet is written unconditionally, so two first
    // writers can still overwrite each other there

    match store
        .conditional_set(record_id, scope, comments, snapshot.version.as_ref())
        .await
    {
        Ok(outcome) if outcome.affected == 1 => AttemptResult::Applied(outcome.comments),
        Ok(outcome) if outcome.affected == 0 => AttemptResult::Lost,
        Ok(outcome) => AttemptResult::Failed(StoreError::Invariant(format!(
            "conditional write touched {} records",
            outcome.affected
        ))),
        Err(e) => AttemptResult::Failed(e),
    }
}
