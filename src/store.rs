// Versioned record store; conditional_set must check and write in one step

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::Comment;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store invariant violated: {0}")]
    Invariant(String),
}

// Authorization boundary a record must belong to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project_id: String,
}

impl Scope {
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

// Opaque value that changes on every write to a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

// What a read returns: the collection plus the version it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub comments: Vec<Comment>,
    pub version: Option<VersionToken>,
}

// Rows touched by a conditional write and the collection as now stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub affected: u64,
    pub comments: Vec<Comment>,
}

impl WriteOutcome {
    pub fn missed() -> Self {
        Self {
            affected: 0,
            comments: Vec::new(),
        }
    }
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Create an empty, versioned record. Returns false if the id is taken.
    async fn create(&self, record_id: &str, scope: &Scope) -> Result<bool, StoreError>;

    /// Read a record's comments, filtered by both id and scope.
    async fn get(&self, record_id: &str, scope: &Scope) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the comment list if id and scope match and the record is still
    /// at `expected`. `None` means the record had no version and the write is
    /// unconditional.
    async fn conditional_set(
        &self,
        record_id: &str,
        scope: &Scope,
        comments: Vec<Comment>,
        expected: Option<&VersionToken>,
    ) -> Result<WriteOutcome, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredRecord {
    project_id: String,
    comments: Vec<Comment>,
    version: Option<VersionToken>,
}

/// In-memory store; every conditional write runs under the record's map guard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, StoredRecord>,
    counter: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record that has never been versioned.
    pub fn insert_unversioned(&self, record_id: &str, scope: &Scope, comments: Vec<Comment>) {
        self.records.insert(
            record_id.to_string(),
            StoredRecord {
                project_id: scope.project_id.clone(),
                comments,
                version: None,
            },
        );
    }

    /// Seed a record at a given version.
    pub fn insert(
        &self,
        record_id: &str,
        scope: &Scope,
        comments: Vec<Comment>,
        version: VersionToken,
    ) {
        self.records.insert(
            record_id.to_string(),
            StoredRecord {
                project_id: scope.project_id.clone(),
                comments,
                version: Some(version),
            },
        );
    }

    fn next_version(&self) -> VersionToken {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        VersionToken(format!("v{}", n))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, record_id: &str, scope: &Scope) -> Result<bool, StoreError> {
        match self.records.entry(record_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(StoredRecord {
                    project_id: scope.project_id.clone(),
                    comments: Vec::new(),
                    version: Some(self.next_version()),
                });
                Ok(true)
            }
        }
    }

    async fn get(&self, record_id: &str, scope: &Scope) -> Result<Option<Snapshot>, StoreError> {
        Ok(self
            .records
            .get(record_id)
            .filter(|r| r.project_id == scope.project_id)
            .map(|r| Snapshot {
                comments: r.comments.clone(),
                version: r.version.clone(),
            }))
    }

    async fn conditional_set(
        &self,
        record_id: &str,
        scope: &Scope,
        comments: Vec<Comment>,
        expected: Option<&VersionToken>,
    ) -> Result<WriteOutcome, StoreError> {
        let Some(mut record) = self.records.get_mut(record_id) else {
            return Ok(WriteOutcome::missed());
        };
        if record.project_id != scope.project_id {
            return Ok(WriteOutcome::missed());
        }
        if let Some(expected) = expected {
            if record.version.as_ref() != Some(expected) {
                return Ok(WriteOutcome::missed());
            }
        }

        record.comments = comments;
        record.version = Some(self.next_version());
        Ok(WriteOutcome {
            affected: 1,
            comments: record.comments.clone(),
        })
    }
}
