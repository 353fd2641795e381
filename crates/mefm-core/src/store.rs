//! Persistence service abstraction

use crate::comment::model::{Comment, CommentDraft, CommentStatus};
use crate::error::Result;
use crate::types::{CommentId, PractitionerId};
use async_trait::async_trait;

/// Backend that stores comments. Every failure is a
/// [`MefmError::Persistence`](crate::MefmError::Persistence).
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new comment and return the id the backend assigned
    async fn create(&self, draft: &CommentDraft) -> Result<CommentId>;

    /// Overwrite a stored comment (used for status changes)
    async fn update(&self, comment: &Comment) -> Result<()>;

    /// All comments about a practitioner
    async fn list_for_practitioner(&self, practitioner_id: &PractitionerId) -> Result<Vec<Comment>>;

    /// All comments with the given status
    async fn list_by_status(&self, status: CommentStatus) -> Result<Vec<Comment>>;

    /// Write a batch of moderated comments
    async fn resolve(&self, comments: &[Comment]) -> Result<()>;
}

/// In-memory store for tests and offline use
pub mod memory {
    use super::*;
    use crate::error::MefmError;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, RwLock, Semaphore};

    /// In-memory comment store assigning ids `c1`, `c2`, ...
    pub struct MemoryStore {
        comments: RwLock<BTreeMap<usize, Comment>>,
        next_id: AtomicUsize,
        requests: AtomicUsize,
        failing: Mutex<HashSet<&'static str>>,
        gate: Mutex<Option<Arc<Semaphore>>>,
    }

    impl MemoryStore {
        /// Create a new in-memory store
        pub fn new() -> Self {
            Self {
                comments: RwLock::new(BTreeMap::new()),
                next_id: AtomicUsize::new(1),
                requests: AtomicUsize::new(0),
                failing: Mutex::new(HashSet::new()),
                gate: Mutex::new(None),
            }
        }

        /// Create a store already holding `comments`
        pub fn with_comments(comments: Vec<Comment>) -> Self {
            let mut store = Self::new();
            let mut map = BTreeMap::new();
            for comment in comments {
                let key = store.next_id.fetch_add(1, Ordering::SeqCst);
                map.insert(key, comment);
            }
            store.comments = RwLock::new(map);
            store
        }

        /// Make the next call of `operation` ("create", "update", "list",
        /// "resolve") fail
        pub async fn fail_next(&self, operation: &'static str) {
            self.failing.lock().await.insert(operation);
        }

        /// Park every request until [`release`](Self::release) is called
        pub async fn hold(&self) {
            *self.gate.lock().await = Some(Arc::new(Semaphore::new(0)));
        }

        /// Let parked requests continue
        pub async fn release(&self) {
            if let Some(gate) = self.gate.lock().await.take() {
                gate.add_permits(Semaphore::MAX_PERMITS);
            }
        }

        /// Number of requests received so far
        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        /// Snapshot of everything stored
        pub async fn all(&self) -> Vec<Comment> {
            self.comments.read().await.values().cloned().collect()
        }

        async fn enter(&self, operation: &'static str) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);

            let gate = self.gate.lock().await.clone();
            if let Some(gate) = gate {
                let _permit = gate
                    .acquire()
                    .await
                    .map_err(|e| MefmError::persistence(operation, e))?;
            }

            if self.failing.lock().await.remove(operation) {
                return Err(MefmError::persistence(operation, "injected failure"));
            }
            Ok(())
        }

        async fn overwrite(&self, operation: &'static str, comment: &Comment) -> Result<()> {
            let mut comments = self.comments.write().await;
            let stored = comments
                .values_mut()
                .find(|c| c.id == comment.id)
                .ok_or_else(|| MefmError::persistence(operation, format!("no comment {}", comment.id)))?;
            *stored = comment.clone();
            Ok(())
        }
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl CommentStore for MemoryStore {
        async fn create(&self, draft: &CommentDraft) -> Result<CommentId> {
            self.enter("create").await?;
            let key = self.next_id.fetch_add(1, Ordering::SeqCst);
            let id = CommentId::from_string(format!("c{}", key));
            self.comments
                .write()
                .await
                .insert(key, draft.clone().into_comment(id.clone()));
            Ok(id)
        }

        async fn update(&self, comment: &Comment) -> Result<()> {
            self.enter("update").await?;
            self.overwrite("update", comment).await
        }

        async fn list_for_practitioner(
            &self,
            practitioner_id: &PractitionerId,
        ) -> Result<Vec<Comment>> {
            self.enter("list").await?;
            let comments = self.comments.read().await;
            Ok(comments
                .values()
                .filter(|c| &c.practitioner_id == practitioner_id)
                .cloned()
                .collect())
        }

        async fn list_by_status(&self, status: CommentStatus) -> Result<Vec<Comment>> {
            self.enter("list").await?;
            let comments = self.comments.read().await;
            Ok(comments
                .values()
                .filter(|c| c.status == status)
                .cloned()
                .collect())
        }

        async fn resolve(&self, batch: &[Comment]) -> Result<()> {
            self.enter("resolve").await?;
            {
                let comments = self.comments.read().await;
                if let Some(missing) = batch
                    .iter()
                    .find(|b| !comments.values().any(|c| c.id == b.id))
                {
                    return Err(MefmError::persistence(
                        "resolve",
                        format!("no comment {}", missing.id),
                    ));
                }
            }
            for comment in batch {
                self.overwrite("resolve", comment).await?;
            }
            Ok(())
        }
    }

}
