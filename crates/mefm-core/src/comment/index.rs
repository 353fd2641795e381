//! Two-level comment index

use super::model::{Comment, CommentLevel, CommentStatus};
use crate::error::{MefmError, Result};
use crate::types::{CommentId, PractitionerId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A root comment together with the responses it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub root: Comment,
    /// Responses in arrival order
    pub responses: Vec<Comment>,
}

impl Thread {
    fn new(root: Comment) -> Self {
        Self {
            root,
            responses: Vec::new(),
        }
    }

    /// Number of comments in the thread, root included
    pub fn size(&self) -> usize {
        1 + self.responses.len()
    }
}

/// One row of the flattened display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    pub comment: Comment,
    pub level: CommentLevel,
}

/// Where a comment lives in the index
#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    practitioner_id: PractitionerId,
    root_id: CommentId,
}

/// Index of comments by practitioner, then by thread
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    /// Threads per practitioner, in arrival order
    threads: HashMap<PractitionerId, Vec<Thread>>,
    /// Location of every indexed comment
    locations: HashMap<CommentId, Location>,
}

impl CommentIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stored comment. Roots open a new thread; responses are
    /// appended to their root's thread. The parent must be an indexed root
    /// of the same practitioner.
    pub fn insert(&mut self, comment: Comment) -> Result<()> {
        if self.locations.contains_key(&comment.id) {
            return Err(MefmError::Validation(format!(
                "Comment with ID {} already exists",
                comment.id
            )));
        }

        match comment.parent_id.clone() {
            None => {
                debug!(comment = %comment.id, practitioner = %comment.practitioner_id, "indexing root comment");
                self.locations.insert(
                    comment.id.clone(),
                    Location {
                        practitioner_id: comment.practitioner_id.clone(),
                        root_id: comment.id.clone(),
                    },
                );
                self.threads
                    .entry(comment.practitioner_id.clone())
                    .or_default()
                    .push(Thread::new(comment));
            }
            Some(parent_id) => {
                self.check_reply_parent(&comment.practitioner_id, &parent_id)?;
                debug!(comment = %comment.id, root = %parent_id, "indexing response");
                self.locations.insert(
                    comment.id.clone(),
                    Location {
                        practitioner_id: comment.practitioner_id.clone(),
                        root_id: parent_id.clone(),
                    },
                );
                let thread = self
                    .thread_mut(&comment.practitioner_id, &parent_id)
                    .ok_or_else(|| MefmError::CommentNotFound(parent_id.to_string()))?;
                thread.responses.push(comment);
            }
        }

        Ok(())
    }

    /// Check that `parent_id` may be used as the parent of a new response
    /// for `practitioner_id`
    pub fn check_reply_parent(
        &self,
        practitioner_id: &PractitionerId,
        parent_id: &CommentId,
    ) -> Result<()> {
        let location = self.locations.get(parent_id).ok_or_else(|| {
            MefmError::Validation(format!("Parent comment {} does not exist", parent_id))
        })?;

        if &location.practitioner_id != practitioner_id {
            return Err(MefmError::Validation(format!(
                "Parent comment {} belongs to another practitioner",
                parent_id
            )));
        }

        if &location.root_id != parent_id {
            return Err(MefmError::Validation(format!(
                "Parent comment {} is a response; reply to its root {} instead",
                parent_id, location.root_id
            )));
        }

        Ok(())
    }

    /// Get a comment by ID
    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        let location = self.locations.get(id)?;
        let thread = self.thread(&location.practitioner_id, &location.root_id)?;
        if &thread.root.id == id {
            Some(&thread.root)
        } else {
            thread.responses.iter().find(|c| &c.id == id)
        }
    }

    /// Id of the root of the thread holding `id`
    pub fn root_of(&self, id: &CommentId) -> Option<&CommentId> {
        self.locations.get(id).map(|location| &location.root_id)
    }

    /// Change the status of an indexed comment
    pub fn set_status(&mut self, id: &CommentId, status: CommentStatus) -> Result<&Comment> {
        let location = self
            .locations
            .get(id)
            .cloned()
            .ok_or_else(|| MefmError::CommentNotFound(id.to_string()))?;
        let thread = self
            .thread_mut(&location.practitioner_id, &location.root_id)
            .ok_or_else(|| MefmError::CommentNotFound(id.to_string()))?;

        let comment = if &thread.root.id == id {
            &mut thread.root
        } else {
            thread
                .responses
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or_else(|| MefmError::CommentNotFound(id.to_string()))?
        };

        debug!(comment = %id, from = %comment.status, to = %status, "status change");
        comment.status = status;
        Ok(comment)
    }

    /// Get one thread
    pub fn thread(&self, practitioner_id: &PractitionerId, root_id: &CommentId) -> Option<&Thread> {
        self.threads
            .get(practitioner_id)?
            .iter()
            .find(|t| &t.root.id == root_id)
    }

    fn thread_mut(
        &mut self,
        practitioner_id: &PractitionerId,
        root_id: &CommentId,
    ) -> Option<&mut Thread> {
        self.threads
            .get_mut(practitioner_id)?
            .iter_mut()
            .find(|t| &t.root.id == root_id)
    }

    /// All threads of a practitioner, in arrival order
    pub fn threads(&self, practitioner_id: &PractitionerId) -> &[Thread] {
        self.threads
            .get(practitioner_id)
            .map(|threads| threads.as_slice())
            .unwrap_or(&[])
    }

    /// Roots ordered by date, each followed by its responses ordered by date.
    /// Equal dates keep arrival order.
    pub fn flatten(&self, practitioner_id: &PractitionerId) -> Vec<ThreadEntry> {
        let mut threads: Vec<&Thread> = self.threads(practitioner_id).iter().collect();
        threads.sort_by(|a, b| a.root.date.cmp(&b.root.date));

        let mut entries = Vec::new();
        for thread in threads {
            entries.push(ThreadEntry {
                comment: thread.root.clone(),
                level: CommentLevel::Root,
            });

            let mut responses: Vec<&Comment> = thread.responses.iter().collect();
            responses.sort_by(|a, b| a.date.cmp(&b.date));
            entries.extend(responses.into_iter().map(|c| ThreadEntry {
                comment: c.clone(),
                level: CommentLevel::Response,
            }));
        }
        entries
    }

    /// Replace everything known about a practitioner with `comments`.
    ///
    /// Records for other practitioners are skipped. A response whose parent
    /// is itself a response is attached to that response's root; responses
    /// with an unknown parent are skipped. Returns the number indexed.
    pub fn replace_practitioner(
        &mut self,
        practitioner_id: &PractitionerId,
        comments: Vec<Comment>,
    ) -> usize {
        self.clear_practitioner(practitioner_id);

        let (roots, responses): (Vec<Comment>, Vec<Comment>) = comments
            .into_iter()
            .filter(|c| {
                let ours = &c.practitioner_id == practitioner_id;
                if !ours {
                    warn!(comment = %c.id, practitioner = %c.practitioner_id, "skipping comment for another practitioner");
                }
                ours
            })
            .partition(Comment::is_root);

        let mut count = 0;
        for root in roots {
            match self.insert(root) {
                Ok(()) => count += 1,
                Err(e) => warn!("skipping root comment: {}", e),
            }
        }

        // Parents of responses may themselves be responses that arrive later
        // in the batch, so resolve roots against the whole batch first.
        let parents: HashMap<CommentId, Option<CommentId>> = responses
            .iter()
            .map(|c| (c.id.clone(), c.parent_id.clone()))
            .collect();

        let mut responses = responses;
        responses.sort_by(|a, b| a.date.cmp(&b.date));
        for mut response in responses {
            let Some(root_id) = self.resolve_root(response.parent_id.as_ref(), &parents) else {
                warn!(comment = %response.id, "skipping response with unknown parent");
                continue;
            };
            response.parent_id = Some(root_id);
            match self.insert(response) {
                Ok(()) => count += 1,
                Err(e) => warn!("skipping response: {}", e),
            }
        }

        count
    }

    /// Walk a parent chain up to an indexed root
    fn resolve_root(
        &self,
        parent_id: Option<&CommentId>,
        batch_parents: &HashMap<CommentId, Option<CommentId>>,
    ) -> Option<CommentId> {
        let mut current = parent_id?.clone();
        for _ in 0..=batch_parents.len() {
            if let Some(location) = self.locations.get(&current) {
                return Some(location.root_id.clone());
            }
            current = batch_parents.get(&current)?.clone()?;
        }
        None
    }

    /// Drop all comments of a practitioner
    pub fn clear_practitioner(&mut self, practitioner_id: &PractitionerId) {
        if let Some(threads) = self.threads.remove(practitioner_id) {
            for thread in threads {
                self.locations.remove(&thread.root.id);
                for response in thread.responses {
                    self.locations.remove(&response.id);
                }
            }
        }
    }

    /// Total comments held for a practitioner
    pub fn count(&self, practitioner_id: &PractitionerId) -> usize {
        self.threads(practitioner_id).iter().map(Thread::size).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Clear the entire index
    pub fn clear(&mut self) {
        self.threads.clear();
        self.locations.clear();
    }
}
