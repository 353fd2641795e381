//! Comment manager: owns the index and mediates every change to it

use super::index::{CommentIndex, ThreadEntry};
use super::inflight::{ActionKey, InFlight};
use super::model::{Comment, CommentDraft, NewComment};
use super::policy::{render_text, DisplayEntry, BLOCKED_PLACEHOLDER};
use super::validator::CommentValidator;
use crate::config::Config;
use crate::error::{MefmError, Result};
use crate::identity::IdentityProvider;
use crate::store::CommentStore;
use crate::types::{CommentId, PractitionerId, User};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Manager for practitioner comment threads.
///
/// The index lock is never held across a backend call; writes to the index
/// happen only after the backend confirmed them.
pub struct CommentManager {
    pub(crate) index: RwLock<CommentIndex>,
    pub(crate) store: Arc<dyn CommentStore>,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) in_flight: InFlight,
    validator: CommentValidator,
    placeholder: String,
    flag_pending: bool,
}

impl CommentManager {
    /// Create a manager with default settings
    pub fn new(store: Arc<dyn CommentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            index: RwLock::new(CommentIndex::new()),
            store,
            identity,
            in_flight: InFlight::new(),
            validator: CommentValidator::new(),
            placeholder: BLOCKED_PLACEHOLDER.to_string(),
            flag_pending: false,
        }
    }

    /// Create a manager with settings from configuration
    pub fn from_config(
        store: Arc<dyn CommentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &Config,
    ) -> Self {
        Self {
            validator: CommentValidator::with_max_length(config.comments.max_length),
            placeholder: config.comments.blocked_placeholder.clone(),
            flag_pending: config.moderation.flag_pending,
            ..Self::new(store, identity)
        }
    }

    /// Allow flagging comments that are still pending
    pub fn set_flag_pending(&mut self, allow: bool) {
        self.flag_pending = allow;
    }

    /// Text shown instead of blocked comments
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Write a new comment or reply.
    ///
    /// Replies must name a root comment of the same practitioner; use
    /// [`reply_target`](Self::reply_target) to find it. The comment is only
    /// indexed once the backend has assigned its id.
    pub async fn add_comment(&self, input: NewComment) -> Result<Comment> {
        let acting = self.identity.current_user();
        {
            let index = self.index.read().await;
            self.validator.validate(&input, acting.as_ref(), &index)?;
        }

        let _guard = self.in_flight.begin(ActionKey::Create {
            practitioner_id: input.practitioner_id.clone(),
            user_id: input.user_id.clone(),
            parent_id: input.parent_id.clone(),
            text: input.text.clone(),
        })?;

        let draft = CommentDraft::from_input(input);
        debug!(practitioner = %draft.practitioner_id, reply = draft.parent_id.is_some(), "creating comment");
        let id = self.store.create(&draft).await?;
        let comment = draft.into_comment(id);

        let mut index = self.index.write().await;
        index.insert(comment.clone()).map_err(|e| {
            warn!(comment = %comment.id, "stored comment could not be indexed: {}", e);
            e.with_context(format!("Comment {} was stored but not indexed", comment.id))
        })?;

        info!(comment = %comment.id, practitioner = %comment.practitioner_id, "comment created");
        Ok(comment)
    }

    /// Report a comment. Only visible comments can be flagged.
    pub async fn flag_comment(&self, comment: &Comment) -> Result<Comment> {
        let _guard = self.in_flight.begin(ActionKey::Status(comment.id.clone()))?;

        let current = self
            .get(&comment.id)
            .await
            .ok_or_else(|| MefmError::CommentNotFound(comment.id.to_string()))?;

        let next = current.status.flag(self.flag_pending)?;
        let flagged = current.with_status(next);
        self.store.update(&flagged).await?;

        let mut index = self.index.write().await;
        if let Some(latest) = index.get(&flagged.id).map(|c| c.status) {
            if latest != current.status && latest != next {
                warn!(comment = %flagged.id, from = %current.status, now = %latest, "status changed while flagging");
                latest.flag(self.flag_pending)?;
            }
        }
        let updated = match index.set_status(&flagged.id, next) {
            Ok(updated) => updated.clone(),
            // Reloaded away while the request was out; the backend has it.
            Err(MefmError::CommentNotFound(_)) => flagged,
            Err(e) => return Err(e),
        };

        info!(comment = %updated.id, "comment flagged");
        Ok(updated)
    }

    /// Comments of a practitioner in display order with their levels
    pub async fn flatten_for_display(&self, practitioner_id: &PractitionerId) -> Vec<ThreadEntry> {
        self.index.read().await.flatten(practitioner_id)
    }

    /// Flattened comments with the display policy for each
    pub async fn display_entries(&self, practitioner_id: &PractitionerId) -> Vec<DisplayEntry> {
        self.flatten_for_display(practitioner_id)
            .await
            .into_iter()
            .map(|entry| DisplayEntry::from_entry(entry, &self.placeholder))
            .collect()
    }

    /// Text to display for a comment
    pub fn render_text(&self, comment: &Comment) -> String {
        render_text(comment, &self.placeholder)
    }

    /// Parent id a reply to `comment_id` must use
    pub async fn reply_target(&self, comment_id: &CommentId) -> Result<CommentId> {
        self.index
            .read()
            .await
            .root_of(comment_id)
            .cloned()
            .ok_or_else(|| MefmError::CommentNotFound(comment_id.to_string()))
    }

    /// Fetch a practitioner's comments from the backend and replace what the
    /// index holds for them. Keeps the old entries if the fetch fails.
    pub async fn load_practitioner(&self, practitioner_id: &PractitionerId) -> Result<usize> {
        let comments = self.store.list_for_practitioner(practitioner_id).await?;
        let received = comments.len();

        let count = self
            .index
            .write()
            .await
            .replace_practitioner(practitioner_id, comments);

        if count < received {
            warn!(practitioner = %practitioner_id, received, indexed = count, "some comments were skipped");
        }
        info!(practitioner = %practitioner_id, count, "comments loaded");
        Ok(count)
    }

    /// Get a comment by ID
    pub async fn get(&self, id: &CommentId) -> Option<Comment> {
        self.index.read().await.get(id).cloned()
    }

    /// Total comments held for a practitioner
    pub async fn comment_count(&self, practitioner_id: &PractitionerId) -> usize {
        self.index.read().await.count(practitioner_id)
    }

    /// Number of threads held for a practitioner
    pub async fn thread_count(&self, practitioner_id: &PractitionerId) -> usize {
        self.index.read().await.threads(practitioner_id).len()
    }

    /// User the manager acts for
    pub fn current_user(&self) -> Option<User> {
        self.identity.current_user()
    }

    /// Whether any create, flag or resolve is waiting on the backend
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
