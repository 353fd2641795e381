//! Moderation queue and decisions
//!
//! Moderators pull comments that await review (pending or flagged) and
//! resolve them in batches. Every decision in a batch is checked before the
//! batch goes to the backend, and the index only changes once it is stored.

use crate::comment::inflight::ActionKey;
use crate::comment::manager::CommentManager;
use crate::comment::model::{Comment, CommentStatus, ModerationDecision};
use crate::error::{MefmError, Result};
use crate::types::User;
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl CommentManager {
    fn require_moderator(&self) -> Result<User> {
        let user = self
            .identity
            .current_user()
            .ok_or_else(|| MefmError::Unauthorized("sign in as a moderator".to_string()))?;
        if !user.role.can_moderate() {
            return Err(MefmError::Unauthorized(format!(
                "user {} is not a moderator",
                user.username
            )));
        }
        Ok(user)
    }

    /// Comments waiting for review with `status`, oldest first
    pub async fn moderation_queue(&self, status: CommentStatus) -> Result<Vec<Comment>> {
        self.require_moderator()?;
        if !status.awaits_review() {
            return Err(MefmError::Validation(format!(
                "{} comments are not reviewed; choose PENDING or FLAGGED",
                status
            )));
        }

        let mut comments = self.store.list_by_status(status).await?;
        comments.retain(|c| c.status == status);
        comments.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(comments)
    }

    /// Apply moderator decisions as one batch. Returns the updated comments.
    pub async fn resolve(&self, decisions: &[(Comment, ModerationDecision)]) -> Result<Vec<Comment>> {
        let moderator = self.require_moderator()?;
        if decisions.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        for (comment, _) in decisions {
            if !seen.insert(comment.id.clone()) {
                return Err(MefmError::Validation(format!(
                    "comment {} appears twice in the batch",
                    comment.id
                )));
            }
        }

        let _guards = self.in_flight.begin_all(
            decisions
                .iter()
                .map(|(comment, _)| ActionKey::Status(comment.id.clone())),
        )?;

        let mut resolved = Vec::with_capacity(decisions.len());
        let mut checked = Vec::with_capacity(decisions.len());
        {
            let index = self.index.read().await;
            for (comment, decision) in decisions {
                // The indexed copy is newer than whatever the caller holds
                let current = index.get(&comment.id).unwrap_or(comment);
                let next = current.status.moderate(*decision)?;
                checked.push((current.status, *decision));
                resolved.push(current.with_status(next));
            }
        }

        self.store.resolve(&resolved).await?;

        let mut index = self.index.write().await;
        for (comment, (from, decision)) in resolved.iter().zip(&checked) {
            if let Some(latest) = index.get(&comment.id).map(|c| c.status) {
                if latest != *from && latest != comment.status {
                    warn!(comment = %comment.id, from = %from, now = %latest, "status changed while resolving");
                    latest.moderate(*decision)?;
                }
            }
        }
        for comment in &resolved {
            match index.set_status(&comment.id, comment.status) {
                Ok(_) => {}
                Err(MefmError::CommentNotFound(_)) => {
                    debug!(comment = %comment.id, "resolved comment not loaded locally");
                }
                Err(e) => return Err(e),
            }
        }

        info!(moderator = %moderator.username, count = resolved.len(), "comments resolved");
        Ok(resolved)
    }
}
