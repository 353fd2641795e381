//! Comment builder for fluent API

use super::model::NewComment;
use crate::error::{MefmError, Result};
use crate::types::{CommentId, PractitionerId, User, UserId};

/// Builder for comment submissions
pub struct CommentBuilder {
    practitioner_id: PractitionerId,
    user_id: UserId,
    parent_id: Option<CommentId>,
    text: Option<String>,
}

impl CommentBuilder {
    /// Start a root comment on a practitioner
    pub fn new(practitioner_id: impl Into<PractitionerId>, user_id: impl Into<UserId>) -> Self {
        Self {
            practitioner_id: practitioner_id.into(),
            user_id: user_id.into(),
            parent_id: None,
            text: None,
        }
    }

    /// Start a root comment authored by `user`
    pub fn by(user: &User, practitioner_id: impl Into<PractitionerId>) -> Self {
        Self::new(practitioner_id, user.id.clone())
    }

    /// Make this a reply to the root comment `parent_id`
    pub fn reply_to(mut self, parent_id: impl Into<CommentId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the comment text
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Build the submission
    pub fn build(self) -> Result<NewComment> {
        let text = self.text.ok_or_else(|| {
            MefmError::Validation("Comment text is required".to_string())
        })?;

        if text.trim().is_empty() {
            return Err(MefmError::Validation(
                "Comment text cannot be empty".to_string(),
            ));
        }

        Ok(NewComment {
            parent_id: self.parent_id,
            practitioner_id: self.practitioner_id,
            user_id: self.user_id,
            text,
        })
    }
}
