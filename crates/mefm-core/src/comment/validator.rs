//! Comment validation

use super::index::CommentIndex;
use super::model::NewComment;
use crate::error::{MefmError, Result};
use crate::types::User;

/// Maximum comment length (default)
pub const MAX_COMMENT_LENGTH: usize = 10000;

/// Minimum comment length
pub const MIN_COMMENT_LENGTH: usize = 1;

/// Validator for new comments
#[derive(Debug, Clone)]
pub struct CommentValidator {
    max_length: usize,
    min_length: usize,
}

impl CommentValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self {
            max_length: MAX_COMMENT_LENGTH,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Create a new validator with custom max length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Validate comment text
    pub fn validate_text(&self, text: &str) -> Result<()> {
        let length = text.trim().chars().count();

        if length < self.min_length {
            return Err(MefmError::Validation(
                "Comment text cannot be empty".to_string(),
            ));
        }

        if length > self.max_length {
            return Err(MefmError::Validation(format!(
                "Comment text exceeds maximum length of {} characters",
                self.max_length
            )));
        }

        Ok(())
    }

    /// Validate the author against the acting user
    pub fn validate_author(&self, input: &NewComment, acting: Option<&User>) -> Result<()> {
        let user = acting.ok_or_else(|| {
            MefmError::Validation("Sign in to write comments".to_string())
        })?;

        if user.id != input.user_id {
            return Err(MefmError::Validation(format!(
                "Comment author {} is not the signed-in user {}",
                input.user_id, user.id
            )));
        }

        Ok(())
    }

    /// Validate a complete comment submission against the index
    pub fn validate(
        &self,
        input: &NewComment,
        acting: Option<&User>,
        index: &CommentIndex,
    ) -> Result<()> {
        if input.practitioner_id.is_blank() {
            return Err(MefmError::Validation(
                "Practitioner ID is required".to_string(),
            ));
        }
        if input.user_id.is_blank() {
            return Err(MefmError::Validation("User ID is required".to_string()));
        }

        self.validate_author(input, acting)?;
        self.validate_text(&input.text)?;

        if let Some(parent_id) = &input.parent_id {
            index.check_reply_parent(&input.practitioner_id, parent_id)?;
        }

        Ok(())
    }
}

impl Default for CommentValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::model::{Comment, CommentStatus};
    use crate::types::{CommentId, PractitionerId, UserId};
    use chrono::Utc;

    fn input(parent: Option<&str>, text: &str) -> NewComment {
        NewComment {
            parent_id: parent.map(CommentId::from),
            practitioner_id: PractitionerId::from("p1"),
            user_id: UserId::from("u1"),
            text: text.to_string(),
        }
    }

    fn user() -> User {
        User::new("u1", "robert")
    }

    fn index_with_root() -> CommentIndex {
        let mut index = CommentIndex::new();
        index
            .insert(Comment {
                id: CommentId::from("c1"),
                parent_id: None,
                practitioner_id: PractitionerId::from("p1"),
                user_id: UserId::from("u2"),
                date: Utc::now(),
                text: "root".to_string(),
                status: CommentStatus::Visible,
            })
            .unwrap();
        index
    }

    #[test]
    fn test_validate_text_valid() {
        let validator = CommentValidator::new();
        assert!(validator.validate_text("Valid comment").is_ok());
        assert!(validator.validate_text("  Valid  ").is_ok());
    }

    #[test]
    fn test_validate_text_empty() {
        let validator = CommentValidator::new();
        assert!(validator.validate_text("").is_err());
        assert!(validator.validate_text("   ").is_err());
    }

    #[test]
    fn test_validate_text_too_long() {
        let validator = CommentValidator::with_max_length(10);
        assert!(validator.validate_text("Short").is_ok());
        assert!(validator.validate_text("This is too long").is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        let validator = CommentValidator::with_max_length(5);
        assert!(validator.validate_text("éééé").is_ok());
    }

    #[test]
    fn test_requires_signed_in_author() {
        let validator = CommentValidator::new();
        let index = CommentIndex::new();

        assert!(validator.validate(&input(None, "hi"), None, &index).is_err());

        let other = User::new("u9", "someone");
        assert!(validator
            .validate(&input(None, "hi"), Some(&other), &index)
            .is_err());

        assert!(validator
            .validate(&input(None, "hi"), Some(&user()), &index)
            .is_ok());
    }

    #[test]
    fn test_requires_identifiers() {
        let validator = CommentValidator::new();
        let index = CommentIndex::new();
        let mut blank = input(None, "hi");
        blank.practitioner_id = PractitionerId::from("");
        assert!(validator.validate(&blank, Some(&user()), &index).is_err());
    }

    #[test]
    fn test_parent_must_be_indexed_root() {
        let validator = CommentValidator::new();
        let index = index_with_root();

        assert!(validator
            .validate(&input(Some("c1"), "reply"), Some(&user()), &index)
            .is_ok());
        assert!(validator
            .validate(&input(Some("missing"), "reply"), Some(&user()), &index)
            .unwrap_err()
            .is_validation());
    }
}
