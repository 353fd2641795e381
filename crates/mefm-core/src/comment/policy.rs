//! Display policy derived from comment status
//!
//! The rendering layer asks this module what to show for a comment instead
//! of branching on [`CommentStatus`] itself.

use super::index::ThreadEntry;
use super::model::{Comment, CommentLevel, CommentStatus};
use serde::Serialize;

/// Text shown in place of a blocked comment
pub const BLOCKED_PLACEHOLDER: &str = "Comment has been removed by moderator";

/// Text to display for a comment. Blocked comments show `placeholder`; the
/// stored text is left untouched.
pub fn render_text(comment: &Comment, placeholder: &str) -> String {
    match comment.status {
        CommentStatus::Blocked => placeholder.to_string(),
        _ => comment.text.clone(),
    }
}

/// What the display may offer for one comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayPolicy {
    /// Offer a "Reply" action
    pub reply_action: bool,
    /// Offer a "Flag" action
    pub flag_action: bool,
    /// Show the flag marker
    pub flag_icon: bool,
    /// Body text to display
    pub text: String,
}

impl DisplayPolicy {
    pub fn for_comment(comment: &Comment, level: CommentLevel, placeholder: &str) -> Self {
        let status = comment.status;
        Self {
            reply_action: level == CommentLevel::Root,
            flag_action: matches!(status, CommentStatus::Visible | CommentStatus::Pending),
            flag_icon: status == CommentStatus::Flagged,
            text: render_text(comment, placeholder),
        }
    }
}

/// A flattened entry plus its display policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEntry {
    pub comment: Comment,
    pub level: CommentLevel,
    pub policy: DisplayPolicy,
}

impl DisplayEntry {
    pub fn from_entry(entry: ThreadEntry, placeholder: &str) -> Self {
        let policy = DisplayPolicy::for_comment(&entry.comment, entry.level, placeholder);
        Self {
            comment: entry.comment,
            level: entry.level,
            policy,
        }
    }
}
