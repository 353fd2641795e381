//! Comment data models

use crate::error::{MefmError, Result};
use crate::types::{CommentId, PractitionerId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored comment on a practitioner. Always carries the id the backend
/// assigned; comments not yet persisted are [`CommentDraft`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    /// Root comment this one responds to; `None` for a root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub practitioner_id: PractitionerId,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub text: String,
    pub status: CommentStatus,
}

impl Comment {
    /// Whether this is a level 1 comment
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Nesting level implied by the parent reference
    pub fn level(&self) -> CommentLevel {
        if self.is_root() {
            CommentLevel::Root
        } else {
            CommentLevel::Response
        }
    }

    /// Copy of this comment with a different status
    pub fn with_status(&self, status: CommentStatus) -> Comment {
        Comment {
            status,
            ..self.clone()
        }
    }
}

/// A comment waiting for the backend to assign its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub practitioner_id: PractitionerId,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub text: String,
    pub status: CommentStatus,
}

impl CommentDraft {
    /// Start a pending draft from user input, stamped with the current time
    pub fn from_input(input: NewComment) -> Self {
        Self {
            parent_id: input.parent_id,
            practitioner_id: input.practitioner_id,
            user_id: input.user_id,
            date: Utc::now(),
            text: input.text,
            status: CommentStatus::Pending,
        }
    }

    /// Merge the backend-assigned id
    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            parent_id: self.parent_id,
            practitioner_id: self.practitioner_id,
            user_id: self.user_id,
            date: self.date,
            text: self.text,
            status: self.status,
        }
    }
}

/// What a user submits when writing a comment or reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub practitioner_id: PractitionerId,
    pub user_id: UserId,
    pub text: String,
}

/// Nesting level of a comment in a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommentLevel {
    /// Level 1: starts a thread
    Root,
    /// Level 2: a response inside a thread
    Response,
}

impl CommentLevel {
    /// Numeric level (1 or 2)
    pub fn as_u8(&self) -> u8 {
        match self {
            CommentLevel::Root => 1,
            CommentLevel::Response => 2,
        }
    }
}

/// Moderation status of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentStatus {
    /// Newly created, not yet reviewed
    Pending,
    /// Approved and open to flagging
    Visible,
    /// Reviewed by a moderator and kept
    Moderated,
    /// Reported by a user, awaiting review
    Flagged,
    /// Removed by a moderator; text withheld from display
    Blocked,
}

/// Outcome a moderator picks for a comment in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approve,
    Block,
}

impl ModerationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "approve",
            ModerationDecision::Block => "block",
        }
    }
}

impl CommentStatus {
    pub const ALL: [CommentStatus; 5] = [
        CommentStatus::Pending,
        CommentStatus::Visible,
        CommentStatus::Moderated,
        CommentStatus::Flagged,
        CommentStatus::Blocked,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "PENDING",
            CommentStatus::Visible => "VISIBLE",
            CommentStatus::Moderated => "MODERATED",
            CommentStatus::Flagged => "FLAGGED",
            CommentStatus::Blocked => "BLOCKED",
        }
    }

    /// Parse from the wire name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Status after a user flags the comment. Only `Visible` may be flagged,
    /// plus `Pending` when `allow_pending` is set.
    pub fn flag(self, allow_pending: bool) -> Result<CommentStatus> {
        match self {
            CommentStatus::Visible => Ok(CommentStatus::Flagged),
            CommentStatus::Pending if allow_pending => Ok(CommentStatus::Flagged),
            from => Err(MefmError::InvalidTransition {
                from,
                action: "flag",
            }),
        }
    }

    /// Status after a moderator decision. Blocked is terminal.
    pub fn moderate(self, decision: ModerationDecision) -> Result<CommentStatus> {
        use CommentStatus::*;
        let next = match (self, decision) {
            (Pending, ModerationDecision::Approve) => Some(Visible),
            (Flagged | Visible, ModerationDecision::Approve) => Some(Moderated),
            (Pending | Visible | Flagged | Moderated, ModerationDecision::Block) => Some(Blocked),
            _ => None,
        };
        next.ok_or(MefmError::InvalidTransition {
            from: self,
            action: decision.as_str(),
        })
    }

    /// Whether the comment waits in the moderation queue
    pub fn awaits_review(&self) -> bool {
        matches!(self, CommentStatus::Pending | CommentStatus::Flagged)
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_comment(parent: Option<&str>) -> Comment {
        Comment {
            id: CommentId::from("c1"),
            parent_id: parent.map(CommentId::from),
            practitioner_id: PractitionerId::from("p1"),
            user_id: UserId::from("u1"),
            date: Utc.with_ymd_and_hms(2019, 3, 1, 12, 0, 0).unwrap(),
            text: "Very attentive doctor".to_string(),
            status: CommentStatus::Visible,
        }
    }

    #[test]
    fn test_levels() {
        assert_eq!(create_test_comment(None).level(), CommentLevel::Root);
        assert_eq!(create_test_comment(Some("c0")).level(), CommentLevel::Response);
        assert_eq!(CommentLevel::Root.as_u8(), 1);
        assert_eq!(CommentLevel::Response.as_u8(), 2);
    }

    #[test]
    fn test_draft_starts_pending() {
        let draft = CommentDraft::from_input(NewComment {
            parent_id: None,
            practitioner_id: PractitionerId::from("p1"),
            user_id: UserId::from("u1"),
            text: "hello".to_string(),
        });
        assert_eq!(draft.status, CommentStatus::Pending);

        let comment = draft.clone().into_comment(CommentId::from("c9"));
        assert_eq!(comment.id, CommentId::from("c9"));
        assert_eq!(comment.date, draft.date);
        assert_eq!(comment.text, "hello");
    }

    #[test]
    fn test_flag_transitions() {
        assert_eq!(
            CommentStatus::Visible.flag(false).unwrap(),
            CommentStatus::Flagged
        );
        for from in [
            CommentStatus::Pending,
            CommentStatus::Flagged,
            CommentStatus::Moderated,
            CommentStatus::Blocked,
        ] {
            assert!(from.flag(false).unwrap_err().is_invalid_transition());
        }
        assert_eq!(
            CommentStatus::Pending.flag(true).unwrap(),
            CommentStatus::Flagged
        );
        assert!(CommentStatus::Blocked.flag(true).is_err());
    }

    #[test]
    fn test_moderation_transitions() {
        use CommentStatus::*;
        use ModerationDecision::*;

        assert_eq!(Pending.moderate(Approve).unwrap(), Visible);
        assert_eq!(Flagged.moderate(Approve).unwrap(), Moderated);
        assert_eq!(Visible.moderate(Approve).unwrap(), Moderated);
        assert!(Moderated.moderate(Approve).is_err());
        assert!(Blocked.moderate(Approve).is_err());

        for from in [Pending, Visible, Flagged, Moderated] {
            assert_eq!(from.moderate(Block).unwrap(), Blocked);
        }
        assert!(Blocked.moderate(Block).is_err());
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        for from in CommentStatus::ALL {
            assert_ne!(from.flag(true).ok(), Some(CommentStatus::Pending));
            for decision in [ModerationDecision::Approve, ModerationDecision::Block] {
                assert_ne!(from.moderate(decision).ok(), Some(CommentStatus::Pending));
            }
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(CommentStatus::parse("flagged"), Some(CommentStatus::Flagged));
        assert_eq!(CommentStatus::parse("PENDING"), Some(CommentStatus::Pending));
        assert_eq!(CommentStatus::parse("approved"), None);
    }

    #[test]
    fn test_wire_format() {
        let comment = create_test_comment(Some("c0"));
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["parentId"], "c0");
        assert_eq!(json["practitionerId"], "p1");
        assert_eq!(json["status"], "VISIBLE");

        let root = create_test_comment(None);
        let json = serde_json::to_value(&root).unwrap();
        assert!(json.get("parentId").is_none());
    }

    #[test]
    fn test_backend_payload_with_numeric_ids() {
        let json = r#"{
            "id": 5066549580791808,
            "parentId": null,
            "practitionerId": 42,
            "userId": 7,
            "date": "2019-03-01T12:00:00Z",
            "text": "hello",
            "status": "FLAGGED"
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.id.as_str(), "5066549580791808");
        assert!(comment.is_root());
        assert_eq!(comment.status, CommentStatus::Flagged);
    }
}
