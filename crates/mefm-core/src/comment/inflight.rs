//! Guard against submitting the same action twice while the first is
//! still waiting on the backend

use crate::error::{MefmError, Result};
use crate::types::{CommentId, PractitionerId, UserId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Identity of an outstanding action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    Create {
        practitioner_id: PractitionerId,
        user_id: UserId,
        parent_id: Option<CommentId>,
        text: String,
    },
    /// Any status change of one comment
    Status(CommentId),
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::Create {
                practitioner_id,
                user_id,
                ..
            } => write!(f, "create comment by {} on {}", user_id, practitioner_id),
            ActionKey::Status(id) => write!(f, "status change of comment {}", id),
        }
    }
}

/// Set of outstanding actions
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key`; fails if the same action is already outstanding.
    /// The registration ends when the returned guard drops.
    pub fn begin(&self, key: ActionKey) -> Result<InFlightGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            warn!("rejecting duplicate request: {}", key);
            return Err(MefmError::RequestInFlight(key.to_string()));
        }
        Ok(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    /// Register every key or none of them
    pub fn begin_all(&self, keys: impl IntoIterator<Item = ActionKey>) -> Result<Vec<InFlightGuard>> {
        let mut guards = Vec::new();
        for key in keys {
            // Guards taken so far drop with the error
            guards.push(self.begin(key)?);
        }
        Ok(guards)
    }

    /// Whether `key` is outstanding
    pub fn contains(&self, key: &ActionKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Number of outstanding actions
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its action when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<ActionKey>>>,
    key: ActionKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected_until_released() {
        let in_flight = InFlight::new();
        let key = ActionKey::Status(CommentId::from("c1"));

        let guard = in_flight.begin(key.clone()).unwrap();
        assert!(in_flight.contains(&key));
        assert!(matches!(
            in_flight.begin(key.clone()),
            Err(MefmError::RequestInFlight(_))
        ));

        drop(guard);
        assert!(in_flight.is_empty());
        assert!(in_flight.begin(key).is_ok());
    }

    #[test]
    fn test_distinct_actions_independent() {
        let in_flight = InFlight::new();
        let _a = in_flight.begin(ActionKey::Status(CommentId::from("c1"))).unwrap();
        let _b = in_flight.begin(ActionKey::Status(CommentId::from("c2"))).unwrap();
        assert_eq!(in_flight.len(), 2);
    }

    #[test]
    fn test_begin_all_is_all_or_nothing() {
        let in_flight = InFlight::new();
        let held = in_flight.begin(ActionKey::Status(CommentId::from("c2"))).unwrap();

        let batch = ["c1", "c2", "c3"].map(|id| ActionKey::Status(CommentId::from(id)));
        assert!(matches!(
            in_flight.begin_all(batch.clone()),
            Err(MefmError::RequestInFlight(_))
        ));
        assert_eq!(in_flight.len(), 1);
        assert!(!in_flight.contains(&ActionKey::Status(CommentId::from("c1"))));

        drop(held);
        let guards = in_flight.begin_all(batch).unwrap();
        assert_eq!(guards.len(), 3);
        drop(guards);
        assert!(in_flight.is_empty());
    }
}
