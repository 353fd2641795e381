//! Acting-user lookup

use crate::types::User;

/// Source of the user on whose behalf operations run
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any
    fn current_user(&self) -> Option<User>;
}

/// Identity fixed at construction time
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<User>,
}

impl StaticIdentity {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl From<Option<User>> for StaticIdentity {
    fn from(user: Option<User>) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}
