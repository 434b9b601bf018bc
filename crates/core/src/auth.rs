//! Source of the authenticated caller's identity.

use crate::types::UserId;

/// Supplies the currently signed-in user, if any.
pub trait AuthProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Fixed identity, for the sync binary and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user_id: Option<UserId>,
}

impl StaticAuth {
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { user_id: None }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}
