//! The authenticated user identity.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A signed-in user.
///
/// Issued by the identity service when an authentication ceremony (or a
/// session re-validation) succeeds. Never mutated afterwards; a new sign-in
/// produces a new value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}
