use uuid::Uuid;

use crate::models::Role;

/// Identity
///
/// Who is making the current request. Resolved fresh for every request by a
/// `SessionResolver` and discarded when the request completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated { user_id: Uuid, role: Role },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated { role, .. } => Some(*role),
        }
    }
}
