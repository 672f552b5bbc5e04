//! In-memory record storage shared by the domain operations.
//!
//! Each record type lives in its own `DashMap`. Unique lookups (email and
//! username) are kept in index maps whose `entry` API doubles as the
//! uniqueness check, so two concurrent registrations cannot both claim the
//! same email.

use dashmap::DashMap;

use crate::project::Project;
use crate::user::User;

pub type Id = uuid::Uuid;

#[derive(Default)]
pub struct Store {
    pub(crate) users: DashMap<Id, User>,
    pub(crate) users_by_email: DashMap<String, Id>,
    pub(crate) users_by_username: DashMap<String, Id>,
    pub(crate) projects: DashMap<Id, Project>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }
}
