use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{Role, UserDirectory, UserId, UserPatch, UserRecord};
use crate::error::LookupError;

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RefCell<BTreeMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory seeded with the three demo accounts offered on the sign-in page.
    pub fn with_demo_users() -> Self {
        let directory = Self::new();
        for user in demo_users() {
            directory.users.borrow_mut().insert(user.id.clone(), user);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.users.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.borrow().is_empty()
    }
}

pub fn demo_users() -> Vec<UserRecord> {
    vec![
        UserRecord::new("1", "Dr. Smith", "doctor@example.com", Role::Doctor),
        UserRecord::new("2", "Admin User", "admin@example.com", Role::Admin),
        UserRecord::new("3", "John Doe", "user@example.com", Role::User),
    ]
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_user_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, LookupError> {
        Ok(self.users.borrow().get(id).cloned())
    }

    fn update_user(&self, id: &UserId, patch: UserPatch) -> Result<(), LookupError> {
        let mut users = self.users.borrow_mut();
        let user = users
            .get_mut(id)
            .ok_or_else(|| LookupError::NotFound(id.clone()))?;
        user.apply(&patch);
        Ok(())
    }

    fn get_users_by_role(&self, role: Role) -> Vec<UserRecord> {
        self.users
            .borrow()
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect()
    }

    fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        let needle = email.trim();
        self.users
            .borrow()
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(needle))
            .cloned()
    }

    fn insert_user(&self, user: UserRecord) -> Result<(), LookupError> {
        if self.find_user_by_email(&user.email).is_some() {
            return Err(LookupError::Conflict(user.email));
        }
        let mut users = self.users.borrow_mut();
        if users.contains_key(&user.id) {
            return Err(LookupError::Conflict(user.id.to_string()));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }
}
