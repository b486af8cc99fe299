use std::rc::Rc;

use log::info;

use super::utils::{SignInRequest, SignUpRequest};
use crate::{
    directory::{Role, UserDirectory, UserId, UserRecord},
    error::LookupError,
};

/// Resolves form submissions to directory accounts. There is no password
/// check: any address signs in, unknown ones as a guest patient account.
#[derive(Clone)]
pub struct AuthRepository {
    directory: Rc<dyn UserDirectory>,
}

impl AuthRepository {
    pub fn new(directory: Rc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    pub fn sign_in(&self, request: &SignInRequest) -> Result<UserRecord, LookupError> {
        if let Some(user) = self.directory.find_user_by_email(&request.email) {
            return Ok(user);
        }
        let guest = UserRecord::new(UserId::generate(), "Guest User", &request.email, Role::User);
        self.directory.insert_user(guest.clone())?;
        info!("registered guest account for {}", request.email);
        Ok(guest)
    }

    pub fn sign_up(&self, request: &SignUpRequest) -> Result<UserRecord, LookupError> {
        let user = UserRecord::new(
            UserId::generate(),
            &request.name,
            &request.email,
            request.role,
        );
        self.directory.insert_user(user.clone())?;
        info!("registered {} account for {}", user.role, user.email);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;

    fn repo() -> (Rc<InMemoryUserDirectory>, AuthRepository) {
        let directory = Rc::new(InMemoryUserDirectory::with_demo_users());
        (directory.clone(), AuthRepository::new(directory))
    }

    #[test]
    fn known_email_signs_in_as_that_account() {
        let (_, repo) = repo();
        let user = repo
            .sign_in(&SignInRequest {
                email: "admin@example.com".into(),
            })
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, "Admin User");
    }

    #[test]
    fn unknown_email_becomes_guest_patient() {
        let (directory, repo) = repo();
        let request = SignInRequest {
            email: "new@example.com".into(),
        };
        let guest = repo.sign_in(&request).unwrap();
        assert_eq!(guest.role, Role::User);
        assert_eq!(guest.name, "Guest User");
        assert_eq!(directory.len(), 4);

        let again = repo.sign_in(&request).unwrap();
        assert_eq!(again.id, guest.id);
        assert_eq!(directory.len(), 4);
    }

    #[test]
    fn sign_up_registers_account() {
        let (directory, repo) = repo();
        let user = repo
            .sign_up(&SignUpRequest {
                name: "Jane Roe".into(),
                email: "jane@example.com".into(),
                role: Role::Doctor,
            })
            .unwrap();
        assert!(user.is_active());
        assert_eq!(
            directory.get_user_by_id(&user.id).unwrap().map(|u| u.email),
            Some("jane@example.com".to_string())
        );
    }

    #[test]
    fn sign_up_with_taken_email_conflicts() {
        let (_, repo) = repo();
        let err = repo
            .sign_up(&SignUpRequest {
                name: "Copy".into(),
                email: "doctor@example.com".into(),
                role: Role::Doctor,
            })
            .unwrap_err();
        assert!(matches!(err, LookupError::Conflict(_)));
    }
}
