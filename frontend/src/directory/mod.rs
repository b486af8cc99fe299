pub mod memory;
pub mod types;

pub use memory::InMemoryUserDirectory;
pub use types::*;

use crate::error::LookupError;

/// The user directory the session layer consults. Updates are fire-and-forget
/// from the caller's side: a failed update never changes the session.
pub trait UserDirectory {
    fn get_user_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, LookupError>;

    fn update_user(&self, id: &UserId, patch: UserPatch) -> Result<(), LookupError>;

    fn get_users_by_role(&self, role: Role) -> Vec<UserRecord>;

    fn find_user_by_email(&self, email: &str) -> Option<UserRecord>;

    fn insert_user(&self, user: UserRecord) -> Result<(), LookupError>;
}
