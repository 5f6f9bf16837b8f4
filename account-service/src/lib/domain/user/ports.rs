use async_trait::async_trait;

use crate::user::errors::StoreError;
use crate::user::models::EmailAddress;
use crate::user::models::Role;
use crate::user::models::RoleId;
use crate::user::models::User;
use crate::user::models::UserId;

/// Persistence operations for the user aggregate.
///
/// Not-found is signalled with `None`, distinguishable from a store failure.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Retrieve a user by email address.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError>;

    /// Retrieve a user by identifier.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Retrieve a user by external identity-provider identifier.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError>;

    /// Persist a new user.
    ///
    /// # Errors
    /// * `Conflict` - Email is already registered
    /// * `StoreError` - Store operation failed
    async fn create(&self, user: User) -> Result<User, StoreError>;

    /// Create or update a user keyed by its external identifier.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn upsert(&self, user: User) -> Result<User, StoreError>;

    /// Replace the stored password hash for an email.
    ///
    /// # Returns
    /// True when a row was updated, false when no such user exists
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn update_password(
        &self,
        email: &EmailAddress,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Remove a user from storage.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn delete(&self, id: &UserId) -> Result<(), StoreError>;
}

/// Lookup operations for pre-existing roles.
#[async_trait]
pub trait RoleStore: Send + Sync + 'static {
    /// Retrieve a role by name.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// Retrieve a role by identifier.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError>;
}
