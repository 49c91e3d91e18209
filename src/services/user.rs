//! User service
//!
//! Household members known to the ledger. Roles are recorded for the
//! presentation layer; nothing here enforces them.

use chrono::Utc;
use tracing::info;

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Role, User, UserId};
use crate::storage::{ChangeKind, Collection, Storage};

use super::resolve_record;

/// Service for user management
pub struct UserService<'a> {
    storage: &'a Storage,
}

fn user_not_found(identifier: impl Into<String>) -> LedgerError {
    LedgerError::NotFound {
        entity_type: "User",
        identifier: identifier.into(),
    }
}

impl<'a> UserService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a user; the email must be unique
    pub fn create(&self, email: &str, display_name: &str, role: Role) -> LedgerResult<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::Validation(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        let lock = self.storage.write_lock()?;
        if self.get_by_email(&email)?.is_some() {
            return Err(LedgerError::Validation(format!(
                "A user with email '{}' already exists",
                email
            )));
        }

        let user = User::new(email, display_name.trim(), role);
        let op = lock.begin_operation("create_user", vec![user.id.key()])?;
        self.storage.users.upsert(user.clone())?;
        op.commit(&[Collection::Users])?;
        self.storage
            .publish(Collection::Users, ChangeKind::Inserted, Some(user.id.key()));

        info!(user = %user.id, role = %user.role, "user created");

        self.storage.log_create(
            EntityType::User,
            user.id.key(),
            Some(user.email.clone()),
            &user,
        )?;

        Ok(user)
    }

    pub fn get(&self, id: UserId) -> LedgerResult<Option<User>> {
        self.storage.users.get(id)
    }

    pub fn get_by_email(&self, email: &str) -> LedgerResult<Option<User>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .storage
            .users
            .find(|u| u.email == needle)?
            .into_iter()
            .next())
    }

    /// Find by email or id
    pub fn resolve(&self, identifier: &str) -> LedgerResult<User> {
        if let Some(user) = self.get_by_email(identifier)? {
            return Ok(user);
        }
        resolve_record(&self.storage.users, identifier, "User")
    }

    pub fn list(&self) -> LedgerResult<Vec<User>> {
        let mut users = self.storage.users.get_all()?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    pub fn update(
        &self,
        id: UserId,
        display_name: Option<&str>,
        role: Option<Role>,
    ) -> LedgerResult<User> {
        let lock = self.storage.write_lock()?;
        let before = self
            .storage
            .users
            .get(id)?
            .ok_or_else(|| user_not_found(id.to_string()))?;

        let mut user = before.clone();
        if let Some(display_name) = display_name {
            user.display_name = display_name.trim().to_string();
        }
        if let Some(role) = role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        let op = lock.begin_operation("update_user", vec![id.key()])?;
        self.storage.users.upsert(user.clone())?;
        op.commit(&[Collection::Users])?;
        self.storage
            .publish(Collection::Users, ChangeKind::Updated, Some(id.key()));

        self.storage.log_update(
            EntityType::User,
            id.key(),
            Some(user.email.clone()),
            &before,
            &user,
        )?;

        Ok(user)
    }

    pub fn delete(&self, id: UserId) -> LedgerResult<User> {
        let lock = self.storage.write_lock()?;
        if !self.storage.users.exists(id)? {
            return Err(user_not_found(id.to_string()));
        }

        let op = lock.begin_operation("delete_user", vec![id.key()])?;
        let user = self
            .storage
            .users
            .remove(id)?
            .ok_or_else(|| user_not_found(id.to_string()))?;
        op.commit(&[Collection::Users])?;
        self.storage
            .publish(Collection::Users, ChangeKind::Removed, Some(id.key()));

        info!(user = %id, "user deleted");

        self.storage.log_delete(
            EntityType::User,
            id.key(),
            Some(user.email.clone()),
            &user,
        )?;

        Ok(user)
    }
}
