// SPDX-License-Identifier: MIT

//! Thin CRUD layer over the `users` table. The only place in the system that
//! ever sees a plaintext password; everything downstream of here only ever
//! sees a hash.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use reaper_core::model::{Permissions, User};
use reaper_storage::Store;

use crate::error::EngineResult;

/// Fields to change on an existing user. `None` leaves the field untouched;
/// `password` is plaintext in, hashed before it reaches the store.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub permissions: Option<Permissions>,
}

pub struct UserManager {
    store: Store,
}

impl UserManager {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, username: &str) -> EngineResult<Option<User>> {
        Ok(self.store.get_user(username).await?)
    }

    pub async fn list(&self) -> EngineResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn add(
        &self,
        username: &str,
        password: Option<&str>,
        permissions: Permissions,
    ) -> EngineResult<()> {
        if username.trim().is_empty() {
            return Err(crate::error::EngineError::validation("username must not be empty"));
        }
        let password_hash = password.map(hash_password).transpose()?;
        let user = User {
            username: username.to_string(),
            password_hash,
            permissions,
        };
        self.store.create_user(&user).await?;
        Ok(())
    }

    pub async fn update(&self, username: &str, update: UserUpdate) -> EngineResult<()> {
        let Some(mut user) = self.store.get_user(username).await? else {
            return Err(crate::error::EngineError::validation(format!(
                "user {username} does not exist"
            )));
        };
        if let Some(password) = update.password {
            user.password_hash = Some(hash_password(&password)?);
        }
        if let Some(permissions) = update.permissions {
            user.permissions = permissions;
        }
        self.store.update_user(&user).await?;
        Ok(())
    }

    /// The `admin` account cannot be deleted; the store enforces this too,
    /// but rejecting it here avoids a round-trip for the common case.
    pub async fn delete(&self, username: &str) -> EngineResult<bool> {
        if username == "admin" {
            return Err(crate::error::EngineError::validation(
                "the admin account cannot be deleted",
            ));
        }
        Ok(self.store.delete_user(username).await?)
    }
}

fn hash_password(password: &str) -> EngineResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
#[path = "user_manager_tests.rs"]
mod tests;
