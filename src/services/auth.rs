//! Authentication service
//!
//! Password hashing and credential verification for the session layer.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::Result;

use crate::db::{DbPool, UserRepository};
use crate::models::User;
use crate::utils::AppResult;

pub struct AuthService<'a> {
    pool: &'a DbPool,
}

impl<'a> AuthService<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
    }

    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Check credentials; None on unknown user or wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let user = UserRepository::new(self.pool).get_by_username(username).await?;

        match user {
            Some(user) if Self::verify_password(password, &user.password_hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }
}
