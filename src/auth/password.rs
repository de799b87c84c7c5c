// ABOUTME: Email + password account lifecycle: registration, login, and account deletion
// ABOUTME: bcrypt hashing runs on the blocking pool; login failures are indistinguishable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::tokens::{SessionPair, TokenIssuer};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::tenant::TenantScope;
use std::sync::Arc;
use tokio::task;
use tracing::info;
use unified_core::constants::auth::MIN_PASSWORD_LENGTH;
use unified_core::models::User;
use uuid::Uuid;

/// Registers, authenticates, and deletes password accounts
#[derive(Clone)]
pub struct PasswordAuthenticator {
    database: Database,
    tokens: Arc<TokenIssuer>,
    bcrypt_cost: u32,
    // Verified against when the email is unknown so both failure paths cost the same
    dummy_hash: Arc<str>,
    user_tables: Arc<[&'static str]>,
}

impl PasswordAuthenticator {
    /// Create an authenticator
    ///
    /// `user_tables` lists the extra tables purged when an account is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if `bcrypt_cost` is outside bcrypt's accepted range
    pub fn new(
        database: Database,
        tokens: Arc<TokenIssuer>,
        bcrypt_cost: u32,
        user_tables: Vec<&'static str>,
    ) -> AppResult<Self> {
        let dummy_hash = bcrypt::hash("timing-equalizer-not-a-password", bcrypt_cost)
            .map_err(|e| AppError::config(format!("Invalid bcrypt cost {bcrypt_cost}: {e}")))?;
        Ok(Self {
            database,
            tokens,
            bcrypt_cost,
            dummy_hash: Arc::from(dummy_hash),
            user_tables: Arc::from(user_tables),
        })
    }

    /// Create a password account in the scoped tenant
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed email or short password and
    /// `EmailTaken` if a live account already uses the email
    pub async fn register(
        &self,
        scope: &TenantScope,
        email: &str,
        password: &str,
    ) -> AppResult<User> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::invalid_input(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        if self.database.get_user_by_email(scope, &email).await?.is_some() {
            return Err(AppError::email_taken());
        }

        let password_hash = self.hash_password(password).await?;
        let user = User::new_password_user(scope.tenant_id(), email, password_hash);
        self.database.create_user(scope, &user).await?;

        info!(tenant_id = %scope, user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate with email and password and issue a session
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` with the same message whether the email
    /// is unknown or the password is wrong
    pub async fn login(
        &self,
        scope: &TenantScope,
        email: &str,
        password: &str,
    ) -> AppResult<SessionPair> {
        let email = normalize_email(email);
        let user = self.database.get_user_by_email(scope, &email).await?;

        let hash = user
            .as_ref()
            .filter(|user| user.has_password())
            .map_or_else(|| self.dummy_hash.to_string(), |user| user.password_hash.clone());
        let password_ok = verify_password(password, hash).await?;

        match user {
            Some(user) if password_ok && user.has_password() => {
                TenantLogger::log_auth_event(scope.tenant_id(), Some(user.id), "password", true, None);
                self.tokens.issue_pair(scope, &user).await
            }
            _ => {
                TenantLogger::log_auth_event(
                    scope.tenant_id(),
                    None,
                    "password",
                    false,
                    Some("invalid credentials"),
                );
                Err(AppError::invalid_credentials())
            }
        }
    }

    /// Delete an account after re-authentication
    ///
    /// Apple accounts skip the password check.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user is not in this tenant, `InvalidInput`
    /// if a password account supplies no password, and `InvalidCredentials`
    /// if the password is wrong
    pub async fn delete_account(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        password: Option<&str>,
    ) -> AppResult<()> {
        let user = self
            .database
            .get_user_by_id(scope, user_id)
            .await?
            .ok_or_else(AppError::user_not_found)?;

        if !user.is_apple_user() {
            let password = password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::invalid_input("Password is required"))?;
            if !user.has_password() || !verify_password(password, user.password_hash.clone()).await?
            {
                return Err(AppError::invalid_credentials());
            }
        }

        self.database
            .delete_user_cascade(scope, user_id, &self.user_tables)
            .await
    }

    async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing error: {e}")))
    }
}

async fn verify_password(password: &str, hash: String) -> AppResult<bool> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))
}

/// Trim and lowercase an email address
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Require `local@domain.tld`, rejecting the reserved `.invalid` TLD
///
/// # Errors
///
/// Returns `InvalidInput` if the address is malformed
pub fn validate_email(email: &str) -> AppResult<()> {
    let invalid = || AppError::invalid_input("Invalid email format");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    if labels.last().is_some_and(|tld| *tld == "invalid") {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("first.last@sub.example.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a@b@example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("001.abc@apple.invalid").is_err());
    }
}
