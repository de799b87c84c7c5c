// ABOUTME: Tenant-scoped user storage operations
// ABOUTME: Handles creation, lookup by id/email/Apple subject, role changes, and deletion cascade
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{refresh_tokens, Database};
use crate::errors::{is_unique_violation, AppError, AppResult};
use crate::tenant::TenantScope;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;
use unified_core::models::{AuthProvider, User, UserRole};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, app_id, email, password_hash, apple_sub, auth_provider, role, \
                            display_name, created_at, updated_at, deleted_at";

impl Database {
    /// Create the users table and its tenant-scoped uniqueness indexes
    ///
    /// Uniqueness ignores soft-deleted rows so a deleted account's email can
    /// be registered again.
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                app_id TEXT NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL DEFAULT '',
                apple_sub TEXT,
                auth_provider TEXT NOT NULL DEFAULT 'password',
                role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                display_name TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_app_email \
             ON users(app_id, email) WHERE deleted_at IS NULL",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_app_apple_sub \
             ON users(app_id, apple_sub) WHERE apple_sub IS NOT NULL AND deleted_at IS NULL",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new user into the scoped tenant
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if the email (or Apple subject) is already in use in
    /// this tenant, or a database error
    pub async fn create_user(&self, scope: &TenantScope, user: &User) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, scope, user).await
    }

    /// Look up a live user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_by_id(&self, scope: &TenantScope, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_user_by_id(&mut conn, scope, id).await
    }

    /// Look up a live user by normalized email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_by_email(
        &self,
        scope: &TenantScope,
        email: &str,
    ) -> AppResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_user_by_email(&mut conn, scope, email).await
    }

    /// Look up a live user by Apple subject
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user_by_apple_sub(
        &self,
        scope: &TenantScope,
        apple_sub: &str,
    ) -> AppResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        find_user_by_apple_sub(&mut conn, scope, apple_sub).await
    }

    /// Change a user's role within the scoped tenant
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if no live user matches, or a database error
    pub async fn set_user_role(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        role: UserRole,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = ? \
             WHERE app_id = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(role.as_str())
        .bind(Utc::now())
        .bind(scope.tenant_id())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found());
        }
        Ok(())
    }

    /// Remove an account and everything it owns in one transaction
    ///
    /// Deletes the user's refresh tokens, then their rows in each of
    /// `user_tables` (which must have `app_id` and `user_id` columns), then
    /// soft-deletes the user. Nothing changes if any step fails.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if no live user matches, or a database error
    pub async fn delete_user_cascade(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        user_tables: &[&str],
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;

        refresh_tokens::delete_user_refresh_tokens(tx.executor()?, scope, user_id).await?;

        for table in user_tables {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE app_id = ? AND user_id = ?"
            ))
            .bind(scope.tenant_id())
            .bind(user_id.to_string())
            .execute(&mut *tx.executor()?)
            .await?;
        }

        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? \
             WHERE app_id = ? AND id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(scope.tenant_id())
        .bind(user_id.to_string())
        .execute(&mut *tx.executor()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found());
        }

        tx.commit().await?;
        info!(tenant_id = %scope, user_id = %user_id, "User account deleted");
        Ok(())
    }
}

/// Insert a user on an existing connection, typically inside a transaction
pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    user: &User,
) -> AppResult<()> {
    let result = sqlx::query(
        r"
        INSERT INTO users (id, app_id, email, password_hash, apple_sub, auth_provider, role,
                           display_name, created_at, updated_at, deleted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        ",
    )
    .bind(user.id.to_string())
    .bind(scope.tenant_id())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.apple_sub)
    .bind(user.auth_provider.as_str())
    .bind(user.role.as_str())
    .bind(&user.display_name)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(AppError::email_taken()),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn find_user_by_id(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    id: Uuid,
) -> AppResult<Option<User>> {
    find_user_where(conn, scope, "id", &id.to_string()).await
}

pub(crate) async fn find_user_by_email(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    email: &str,
) -> AppResult<Option<User>> {
    find_user_where(conn, scope, "email", email).await
}

pub(crate) async fn find_user_by_apple_sub(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    apple_sub: &str,
) -> AppResult<Option<User>> {
    find_user_where(conn, scope, "apple_sub", apple_sub).await
}

/// Attach an Apple subject to an existing account and mark it as Apple-authenticated
pub(crate) async fn link_apple_sub(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    user_id: Uuid,
    apple_sub: &str,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE users SET apple_sub = ?, auth_provider = ?, updated_at = ? \
         WHERE app_id = ? AND id = ? AND deleted_at IS NULL",
    )
    .bind(apple_sub)
    .bind(AuthProvider::Apple.as_str())
    .bind(Utc::now())
    .bind(scope.tenant_id())
    .bind(user_id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

// `column` is always one of the fixed names above, never caller input
async fn find_user_where(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    column: &str,
    value: &str,
) -> AppResult<Option<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE app_id = ? AND {column} = ? AND deleted_at IS NULL"
    );
    let row = sqlx::query(&sql)
        .bind(scope.tenant_id())
        .bind(value)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let id: String = row.try_get("id")?;
    let auth_provider: String = row.try_get("auth_provider")?;
    let role: String = row.try_get("role")?;
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;

    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::database(format!("Invalid user id {id}: {e}")))?,
        tenant_id: row.try_get("app_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        apple_sub: row.try_get("apple_sub")?,
        auth_provider: auth_provider.parse().map_err(AppError::database)?,
        role: role.parse().map_err(AppError::database)?,
        display_name: row.try_get("display_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at,
    })
}
