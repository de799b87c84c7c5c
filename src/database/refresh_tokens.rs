// ABOUTME: Tenant-scoped refresh token persistence storing only SHA-256 hashes of secrets
// ABOUTME: Provides insert, atomic consume-on-use, idempotent revoke, and per-user purge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::tenant::TenantScope;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use unified_core::models::RefreshTokenRecord;
use uuid::Uuid;

impl Database {
    /// Create the refresh token table
    pub(super) async fn migrate_refresh_tokens(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                id TEXT PRIMARY KEY,
                app_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                token_hash TEXT NOT NULL UNIQUE,
                expires_at INTEGER NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_app_user \
             ON refresh_tokens(app_id, user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a token record by hash regardless of its state
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_refresh_token(
        &self,
        scope: &TenantScope,
        token_hash: &str,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            "SELECT id, app_id, user_id, token_hash, expires_at, revoked, created_at \
             FROM refresh_tokens WHERE app_id = ? AND token_hash = ?",
        )
        .bind(scope.tenant_id())
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Mark a token revoked; unknown or already-revoked tokens are not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn revoke_refresh_token(
        &self,
        scope: &TenantScope,
        token_hash: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 \
             WHERE app_id = ? AND token_hash = ? AND revoked = 0",
        )
        .bind(scope.tenant_id())
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Persist a new, active token record
pub(crate) async fn insert_refresh_token(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, app_id, user_id, token_hash, expires_at, revoked, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(scope.tenant_id())
    .bind(user_id.to_string())
    .bind(token_hash)
    .bind(expires_at.timestamp())
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

/// Atomically revoke an active token and return it
///
/// The check and the revocation are one statement, so of two concurrent
/// callers presenting the same token at most one gets `Some`.
pub(crate) async fn consume_refresh_token(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    token_hash: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<RefreshTokenRecord>> {
    let row = sqlx::query(
        "UPDATE refresh_tokens SET revoked = 1 \
         WHERE app_id = ? AND token_hash = ? AND revoked = 0 AND expires_at > ? \
         RETURNING id, app_id, user_id, token_hash, expires_at, revoked, created_at",
    )
    .bind(scope.tenant_id())
    .bind(token_hash)
    .bind(now.timestamp())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Hard-delete every token a user holds in the tenant
pub(crate) async fn delete_user_refresh_tokens(
    conn: &mut SqliteConnection,
    scope: &TenantScope,
    user_id: Uuid,
) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE app_id = ? AND user_id = ?")
        .bind(scope.tenant_id())
        .bind(user_id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

fn row_to_record(row: &SqliteRow) -> AppResult<RefreshTokenRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let expires_at: i64 = row.try_get("expires_at")?;
    let revoked: i64 = row.try_get("revoked")?;

    Ok(RefreshTokenRecord {
        id: parse_id(&id)?,
        tenant_id: row.try_get("app_id")?,
        user_id: parse_id(&user_id)?,
        token_hash: row.try_get("token_hash")?,
        expires_at: DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| AppError::database(format!("Invalid expiry timestamp {expires_at}")))?,
        revoked: revoked != 0,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_id(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::database(format!("Invalid id {value}: {e}")))
}
