// ABOUTME: SQLite-backed credential store for tenant-scoped users and refresh tokens
// ABOUTME: Owns the connection pool, schema migrations, and transaction entry points
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! Every query in this module takes a [`TenantScope`](crate::tenant::TenantScope)
//! and filters by its tenant identifier. Records of one tenant are never
//! visible through another tenant's scope.

mod refresh_tokens;
/// Transaction guards
pub mod transactions;
mod users;

pub use transactions::{SqliteTransactionGuard, TransactionGuard};

pub(crate) use refresh_tokens::{consume_refresh_token, insert_refresh_token};
pub(crate) use users::{
    find_user_by_apple_sub, find_user_by_email, find_user_by_id, insert_user, link_apple_sub,
};

use crate::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Connection pool wrapper shared by every store operation
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect, creating the database file if needed, and run core migrations
    ///
    /// In-memory URLs get a single long-lived connection so that every query
    /// sees the same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or a migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).await.map_err(|e| {
                        AppError::database(format!(
                            "Failed to create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.migrate().await?;
        info!("Database initialized");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run core schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_refresh_tokens().await?;
        debug!("Core migrations applied");
        Ok(())
    }

    /// Begin a transaction that rolls back unless committed
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be acquired
    pub async fn begin(&self) -> AppResult<SqliteTransactionGuard<'static>> {
        Ok(TransactionGuard::new(self.pool.begin().await?))
    }

    /// Cheap liveness probe
    ///
    /// # Errors
    ///
    /// Returns an error if the database does not answer
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
