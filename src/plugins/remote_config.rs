// ABOUTME: Per-tenant remote configuration plugin with typed values
// ABOUTME: Users read a typed key/value map; admins list, upsert, and delete keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::core::{FeaturePlugin, PluginContext, PluginRoutes};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::routes::AppJson;
use crate::tenant::{TenantRegistry, TenantScope};
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::Row;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

const MAX_KEY_LENGTH: usize = 100;

/// Declared type of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigValueType {
    /// Plain string
    #[default]
    String,
    /// `true` / `false`
    Bool,
    /// Signed 64-bit integer
    Int,
    /// Arbitrary JSON document
    Json,
}

impl ConfigValueType {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Json => "json",
        }
    }

    /// Decode a stored string into JSON; falls back to the raw string if it does not parse
    #[must_use]
    pub fn decode(self, raw: &str) -> Value {
        let parsed = match self {
            Self::String => None,
            Self::Bool => raw.trim().parse::<bool>().ok().map(Value::Bool),
            Self::Int => raw.trim().parse::<i64>().ok().map(Value::from),
            Self::Json => serde_json::from_str(raw).ok(),
        };
        parsed.unwrap_or_else(|| Value::String(raw.to_owned()))
    }

    /// Check that `raw` is a valid value of this type
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` describing the expected format
    pub fn validate(self, raw: &str) -> AppResult<()> {
        let ok = match self {
            Self::String => true,
            Self::Bool => raw.trim().parse::<bool>().is_ok(),
            Self::Int => raw.trim().parse::<i64>().is_ok(),
            Self::Json => serde_json::from_str::<Value>(raw).is_ok(),
        };
        if ok {
            Ok(())
        } else {
            Err(AppError::invalid_input(format!(
                "Value is not a valid {}",
                self.as_str()
            )))
        }
    }
}

impl Display for ConfigValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "" => Ok(Self::String),
            "bool" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown config value type: {other}")),
        }
    }
}

/// A stored configuration entry
#[derive(Debug, Clone, Serialize)]
pub struct RemoteConfigEntry {
    /// Tenant owning the entry
    pub app_id: String,
    /// Key, unique per tenant
    pub key: String,
    /// Raw stored value
    pub value: String,
    /// Declared type
    #[serde(rename = "type")]
    pub value_type: ConfigValueType,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SetConfigRequest {
    value: String,
    #[serde(rename = "type", default)]
    value_type: Option<String>,
}

/// Per-tenant remote configuration
pub struct RemoteConfigPlugin;

#[async_trait]
impl FeaturePlugin for RemoteConfigPlugin {
    fn id(&self) -> &'static str {
        "remote_config"
    }

    async fn migrate(&self, database: &Database) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS remote_configs (
                id TEXT PRIMARY KEY,
                app_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                value_type TEXT NOT NULL DEFAULT 'string',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (app_id, key)
            )
            ",
        )
        .execute(database.pool())
        .await?;
        Ok(())
    }

    async fn seed(&self, database: &Database, registry: &TenantRegistry) -> AppResult<()> {
        for app in registry.all() {
            let Some(scope) = registry.scope(&app.app_id) else {
                continue;
            };
            let app_name = if app.app_name.is_empty() {
                app.app_id.as_str()
            } else {
                app.app_name.as_str()
            };
            let defaults = [
                ("app_name", app_name, ConfigValueType::String),
                ("default_language", "en", ConfigValueType::String),
                (
                    "supported_languages",
                    "en,tr,de,fr,es,it,pt,ru,ar,zh",
                    ConfigValueType::String,
                ),
                ("maintenance_mode", "false", ConfigValueType::Bool),
                ("announcement_title", "", ConfigValueType::String),
                ("announcement_message", "", ConfigValueType::String),
            ];
            for (key, value, value_type) in defaults {
                insert_default(database, &scope, key, value, value_type).await?;
            }
        }
        Ok(())
    }

    fn exposes(&self, context: &PluginContext) -> PluginRoutes {
        let database = context.database.clone();

        let user = Router::new()
            .route("/config", get(get_config))
            .with_state(database.clone());

        let admin = Router::new()
            .route("/config", get(list_config))
            .route("/config/:key", put(set_config).delete(delete_config))
            .with_state(database);

        PluginRoutes {
            user: Some(user),
            admin: Some(admin),
        }
    }
}

/// Typed map of every key in the tenant
async fn get_config(
    State(database): State<Database>,
    scope: TenantScope,
) -> AppResult<Json<Map<String, Value>>> {
    let entries = list_entries(&database, &scope).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|entry| {
                let value = entry.value_type.decode(&entry.value);
                (entry.key, value)
            })
            .collect(),
    ))
}

async fn list_config(
    State(database): State<Database>,
    scope: TenantScope,
) -> AppResult<Json<Vec<RemoteConfigEntry>>> {
    Ok(Json(list_entries(&database, &scope).await?))
}

async fn set_config(
    State(database): State<Database>,
    scope: TenantScope,
    Path(key): Path<String>,
    AppJson(request): AppJson<SetConfigRequest>,
) -> AppResult<Json<Value>> {
    let key = key.trim().to_owned();
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(AppError::invalid_input("Key parameter is required"));
    }
    if request.value.is_empty() {
        return Err(AppError::invalid_input("Value is required"));
    }
    let value_type: ConfigValueType = request
        .value_type
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(AppError::invalid_input)?;
    value_type.validate(&request.value)?;

    let now = Utc::now();
    sqlx::query(
        r"
        INSERT INTO remote_configs (id, app_id, key, value, value_type, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (app_id, key) DO UPDATE
            SET value = excluded.value, value_type = excluded.value_type, updated_at = excluded.updated_at
        ",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(scope.tenant_id())
    .bind(&key)
    .bind(&request.value)
    .bind(value_type.as_str())
    .bind(now)
    .bind(now)
    .execute(database.pool())
    .await?;

    info!(tenant_id = %scope, key = %key, "Remote config updated");

    Ok(Json(json!({
        "message": "Config updated successfully",
        "config": {
            "app_id": scope.tenant_id(),
            "key": key,
            "value": request.value,
            "type": value_type,
        }
    })))
}

async fn delete_config(
    State(database): State<Database>,
    scope: TenantScope,
    Path(key): Path<String>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM remote_configs WHERE app_id = ? AND key = ?")
        .bind(scope.tenant_id())
        .bind(key.trim())
        .execute(database.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Config"));
    }

    info!(tenant_id = %scope, key = %key, "Remote config deleted");
    Ok(Json(json!({ "message": "Config deleted successfully" })))
}

async fn list_entries(database: &Database, scope: &TenantScope) -> AppResult<Vec<RemoteConfigEntry>> {
    let rows = sqlx::query(
        "SELECT app_id, key, value, value_type, updated_at FROM remote_configs \
         WHERE app_id = ? ORDER BY key",
    )
    .bind(scope.tenant_id())
    .fetch_all(database.pool())
    .await?;

    rows.iter()
        .map(|row| -> AppResult<RemoteConfigEntry> {
            let value_type: String = row.try_get("value_type")?;
            Ok(RemoteConfigEntry {
                app_id: row.try_get("app_id")?,
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                value_type: value_type.parse().map_err(AppError::database)?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

async fn insert_default(
    database: &Database,
    scope: &TenantScope,
    key: &str,
    value: &str,
    value_type: ConfigValueType,
) -> AppResult<()> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO remote_configs (id, app_id, key, value, value_type, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) ON CONFLICT (app_id, key) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(scope.tenant_id())
    .bind(key)
    .bind(value)
    .bind(value_type.as_str())
    .bind(now)
    .bind(now)
    .execute(database.pool())
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_typed_values() {
        assert_eq!(ConfigValueType::Bool.decode("true"), json!(true));
        assert_eq!(ConfigValueType::Int.decode("42"), json!(42));
        assert_eq!(ConfigValueType::Json.decode(r#"{"a":[1]}"#), json!({"a":[1]}));
        assert_eq!(ConfigValueType::String.decode("42"), json!("42"));
        assert_eq!(ConfigValueType::Int.decode("nope"), json!("nope"));
    }

    #[test]
    fn test_validate_and_parse_types() {
        assert!(ConfigValueType::Int.validate("12").is_ok());
        assert!(ConfigValueType::Int.validate("1.5").is_err());
        assert!(ConfigValueType::Bool.validate("yes").is_err());
        assert!(ConfigValueType::Json.validate("{").is_err());
        assert_eq!("".parse::<ConfigValueType>(), Ok(ConfigValueType::String));
        assert!("float".parse::<ConfigValueType>().is_err());
    }
}
