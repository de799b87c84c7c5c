// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into a typed ServerConfig passed down at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use unified_core::constants::{apple, auth};
use zeroize::Zeroizing;

/// Environment type for security and other configurations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Session credential configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: Zeroizing<String>,
    /// Access token lifetime
    pub access_token_ttl: chrono::Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: chrono::Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Debug for AuthConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AuthConfig {
    /// Build a config around a secret with default lifetimes
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Zeroizing::new(secret.into()),
            access_token_ttl: chrono::Duration::minutes(auth::DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_ttl: chrono::Duration::days(auth::DEFAULT_REFRESH_TOKEN_DAYS),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Administrative access configuration
#[derive(Clone, Default)]
pub struct AdminConfig {
    /// Lowercased allow-listed emails
    pub emails: Vec<String>,
    /// Allow-listed user identifiers
    pub user_ids: Vec<String>,
    /// Static admin token, disabled when absent
    pub token: Option<Zeroizing<String>>,
}

impl Debug for AdminConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AdminConfig")
            .field("emails", &self.emails)
            .field("user_ids", &self.user_ids)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Apple identity key source configuration
#[derive(Debug, Clone)]
pub struct AppleConfig {
    /// JWKS endpoint
    pub jwks_url: String,
    /// How long fetched keys are trusted
    pub key_cache_ttl: Duration,
    /// Upper bound on a single key fetch
    pub fetch_timeout: Duration,
}

impl Default for AppleConfig {
    fn default() -> Self {
        Self {
            jwks_url: apple::JWKS_URL.to_owned(),
            key_cache_ttl: Duration::from_secs(apple::DEFAULT_KEY_CACHE_TTL_SECS),
            fetch_timeout: Duration::from_secs(apple::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Listen port
    pub port: u16,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
    /// Public auth route budget per client per minute, 0 disables
    pub auth_rate_limit_per_minute: u32,
    /// Key rate limiting on the first `X-Forwarded-For` hop instead of the peer
    ///
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// sqlx connection URL
    pub database_url: String,
    /// Path of the tenant registry JSON file
    pub apps_config_path: PathBuf,
    /// HTTP listener settings
    pub http: HttpConfig,
    /// Session credential settings
    pub auth: AuthConfig,
    /// Admin authorization settings
    pub admin: AdminConfig,
    /// Apple identity settings
    pub apple: AppleConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or any numeric variable fails to parse
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            bail!("JWT_SECRET must be set");
        }

        let port = match env::var("HTTP_PORT").or_else(|_| env::var("PORT")) {
            Ok(value) => value.parse().context("Invalid HTTP_PORT value")?,
            Err(_) => 8080,
        };

        let config = Self {
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            database_url: env_var_or("DATABASE_URL", "sqlite:./data/unified.db"),
            apps_config_path: PathBuf::from(env_var_or("APPS_CONFIG_PATH", "apps.json")),
            http: HttpConfig {
                port,
                cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")),
                auth_rate_limit_per_minute: env_var_or(
                    "AUTH_RATE_LIMIT_PER_MINUTE",
                    &auth::DEFAULT_AUTH_RATE_LIMIT_PER_MINUTE.to_string(),
                )
                .parse()
                .context("Invalid AUTH_RATE_LIMIT_PER_MINUTE value")?,
                trust_forwarded_for: parse_flag(&env_var_or("TRUST_FORWARDED_FOR", "false"))
                    .context("Invalid TRUST_FORWARDED_FOR value")?,
            },
            auth: AuthConfig {
                jwt_secret: Zeroizing::new(jwt_secret),
                access_token_ttl: chrono::Duration::minutes(
                    env_var_or(
                        "JWT_ACCESS_EXPIRY_MINUTES",
                        &auth::DEFAULT_ACCESS_TOKEN_MINUTES.to_string(),
                    )
                    .parse()
                    .context("Invalid JWT_ACCESS_EXPIRY_MINUTES value")?,
                ),
                refresh_token_ttl: chrono::Duration::days(
                    env_var_or(
                        "JWT_REFRESH_EXPIRY_DAYS",
                        &auth::DEFAULT_REFRESH_TOKEN_DAYS.to_string(),
                    )
                    .parse()
                    .context("Invalid JWT_REFRESH_EXPIRY_DAYS value")?,
                ),
                bcrypt_cost: env_var_or("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())
                    .parse()
                    .context("Invalid BCRYPT_COST value")?,
            },
            admin: AdminConfig {
                emails: parse_csv(&env_var_or("ADMIN_EMAILS", ""))
                    .into_iter()
                    .map(|email| email.to_lowercase())
                    .collect(),
                user_ids: parse_csv(&env_var_or("ADMIN_USER_IDS", "")),
                token: env::var("ADMIN_TOKEN")
                    .ok()
                    .filter(|token| !token.is_empty())
                    .map(Zeroizing::new),
            },
            apple: AppleConfig {
                jwks_url: env_var_or("APPLE_JWKS_URL", apple::JWKS_URL),
                key_cache_ttl: Duration::from_secs(
                    env_var_or(
                        "APPLE_JWKS_CACHE_TTL_SECS",
                        &apple::DEFAULT_KEY_CACHE_TTL_SECS.to_string(),
                    )
                    .parse()
                    .context("Invalid APPLE_JWKS_CACHE_TTL_SECS value")?,
                ),
                fetch_timeout: Duration::from_secs(
                    env_var_or(
                        "APPLE_JWKS_TIMEOUT_SECS",
                        &apple::DEFAULT_FETCH_TIMEOUT_SECS.to_string(),
                    )
                    .parse()
                    .context("Invalid APPLE_JWKS_TIMEOUT_SECS value")?,
                ),
            },
        };

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Unified Backend Configuration:\n\
             - Environment: {}\n\
             - HTTP Port: {}\n\
             - Apps Config: {}\n\
             - Access TTL: {} min\n\
             - Refresh TTL: {} days\n\
             - Admin Token: {}\n\
             - Auth Rate Limit: {}",
            self.environment,
            self.http.port,
            self.apps_config_path.display(),
            self.auth.access_token_ttl.num_minutes(),
            self.auth.refresh_token_ttl.num_days(),
            if self.admin.token.is_some() {
                "Enabled"
            } else {
                "Disabled"
            },
            if self.http.auth_rate_limit_per_minute == 0 {
                "Disabled".to_owned()
            } else {
                format!("{}/min", self.http.auth_rate_limit_per_minute)
            },
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse a boolean switch such as `true`, `1`, `no`
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

/// Parse a comma-separated list, dropping blanks
pub(crate) fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        parse_csv(origins_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv() {
        assert_eq!(
            parse_csv(" a@x.com, B@x.com ,,"),
            vec!["a@x.com", "B@x.com"]
        );
        assert_eq!(parse_csv(""), Vec::<String>::new());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("sometimes").is_err());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000,https://app.example.com"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("whatever"),
            Environment::Development
        );
    }

    #[test]
    fn test_auth_config_debug_hides_secret() {
        let config = AuthConfig::with_secret("super-secret-value");
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
