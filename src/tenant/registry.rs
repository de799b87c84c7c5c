// ABOUTME: Immutable registry of tenant applications loaded from a JSON file at startup
// ABOUTME: Answers existence, webhook-secret, identity-audience, and feature-flag queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::TenantScope;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Static configuration of one tenant application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Unique tenant identifier
    pub app_id: String,
    /// Human-readable name
    #[serde(default)]
    pub app_name: String,
    /// Expected `aud` of Apple identity tokens; empty means not configured
    #[serde(default)]
    pub bundle_id: String,
    /// Shared secret for billing webhooks
    #[serde(default)]
    pub revenuecat_webhook_auth: String,
    /// Feature flags
    #[serde(default)]
    pub features: HashMap<String, bool>,
    /// Descriptive only; not interpreted here
    #[serde(default)]
    pub ai_provider: String,
    /// Descriptive only; not interpreted here
    #[serde(default)]
    pub ai_config: BTreeMap<String, String>,
    /// Descriptive only; not interpreted here
    #[serde(default)]
    pub apple_client_ids: Vec<String>,
}

#[derive(Deserialize)]
struct AppsFile {
    apps: Vec<TenantConfig>,
}

/// Why the registry could not be built
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    /// File could not be read
    #[error("failed to read apps config {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// File is not valid JSON of the expected shape
    #[error("failed to parse apps config: {0}")]
    Parse(#[from] serde_json::Error),
    /// An entry has no identifier
    #[error("app entry {index} has an empty app_id")]
    EmptyAppId {
        /// Position in the `apps` array
        index: usize,
    },
    /// Two entries share an identifier
    #[error("duplicate app_id: {0}")]
    DuplicateAppId(String),
}

/// Read-only mapping from tenant identifier to configuration
///
/// Built once and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    apps: HashMap<String, TenantConfig>,
}

impl TenantRegistry {
    /// Load the registry from a `{"apps": [...]}` JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// `app_id` is empty or duplicated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryLoadError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| RegistryLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&data)?;
        info!(
            path = %path.display(),
            app_count = registry.len(),
            "Loaded tenant registry"
        );
        Ok(registry)
    }

    /// Build the registry from JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any `app_id` is empty or duplicated
    pub fn from_json(data: &str) -> Result<Self, RegistryLoadError> {
        let file: AppsFile = serde_json::from_str(data)?;
        Self::from_configs(file.apps)
    }

    /// Build the registry from already-parsed entries
    ///
    /// # Errors
    ///
    /// Returns an error if any `app_id` is empty or duplicated
    pub fn from_configs(configs: Vec<TenantConfig>) -> Result<Self, RegistryLoadError> {
        let mut apps = HashMap::with_capacity(configs.len());
        for (index, config) in configs.into_iter().enumerate() {
            if config.app_id.trim().is_empty() {
                return Err(RegistryLoadError::EmptyAppId { index });
            }
            if apps.contains_key(&config.app_id) {
                return Err(RegistryLoadError::DuplicateAppId(config.app_id));
            }
            apps.insert(config.app_id.clone(), config);
        }
        Ok(Self { apps })
    }

    /// Configuration for a tenant
    #[must_use]
    pub fn get(&self, app_id: &str) -> Option<&TenantConfig> {
        self.apps.get(app_id)
    }

    /// Whether a tenant is registered
    #[must_use]
    pub fn exists(&self, app_id: &str) -> bool {
        self.apps.contains_key(app_id)
    }

    /// Mint a scope for a registered tenant
    #[must_use]
    pub fn scope(&self, app_id: &str) -> Option<TenantScope> {
        self.apps.get(app_id).map(|config| TenantScope::new(&config.app_id))
    }

    /// Billing webhook secret, absent when unknown or empty
    #[must_use]
    pub fn webhook_secret(&self, app_id: &str) -> Option<&str> {
        self.get(app_id)
            .map(|config| config.revenuecat_webhook_auth.as_str())
            .filter(|secret| !secret.is_empty())
    }

    /// Expected Apple audience, absent when unknown or empty
    #[must_use]
    pub fn identity_audience(&self, app_id: &str) -> Option<&str> {
        self.get(app_id)
            .map(|config| config.bundle_id.as_str())
            .filter(|audience| !audience.is_empty())
    }

    /// Whether a tenant has a feature flag switched on
    #[must_use]
    pub fn has_feature(&self, app_id: &str, feature: &str) -> bool {
        self.get(app_id)
            .and_then(|config| config.features.get(feature))
            .copied()
            .unwrap_or(false)
    }

    /// All registered tenants, in no particular order
    pub fn all(&self) -> impl Iterator<Item = &TenantConfig> {
        self.apps.values()
    }

    /// Number of registered tenants
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether no tenants are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
