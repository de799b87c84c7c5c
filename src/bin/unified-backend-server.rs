// ABOUTME: Server binary for the unified multi-tenant identity backend
// ABOUTME: Loads configuration and the tenant registry, initializes plugins, and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Backend Server Binary
//!
//! Startup fails fast: a missing secret, an unreadable registry, or a
//! database that cannot be migrated stops the process before it binds.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use unified_backend::{
    config::ServerConfig, logging, plugins::PluginRegistry, resources::ServerResources, server,
    tenant::TenantRegistry,
};

#[derive(Parser)]
#[command(name = "unified-backend-server")]
#[command(about = "Unified Backend - multi-tenant identity API for mobile apps")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the apps registry file path
    #[arg(long)]
    apps_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http.port = http_port;
    }
    if let Some(apps_config) = args.apps_config {
        config.apps_config_path = apps_config;
    }

    info!("Starting Unified Backend");
    info!("{}", config.summary());

    let registry = TenantRegistry::load(&config.apps_config_path).with_context(|| {
        format!(
            "Failed to load apps registry from {}",
            config.apps_config_path.display()
        )
    })?;

    let resources =
        ServerResources::new(config, registry, PluginRegistry::with_builtin_plugins()).await?;

    if let Err(e) = server::run(resources).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
