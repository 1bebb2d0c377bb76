//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use clap::Parser;
use skillforge_engine::config::{Arguments, Configuration};
use skillforge_engine::events::TracingListener;
use skillforge_engine::{EngineHooks, ProgressionEngine, open_backend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load(&arguments.config_file).map_err(|e| {
        tracing::error!("Unable to load configuration file {}: {}", arguments.config_file, e);
        e
    })?;
    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting Skillforge progression engine...");

    let curve = config.curve();
    let settings = config.engine_settings();
    let registry = config.skill_registry();
    let spec = config.backend_spec()?;

    let backend = open_backend(&spec).await.map_err(|e| {
        tracing::error!("Failed to open persistence backend: {}", e);
        e
    })?;
    tracing::info!("Persistence backend {} ready", backend.name());

    let hooks = EngineHooks::default();
    hooks.listeners.subscribe(Arc::new(TracingListener));
    let engine = ProgressionEngine::start(settings, registry, curve, backend, hooks);
    tracing::info!(
        "Serving skills: {}",
        engine.registry().names().join(", ")
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, flushing actor state...");

    let report = engine.shutdown().await?;
    if report.failed.is_empty() {
        tracing::info!("Saved {} actor(s), shutdown complete", report.saved);
    } else {
        tracing::error!(
            "Saved {} actor(s), {} could not be written",
            report.saved,
            report.failed.len()
        );
    }
    Ok(())
}
