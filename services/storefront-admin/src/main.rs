//! Storefront admin CLI
//!
//! Logs in against the storefront backend, keeps the session in a local
//! credential file, and drives products and orders through the
//! authenticated client. Expired access tokens are refreshed transparently;
//! a session that cannot be refreshed is cleared and reported.

mod cli;
mod commands;
mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_auth::FileCredentialStore;
use storefront_client::AuthenticatedHttpClient;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr keep stdout for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let location = Config::resolve_path(cli.config.as_deref());
    debug!(path = %location.path.display(), explicit = location.explicit, "loading configuration");
    let config = Config::load(&location)
        .with_context(|| format!("failed to load config from {}", location.path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        refresh_on_forbidden = config.api.refresh_on_forbidden,
        credential_file = %config.session.credential_file.display(),
        "configuration loaded"
    );

    let store = FileCredentialStore::load(config.session.credential_file.clone())
        .await
        .with_context(|| {
            format!(
                "failed to read session from {}",
                config.session.credential_file.display()
            )
        })?;

    let client = AuthenticatedHttpClient::builder(config.client_config())
        .credential_store(Arc::new(store))
        .logout_hook(|| warn!("session ended, stored credential removed"))
        .build()
        .context("failed to build API client")?;

    let output = commands::run(client, cli.command).await?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{rendered}");

    Ok(())
}
