//! MCP Server entry point for Mailcal Orchestrator
//!
//! Starts the MCP server with stdio transport. Accounts come from a JSON
//! account file that is re-read whenever it changes; OAuth tokens are read
//! from the system keyring, where the external auth flow stores them.

mod adapters;
mod schemas;
mod server;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use adapters::{JsonFileConfigurationSource, KeyringTokenProvider};
use anyhow::Context;
use mailcal_orchestrator_core::{AccountRegistry, ConfigurationSource, ProviderResolver, ServiceContext};
use rmcp::ServiceExt;
use server::MailcalOrchestratorMcp;
use settings::Settings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing to stderr (MCP uses stdout for protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run(Settings::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("MCP server error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting Mailcal Orchestrator MCP Server");

    // Account source + registry
    let source = Arc::new(JsonFileConfigurationSource::new(&settings.accounts_file));
    tracing::info!("Account file: {}", source.path().display());
    let registry = Arc::new(AccountRegistry::new());
    if let Err(e) = registry.refresh(source.as_ref()).await {
        // 配置文件修复后由 watcher 重新加载
        tracing::error!("Failed to load accounts: {e}");
    }
    let _file_watcher = match source.watch_file() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!("Account file watcher unavailable, relying on polling: {e}");
            None
        }
    };
    let _poller = source.spawn_poller(settings.poll_interval);
    let _watcher = registry.watch(Arc::clone(&source) as Arc<dyn ConfigurationSource>);

    // Providers, one instance per backend type
    let resolver = Arc::new(ProviderResolver::new(Arc::new(KeyringTokenProvider::new())));

    let ctx = Arc::new(ServiceContext::new(
        Arc::clone(&registry),
        resolver,
        settings.orchestrator,
    ));

    let snapshot = registry.snapshot();
    tracing::info!(
        "Loaded {} account(s), {} enabled",
        snapshot.len(),
        snapshot.enabled().count()
    );

    let mcp_server = MailcalOrchestratorMcp::new(&ctx);

    // Start serving via stdio
    tracing::info!("Starting MCP server on stdio transport");
    let service = mcp_server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server")?;

    service.waiting().await.context("MCP server stopped")?;
    Ok(())
}
