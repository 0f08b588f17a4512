use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stockroom_catalog::{CatalogSource, SqliteCatalog};
use stockroom_core::Config;
use stockroom_gateway::GatewayServer;
use stockroom_llm::LlmProvider;
use stockroom_llm::openai::OpenAiProvider;
use stockroom_rag::InventoryAssistant;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(
    name = "stockroom",
    version,
    about = "Inventory backend answering questions about stored parts"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "STOCKROOM_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config = Config::load(&cli.config)?;
    config.validate()?;
    tracing::info!("loaded configuration from {}", cli.config.display());

    let catalog = open_catalog(&config.catalog.sqlite_path).await?;
    let provider = Arc::new(build_provider(&config)?);
    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        embedding_model = provider.embedding_model(),
        "llm provider configured"
    );
    let assistant = Arc::new(build_assistant(provider, catalog, &config));

    if config.index.refresh_on_startup {
        startup_refresh(&assistant).await;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        assistant,
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await
    .context("gateway stopped with an error")?;

    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn open_catalog(path: &str) -> anyhow::Result<Arc<dyn CatalogSource>> {
    if path != ":memory:"
        && let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create catalog directory {}", parent.display()))?;
    }
    let catalog = SqliteCatalog::new(path)
        .await
        .with_context(|| format!("failed to open catalog database {path}"))?;
    Ok(Arc::new(catalog))
}

fn build_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    let api_key = config
        .secrets
        .openai_api_key
        .as_ref()
        .context("STOCKROOM_OPENAI_API_KEY is not set")?;
    Ok(OpenAiProvider::new(
        api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        config.llm.embedding_model.clone(),
    ))
}

fn build_assistant<P: LlmProvider>(
    provider: Arc<P>,
    catalog: Arc<dyn CatalogSource>,
    config: &Config,
) -> InventoryAssistant<P> {
    InventoryAssistant::new(
        provider,
        catalog,
        config.index.builder(),
        config.index.assistant(),
    )
}

/// A failed startup build is logged, not fatal: the gateway still serves
/// status endpoints and `/refresh-embeddings` can be retried.
async fn startup_refresh<P: LlmProvider>(assistant: &InventoryAssistant<P>) {
    match assistant.refresh().await {
        Ok(snapshot) => tracing::info!(items = snapshot.len(), "startup index build complete"),
        Err(e) => tracing::error!("startup index build failed: {e}"),
    }
}
