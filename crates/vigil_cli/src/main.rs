use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_advisory::{HttpAdvisor, MockAdvisor};
use vigil_core::{
    AdvisoryGenerator, MonotonicClock, NotificationDispatcher, ProfileStore, RecordStore,
    VigilConfig,
};
use vigil_gateway::GatewayServer;
use vigil_notify::{LogDispatcher, WebhookDispatcher};
use vigil_store::{MemoryProfileStore, MemoryRecordStore, SqliteProfileStore, SqliteRecordStore};
use vigil_triage::TriageEngine;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "vigil.toml")]
    config: String,

    /// Override the gateway bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the gateway bind port
    #[arg(long, env = "VIGIL_GATEWAY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let args = Args::parse();

    let mut config = VigilConfig::load_or_default(&args.config);
    if let Some(host) = args.host {
        config.gateway.host = host;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    let (records, profiles): (Arc<dyn RecordStore>, Arc<dyn ProfileStore>) =
        match &config.store.db_path {
            Some(path) => {
                info!("Opening SQLite store at {}", path);
                let records = SqliteRecordStore::new(path).await?;
                let profiles = SqliteProfileStore::with_pool(records.pool()).await?;
                (Arc::new(records), Arc::new(profiles))
            }
            None => {
                warn!("No db_path configured, using in-memory stores (state is lost on restart)");
                (
                    Arc::new(MemoryRecordStore::new()),
                    Arc::new(MemoryProfileStore::new()),
                )
            }
        };

    let advisor: Arc<dyn AdvisoryGenerator> = match config.advisory.provider.as_str() {
        "http" => {
            info!(
                "Using HTTP advisory provider, model {}",
                config.advisory.model
            );
            Arc::new(HttpAdvisor::new(
                config.advisory.base_url.as_deref(),
                &config.advisory.model,
                config.advisory.max_tokens,
            )?)
        }
        "mock" => Arc::new(MockAdvisor::new()),
        other => {
            warn!("Unknown advisory provider '{}', using mock", other);
            Arc::new(MockAdvisor::new())
        }
    };

    let notifier: Arc<dyn NotificationDispatcher> = match &config.notify.webhook_url {
        Some(url) => {
            info!("Emergency alerts will be POSTed to the configured webhook");
            Arc::new(WebhookDispatcher::new(url)?)
        }
        None => {
            warn!("No webhook_url configured, emergency alerts will only be logged");
            Arc::new(LogDispatcher::new())
        }
    };

    let engine = Arc::new(TriageEngine::new(
        records,
        profiles,
        advisor,
        notifier,
        Arc::new(MonotonicClock::new()),
        config.triage.clone(),
    ));

    let server = GatewayServer::new(engine, &config.gateway.host, config.gateway.port);
    let handle = server.start();
    info!(
        "Vigil online at {}:{}",
        config.gateway.host, config.gateway.port
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = handle => {
            warn!("Gateway task exited");
        }
    }

    Ok(())
}
