use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use followtrack_core::config::redact_url;
use followtrack_core::{
    load_config, validate_config, EgressPool, IdentityPool, JobContext, MarkerPatternExtractor,
    PollScheduler, ProfileFetcher, RedisStore, ReqwestTransport, ResultWriter, TargetRegistry,
};
use followtrack_server::api::create_router;
use followtrack_server::state::{config_fingerprint, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("FOLLOWTRACK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        config_hash = %config_fingerprint(&config),
        user_agents = config.fetcher.user_agents.len(),
        proxies = config.fetcher.proxies.len(),
        "Configuration loaded successfully"
    );

    // Connect to the store (registry + writer share one connection)
    let store = Arc::new(
        RedisStore::connect(&config.store)
            .await
            .with_context(|| format!("Failed to connect to {}", redact_url(&config.store.url)))?,
    );
    info!(
        url = %redact_url(&config.store.url),
        targets_key = store.targets_key(),
        "Connected to store"
    );

    // Build the fetch pipeline
    let transport = ReqwestTransport::new(Duration::from_secs(config.fetcher.timeout_secs.into()))
        .context("Failed to create HTTP transport")?;
    let fetcher = ProfileFetcher::new(
        config.fetcher.profile_base_url.clone(),
        Arc::new(transport),
        Arc::new(MarkerPatternExtractor::profile_page()),
    );

    let context = JobContext::new(
        Arc::new(fetcher),
        Arc::clone(&store) as Arc<dyn ResultWriter>,
        IdentityPool::new(config.fetcher.user_agents.iter().cloned()),
        EgressPool::new(config.fetcher.proxies.iter().cloned()),
    );

    let scheduler = Arc::new(PollScheduler::new(
        config.scheduler.clone(),
        store as Arc<dyn TargetRegistry>,
        context,
    ));

    // Initial target load failure is fatal
    let jobs = scheduler
        .start()
        .await
        .context("Failed to start poll scheduler")?;
    info!(jobs, "Poll scheduler running");

    if config.server.enabled {
        let state = Arc::new(AppState::new(config.clone(), Arc::clone(&scheduler)));
        let app = create_router(state);

        let addr = SocketAddr::new(config.server.host, config.server.port);
        info!("Starting observability server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;
    } else {
        shutdown_signal().await;
    }

    info!("Shutdown requested, please wait for correct exit");
    scheduler.stop().await;
    info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
