use std::net::SocketAddr;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credmint::api::{self, middleware::state::AppState};
use credmint::config::Config;
use credmint::db;
use credmint::jobs;
use credmint::services::contracts::{EvmConfig, EvmContracts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credmint=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting credmint server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        chain = %config.chain_name,
        chain_id = config.chain_id,
        token_contract = %config.token_contract_address,
        "Configuration loaded successfully"
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let evm = EvmContracts::new(EvmConfig::from_config(&config))?;

    // Build application state
    let state = AppState::new(pool.clone(), config.clone(), evm);

    // Start the reconciler
    let _scheduler = jobs::start_scheduler(
        &config.reconcile_cron,
        state.store.clone(),
        state.ledger.clone(),
    )
    .await?;

    // Build router
    let app = api::router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let ip: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(ip, config.port);
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
