use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prospector_api::clients::{OpenAiExtractor, TavilySearch};
use prospector_api::config::ServerConfig;
use prospector_api::router::build_app_router;
use prospector_api::state::AppState;
use prospector_db::repositories::ContractorRepo;
use prospector_engine::{EventBus, JobRegistry};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospector_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Record store ---
    let pool = prospector_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open the contractor database");
    prospector_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!(database_url = %config.database_url, "Database ready");

    // Merge any duplicates accumulated before the last shutdown.
    match ContractorRepo::cleanup_duplicates(&pool).await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "Startup duplicate cleanup finished"),
        Err(e) => tracing::error!(error = %e, "Startup duplicate cleanup failed"),
    }

    // --- Job engine ---
    let bus = Arc::new(EventBus::default());
    let registry = Arc::new(JobRegistry::new(bus));
    tracing::info!("Job registry created");

    // --- Capability clients ---
    let search = Arc::new(TavilySearch::new(
        std::env::var("TAVILY_API_KEY").unwrap_or_default(),
    ));
    let extractor = Arc::new(OpenAiExtractor::new(
        std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
    ));

    // --- App state & router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        registry,
        search,
        extractor,
    };
    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT combination");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolve when Ctrl-C (or SIGTERM on Unix) is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("Shutdown signal received");
}
