//! cardbank server binary
//!
//! Card issuance, card lookup and money transfers with balance
//! conservation, backed by Postgres.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardbank::api::{self, AppState};
use cardbank::bank::BankService;
use cardbank::store::PgStore;
use cardbank::{db, Config};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardbank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_router(pool: PgPool) -> Router {
    let store = Arc::new(PgStore::new(pool));
    let service: AppState = Arc::new(BankService::new(store.clone(), store));

    // Layers run outermost-last: logging wraps user resolution, both wrap
    // the handlers.
    let api_router = api::create_router()
        .layer(middleware::from_fn(api::middleware::current_user_middleware))
        .layer(middleware::from_fn(api::middleware::logging_middleware));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    let addr = config.bind_addr()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        anyhow::bail!("database schema incomplete, run the migrations first");
    }
    tracing::info!("database ready");

    let app = build_router(pool.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "cardbank listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
