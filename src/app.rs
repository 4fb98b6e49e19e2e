/*
 * Responsibility
 * - Config読み込み → 依存生成 (drink store, JWKS-backed verifier) → Router 組み立て
 * - Middleware の適用 (security headers / CORS / HTTP)
 * - axum::serve() で起動、graceful shutdown 後に pool を閉じる
 */
use std::{panic, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::{DrinkStore, MemoryDrinkStore, PgDrinkStore},
    services::auth::build_auth_service,
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG wins; e.g. RUST_LOG=info,drinks_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook();

    tracing::info!(
        "starting drinks API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let drinks = state.drinks.clone();
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drinks.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let drinks: Arc<dyn DrinkStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgDrinkStore::connect(url, config.database_max_connections, config.database_timeout)
                .await
                .context("failed to connect to the database")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set: drinks are kept in memory");
            Arc::new(MemoryDrinkStore::new())
        }
    };

    if config.database_reset_on_start {
        drinks.reset().await.context("failed to reset drinks")?;
        tracing::warn!(backend = drinks.backend_name(), "drinks reset to seed data");
    }

    let auth = build_auth_service(config).context("invalid JWKS configuration")?;
    tracing::info!(
        backend = drinks.backend_name(),
        jwks_url = %config.auth_jwks_url,
        "dependencies ready"
    );

    Ok(AppState::new(drinks, auth))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(&state)
        .fallback(api::not_found)
        .method_not_allowed_fallback(api::method_not_allowed)
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
