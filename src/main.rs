// src/main.rs
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod accounts;
mod app;
mod auth;
mod common;
mod logging_middleware;
mod policies;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::password::PasswordHasher;
use auth::tokens::TokenIssuer;
use auth::AuthService;
use common::config::EmailTransport;
use common::migrations::{run_migrations, seed_default_policies};
use common::{AppConfig, AppState};
use services::{EmailService, GoogleVerifier, LogTransport, MailTransport, SesTransport};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = Arc::new(AppConfig::from_env()?);
    info!(
        port = config.port,
        complexity = ?config.password_complexity,
        transport = ?config.email_transport,
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    if config.reset_db {
        warn!("RESET_DB is set, dropping all tables");
    }
    run_migrations(&pool, config.reset_db).await?;

    if config.seed_policies {
        let seeded = seed_default_policies(&pool).await?;
        if seeded > 0 {
            info!(seeded, "Default policies seeded");
        }
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let transport: Arc<dyn MailTransport> = match config.email_transport {
        EmailTransport::Ses => Arc::new(SesTransport::new(config.ses_region.clone()).await),
        EmailTransport::Log => {
            warn!("EMAIL_TRANSPORT=log, outgoing email is only logged");
            Arc::new(LogTransport)
        }
    };
    let emails = Arc::new(EmailService::from_config(transport, &config));
    info!("EmailService initialized");

    let http_client = Client::builder().no_proxy().build()?;
    if config.google_client_id.is_none() {
        warn!("GOOGLE_CLIENT_ID not set, Google token audience is not checked");
    }
    let google = Arc::new(GoogleVerifier::new(
        http_client,
        config.google_client_id.clone(),
    ));
    info!("GoogleVerifier initialized");

    let tokens = Arc::new(TokenIssuer::new(&config.tokens));
    let auth_service = Arc::new(AuthService::new(
        pool.clone(),
        tokens.clone(),
        PasswordHasher::default(),
        config.password_complexity,
        emails,
        google,
    ));
    info!("AuthService initialized");

    let state = Arc::new(AppState {
        db: pool.clone(),
        config: config.clone(),
        tokens,
        auth: auth_service,
    });

    let app = app::build_router(state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
