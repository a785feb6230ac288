//! # karriery-server
//!
//! HTTP front end for the Karriery record store.
//!
//! This binary provides:
//! - **Sign-in** with email/password or a verified Google ID token, issuing
//!   bearer session tokens kept in memory
//! - **Profile** endpoints for the signed-in user (profile, preferences,
//!   password, notifications, data export)
//! - **Support tickets** with owner and staff reply threads
//! - **Contact form** open to visitors, triaged from the admin dashboard
//! - **Admin dashboard** actions (statistics, user management, ticket
//!   status, contact requests, bulk export/import)
//! - **Lockout** of a client after repeated failed logins for one email

mod account;
mod admin;
mod api;
mod auth;
mod config;
mod contact;
mod error;
mod google;
mod lockout;
mod session;
mod support;

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use karriery_store::RecordStore;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,karriery_server=debug,karriery_store=debug")
            }),
        )
        .init();

    info!("Starting Karriery server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the record store (seeds collections and the bootstrap admin)
    // -----------------------------------------------------------------------
    let options = config.store_options();
    let store = match &config.data_path {
        Some(path) => RecordStore::open_at(path, options)?,
        None => RecordStore::open_default(options)?,
    };
    let stats = store.get_statistics();
    info!(
        users = stats.total_users,
        tickets = stats.total_tickets,
        "Record store ready"
    );

    let http_addr = config.http_addr;
    let app_state = AppState::new(store, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Expired sessions (every 10 minutes)
    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            sessions.purge_expired().await;
        }
    });

    // Failed-login counters (every 5 minutes, forget pairs idle >1 hour)
    let sign_in = app_state.sign_in.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            sign_in.purge_stale(Duration::from_secs(3600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
