use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use karriery_store::{RecordStore, SiteSettings, User};
use karriery_shared::UserStatus;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::google::GoogleVerifier;
use crate::lockout::SignInGuard;
use crate::session::SessionRegistry;
use crate::{account, admin, auth, contact, support};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<RecordStore>>,
    pub sessions: SessionRegistry,
    pub sign_in: SignInGuard,
    pub google: GoogleVerifier,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: RecordStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            sessions: SessionRegistry::new(config.session_ttl_hours),
            sign_in: SignInGuard::new(config.auth_max_failures, config.auth_lockout),
            google: GoogleVerifier::new(&config),
            config: Arc::new(config),
        }
    }

    /// Run `f` with exclusive access to the record store.
    ///
    /// The guard never crosses an `.await`.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut RecordStore) -> T) -> Result<T, ServerError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| ServerError::Internal("record store lock poisoned".into()))?;
        Ok(f(&mut store))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(site_info))
        .route("/api/auth", post(auth::handle))
        .route("/api/contact", post(contact::handle))
        .route("/api/profile", post(account::handle))
        .route("/api/tickets", post(support::handle))
        .route("/api/admin", post(admin::handle))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteInfoResponse {
    success: bool,
    settings: SiteSettings,
    server_version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn site_info(State(state): State<AppState>) -> Result<Json<SiteInfoResponse>, ServerError> {
    let settings = state.with_store(|store| store.get_settings())?;
    Ok(Json(SiteInfoResponse {
        success: true,
        settings,
        server_version: env!("CARGO_PKG_VERSION"),
    }))
}

// ─── Session helpers ───

/// The signed-in account behind a request.
pub struct Caller {
    pub user: User,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the bearer token to a live, active account.
///
/// Sessions whose account has disappeared or been deactivated are revoked on
/// the spot.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Caller, ServerError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?
        .to_string();

    let session = state
        .sessions
        .resolve(&token)
        .await
        .ok_or_else(|| ServerError::Unauthorized("Session expired or unknown".into()))?;

    let user = state.with_store(|store| store.get_user(&session.user_id))?;
    let Some(user) = user else {
        state.sessions.revoke(&token).await;
        return Err(ServerError::Unauthorized("Account no longer exists".into()));
    };

    if user.status == UserStatus::Inactive {
        state.sessions.revoke(&token).await;
        return Err(ServerError::Forbidden("Account is deactivated".into()));
    }

    Ok(Caller { user })
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Caller, ServerError> {
    let caller = authenticate(state, headers).await?;
    if !caller.user.role.is_admin() {
        return Err(ServerError::Forbidden("Administrator access required".into()));
    }
    Ok(caller)
}

/// Strip the stored credential before a record leaves the server.
pub fn public_user(mut user: User) -> User {
    user.password = None;
    user
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
