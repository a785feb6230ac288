//! `/api/auth`: sign-in, registration and session checks.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use karriery_shared::constants::{ADMIN_EMAIL, ADMIN_ID};
use karriery_shared::UserStatus;
use karriery_store::{GoogleProfile, NewUser, RecordStore, StoreError, User};

use crate::api::{authenticate, bearer_token, public_user, AppState};
use crate::error::ServerError;
use crate::lockout::client_ip;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthRequest {
    Login {
        email: String,
        password: String,
    },
    Register(NewUser),
    /// Sign in with the ID token Google issued to the browser.
    Google {
        #[serde(rename = "idToken")]
        id_token: String,
    },
    Verify,
    Logout,
}

pub async fn handle(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload?;

    match request {
        AuthRequest::Login { email, password } => {
            let email = email.trim().to_string();
            let client = client_ip(connect.as_ref(), &headers);
            if let Err(remaining) = state.sign_in.check(client, &email).await {
                return Err(ServerError::TooManyRequests(remaining.as_secs().max(1)));
            }

            let outcome = state.with_store(|store| store.authenticate_user(&email, &password))?;
            let user = match outcome {
                Ok(user) => user,
                Err(StoreError::InvalidCredentials) => {
                    state.sign_in.record_failure(client, &email).await;
                    return Err(StoreError::InvalidCredentials.into());
                }
                Err(e) => return Err(e.into()),
            };
            state.sign_in.record_success(client, &email).await;
            let token = state.sessions.issue(&user.id).await;
            info!(id = %user.id, "signed in");
            Ok(Json(json!({
                "success": true,
                "message": "Login successful",
                "user": public_user(user),
                "token": token,
            })))
        }

        AuthRequest::Register(mut data) => {
            data.name = data.name.trim().to_string();
            data.email = data.email.trim().to_string();
            if data.name.is_empty() || data.email.is_empty() {
                return Err(ServerError::BadRequest("Name and email are required".into()));
            }
            if data.password.as_deref().map_or(true, str::is_empty) {
                return Err(ServerError::BadRequest("Password is required".into()));
            }
            data.is_google_user = false;
            data.google_id = None;

            let user = state.with_store(|store| store.create_user(data))??;
            let token = state.sessions.issue(&user.id).await;
            Ok(Json(json!({
                "success": true,
                "message": "Registration successful",
                "user": public_user(user),
                "token": token,
            })))
        }

        AuthRequest::Google { id_token } => {
            if id_token.trim().is_empty() {
                return Err(ServerError::BadRequest("Google ID token is required".into()));
            }

            let profile = state.google.verify(id_token.trim()).await?;
            let user = state.with_store(|store| google_sign_in(store, &profile))??;
            if user.status == UserStatus::Inactive {
                return Err(StoreError::AccountInactive.into());
            }
            let token = state.sessions.issue(&user.id).await;
            info!(id = %user.id, "signed in with Google");
            Ok(Json(json!({
                "success": true,
                "message": "Login successful",
                "user": public_user(user),
                "token": token,
            })))
        }

        AuthRequest::Verify => {
            let caller = authenticate(&state, &headers).await?;
            Ok(Json(json!({
                "success": true,
                "user": public_user(caller.user),
            })))
        }

        AuthRequest::Logout => {
            let revoked = match bearer_token(&headers) {
                Some(token) => state.sessions.revoke(token).await,
                None => false,
            };
            Ok(Json(json!({
                "success": true,
                "message": "Logged out",
                "revoked": revoked,
            })))
        }
    }
}

/// Match an existing account, or register one from a verified profile.
///
/// The bootstrap admin only ever signs in with its password.
fn google_sign_in(store: &mut RecordStore, profile: &GoogleProfile) -> Result<User, ServerError> {
    let targets_admin = |email: &str, id: Option<&str>| email == ADMIN_EMAIL || id == Some(ADMIN_ID);
    let matched_admin = store
        .get_all_users()
        .iter()
        .filter(|u| u.google_id.as_deref() == Some(profile.id.as_str()) || u.email == profile.email)
        .any(|u| targets_admin(&u.email, Some(u.id.as_str())));
    if targets_admin(&profile.email, None) || matched_admin {
        warn!(sub = %profile.id, "Google sign-in refused for the bootstrap admin");
        return Err(StoreError::InvalidCredentials.into());
    }

    match store.authenticate_google_user(profile) {
        Some(user) => Ok(user),
        None => Ok(store.create_user(NewUser::from_google(profile))?),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::build_router;
    use crate::api::tests::{admin_token, call, google_state, register, test_state};

    #[tokio::test]
    async fn test_register_login_verify_logout() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;
        assert_eq!(token.len(), 64);

        let (status, body) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "login", "email": "ana@example.com", "password": "secret"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ana@example.com");
        assert!(body["user"].get("password").is_none());
        let login_token = body["token"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "/api/auth", Some(&login_token), json!({"action": "verify"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Ana");

        let (_, body) = call(&app, "/api/auth", Some(&login_token), json!({"action": "logout"})).await;
        assert_eq!(body["revoked"], true);

        let (status, _) = call(&app, "/api/auth", Some(&login_token), json!({"action": "verify"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // The registration session is independent.
        let (status, _) = call(&app, "/api/auth", Some(&token), json!({"action": "verify"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let app = build_router(test_state());
        register(&app, "Ana", "ana@example.com").await;

        let (status, body) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "login", "email": "ana@example.com", "password": "wrong"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let app = build_router(test_state());
        register(&app, "Ana", "ana@example.com").await;

        let (status, body) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "register", "name": "Other", "email": "ana@example.com", "password": "x"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_register_requires_password() {
        let app = build_router(test_state());
        let (status, _) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "register", "name": "Ana", "email": "ana@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn google(token: &str) -> serde_json::Value {
        json!({"action": "google", "idToken": token})
    }

    #[tokio::test]
    async fn test_google_sign_in_creates_then_matches() {
        let app = build_router(google_state().await);

        let (status, first) = call(&app, "/api/auth", None, google("token-gina")).await;
        assert_eq!(status, StatusCode::OK, "{first}");
        assert_eq!(first["user"]["isGoogleUser"], true);
        assert_eq!(first["user"]["email"], "gina@example.com");
        assert_eq!(first["user"]["profileImage"], "https://example.com/g.png");

        // same Google subject, new address: still the same account
        let (status, second) = call(&app, "/api/auth", None, google("token-gina-renamed")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["user"]["id"], second["user"]["id"]);
    }

    #[tokio::test]
    async fn test_google_sign_in_needs_a_verified_token() {
        let app = build_router(google_state().await);

        // a bare profile is not proof of identity
        let (status, _) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "google", "id": "attacker", "name": "x", "email": "admin"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for token in ["forged", "token-other-app", "token-unverified"] {
            let (status, body) = call(&app, "/api/auth", None, google(token)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{token}");
            assert!(body.get("token").is_none());
        }
    }

    #[tokio::test]
    async fn test_google_sign_in_never_reaches_bootstrap_admin() {
        let app = build_router(google_state().await);
        let (status, body) = call(&app, "/api/auth", None, google("token-admin")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());

        // password login for the admin is unaffected
        admin_token(&app).await;
    }

    #[tokio::test]
    async fn test_google_sign_in_disabled_without_client_id() {
        let app = build_router(test_state());
        let (status, _) = call(&app, "/api/auth", None, google("token-gina")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_google_sign_in_links_verified_email() {
        let app = build_router(google_state().await);
        let password_token = register(&app, "Ana", "ana@example.com").await;
        let (_, me) = call(&app, "/api/auth", Some(&password_token), json!({"action": "verify"})).await;

        let (status, body) = call(&app, "/api/auth", None, google("token-ana")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], me["user"]["id"]);
    }

    #[tokio::test]
    async fn test_repeated_failures_lock_out_one_client() {
        use axum::body::Body;
        use axum::http::{header, Request};

        use crate::api::tests::send;

        let app = build_router(test_state());
        register(&app, "Ana", "ana@example.com").await;

        let attempt = |ip: &'static str, password: &'static str| {
            Request::post("/api/auth")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", ip)
                .body(Body::from(
                    json!({"action": "login", "email": "ana@example.com", "password": password})
                        .to_string(),
                ))
                .unwrap()
        };

        // ServerConfig::default() allows five misses
        for _ in 0..5 {
            let (status, _) = send(&app, attempt("203.0.113.9", "guess")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, body) = send(&app, attempt("203.0.113.9", "secret")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);

        // the account itself stays reachable from elsewhere
        let (status, _) = send(&app, attempt("203.0.113.10", "secret")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_deactivated_account_cannot_sign_in() {
        let app = build_router(test_state());
        let user_token = register(&app, "Ana", "ana@example.com").await;
        let admin = admin_token(&app).await;

        let (_, me) = call(&app, "/api/auth", Some(&user_token), json!({"action": "verify"})).await;
        let id = me["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "/api/admin",
            Some(&admin),
            json!({"action": "change_status", "userId": id, "status": "inactive"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "login", "email": "ana@example.com", "password": "secret"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, "/api/auth", Some(&user_token), json!({"action": "verify"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
