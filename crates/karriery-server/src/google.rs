//! Google ID token verification.
//!
//! The browser hands the server the ID token it received from Google. The
//! token is checked against Google's tokeninfo endpoint, which validates the
//! signature and expiry; the audience, issuer and verified-email flag are
//! checked here. Only the resulting profile reaches the record store.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use karriery_store::GoogleProfile;

use crate::config::ServerConfig;
use crate::error::ServerError;

const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims returned by the tokeninfo endpoint. Google encodes most of them as
/// strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl TokenInfo {
    fn email_verified(&self) -> bool {
        match &self.email_verified {
            Some(Value::Bool(verified)) => *verified,
            Some(Value::String(verified)) => verified == "true",
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    pub fn new(config: &ServerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Google HTTP client setup failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            http,
            client_id: config.google_client_id.clone(),
            tokeninfo_url: config.google_tokeninfo_url.clone(),
        }
    }

    /// Resolve an ID token to the profile of its verified owner.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleProfile, ServerError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ServerError::Forbidden("Google sign-in is not enabled".into()))?;

        let resp = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| ServerError::Internal(format!("Google token check failed: {e}")))?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "Google rejected the ID token");
            return Err(rejected());
        }

        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| ServerError::Internal(format!("unreadable Google token info: {e}")))?;

        if info.aud != client_id {
            warn!(aud = %info.aud, "Google ID token issued for another client");
            return Err(rejected());
        }
        if !ISSUERS.contains(&info.iss.as_str()) {
            warn!(iss = %info.iss, "Google ID token from unexpected issuer");
            return Err(rejected());
        }
        if !info.email_verified() {
            return Err(ServerError::Unauthorized(
                "Google account email is not verified".into(),
            ));
        }
        let email = match info.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => return Err(rejected()),
        };

        Ok(GoogleProfile {
            id: info.sub,
            name: info.name.unwrap_or_else(|| email.clone()),
            email,
            picture: info.picture,
        })
    }
}

fn rejected() -> ServerError {
    ServerError::Unauthorized("Invalid Google token".into())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    pub(crate) const CLIENT_ID: &str = "karriery-test.apps.googleusercontent.com";

    fn claims(sub: &str, email: &str) -> Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": CLIENT_ID,
            "sub": sub,
            "email": email,
            "email_verified": "true",
            "name": "Gina",
            "picture": "https://example.com/g.png",
        })
    }

    async fn tokeninfo(Query(query): Query<HashMap<String, String>>) -> Response {
        let token = query.get("id_token").map(String::as_str).unwrap_or_default();
        let body = match token {
            "token-gina" => claims("g-123", "gina@example.com"),
            "token-gina-renamed" => claims("g-123", "gina.new@example.com"),
            "token-ana" => claims("g-ana", "ana@example.com"),
            "token-admin" => claims("g-admin", "admin"),
            "token-other-app" => {
                let mut body = claims("g-123", "gina@example.com");
                body["aud"] = json!("someone-else.apps.googleusercontent.com");
                body
            }
            "token-unverified" => {
                let mut body = claims("g-456", "new@example.com");
                body["email_verified"] = json!("false");
                body
            }
            _ => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_token"})),
                )
                    .into_response()
            }
        };
        Json(body).into_response()
    }

    /// Local stand-in for Google's tokeninfo endpoint. Returns its URL.
    pub(crate) async fn spawn_tokeninfo() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/tokeninfo", get(tokeninfo));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/tokeninfo")
    }

    async fn verifier() -> GoogleVerifier {
        GoogleVerifier::new(&ServerConfig {
            google_client_id: Some(CLIENT_ID.to_string()),
            google_tokeninfo_url: spawn_tokeninfo().await,
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_valid_token_yields_profile() {
        let profile = verifier().await.verify("token-gina").await.unwrap();
        assert_eq!(profile.id, "g-123");
        assert_eq!(profile.email, "gina@example.com");
        assert_eq!(profile.name, "Gina");
        assert_eq!(profile.picture.as_deref(), Some("https://example.com/g.png"));
    }

    #[tokio::test]
    async fn test_rejected_tokens() {
        let verifier = verifier().await;
        for token in ["forged", "token-other-app", "token-unverified"] {
            let err = verifier.verify(token).await.unwrap_err();
            assert!(matches!(err, ServerError::Unauthorized(_)), "{token}: {err}");
        }
    }

    #[tokio::test]
    async fn test_disabled_without_client_id() {
        let verifier = GoogleVerifier::new(&ServerConfig::default());
        assert!(matches!(
            verifier.verify("token-gina").await,
            Err(ServerError::Forbidden(_))
        ));
    }
}
