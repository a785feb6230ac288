//! `/api/contact`: the public contact form.
//!
//! No session is needed. When the request carries a valid bearer token the
//! message is linked to that account.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use karriery_store::NewContactRequest;

use crate::api::{authenticate, bearer_token, AppState};
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    name: String,
    email: String,
    message: String,
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(form) = payload?;
    let (name, email, message) = (form.name.trim(), form.email.trim(), form.message.trim());
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ServerError::BadRequest(
            "Name, email and message are required".into(),
        ));
    }

    // A stale token does not block the form.
    let user_id = match bearer_token(&headers) {
        Some(_) => authenticate(&state, &headers).await.ok().map(|c| c.user.id),
        None => None,
    };

    let request = state.with_store(|store| {
        store.create_contact_request(NewContactRequest {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            user_id,
        })
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
        "id": request.id,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::build_router;
    use crate::api::tests::{admin_token, call, register, test_state};

    fn form() -> serde_json::Value {
        json!({
            "name": "Ana",
            "email": "ana@example.com",
            "message": "Do you offer interview coaching?",
        })
    }

    #[tokio::test]
    async fn test_anonymous_and_signed_in_submissions() {
        let app = build_router(test_state());

        let (status, body) = call(&app, "/api/contact", None, form()).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Message sent successfully");

        let ana = register(&app, "Ana", "ana@example.com").await;
        let (status, _) = call(&app, "/api/contact", Some(&ana), form()).await;
        assert_eq!(status, StatusCode::OK);

        // an unknown token still gets the message through, unlinked
        let (status, _) = call(&app, "/api/contact", Some("stale"), form()).await;
        assert_eq!(status, StatusCode::OK);

        let admin = admin_token(&app).await;
        let (_, body) = call(&app, "/api/admin", Some(&admin), json!({"action": "contacts"})).await;
        let requests = body["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests.iter().filter(|r| !r["userId"].is_null()).count(),
            1
        );
        assert!(requests.iter().all(|r| r["status"] == "pending"));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let app = build_router(test_state());

        let (status, _) = call(
            &app,
            "/api/contact",
            None,
            json!({"name": "Ana", "email": "ana@example.com", "message": "  "}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "/api/contact", None, json!({"name": "Ana"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
