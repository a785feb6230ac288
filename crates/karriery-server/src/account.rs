//! `/api/profile`: the signed-in user's own record.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use karriery_shared::credential::verify_password;
use karriery_store::{PreferencesPatch, ProfilePatch};

use crate::api::{authenticate, public_user, AppState};
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProfileRequest {
    Get,
    UpdateProfile {
        profile: ProfilePatch,
    },
    UpdatePreferences {
        preferences: PreferencesPatch,
    },
    ChangePassword {
        #[serde(default)]
        current_password: Option<String>,
        new_password: String,
    },
    Export,
    Notifications,
    MarkNotificationRead {
        notification_id: String,
    },
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload?;
    let caller = authenticate(&state, &headers).await?;
    let id = caller.user.id.clone();

    match request {
        ProfileRequest::Get => Ok(Json(json!({
            "success": true,
            "user": public_user(caller.user),
        }))),

        ProfileRequest::UpdateProfile { profile } => {
            let user = state
                .with_store(|store| store.update_user_profile(&id, profile))?
                .ok_or_else(|| ServerError::Internal("profile update was not saved".into()))?;
            Ok(Json(json!({
                "success": true,
                "message": "Profile updated",
                "user": public_user(user),
            })))
        }

        ProfileRequest::UpdatePreferences { preferences } => {
            let user = state
                .with_store(|store| store.update_user_preferences(&id, preferences))?
                .ok_or_else(|| ServerError::Internal("preferences update was not saved".into()))?;
            Ok(Json(json!({
                "success": true,
                "message": "Preferences updated",
                "preferences": user.preferences,
            })))
        }

        ProfileRequest::ChangePassword {
            current_password,
            new_password,
        } => {
            if new_password.is_empty() {
                return Err(ServerError::BadRequest("New password must not be empty".into()));
            }
            // Accounts created through Google have no credential to confirm.
            if let Some(stored) = caller.user.password.as_deref() {
                let current = current_password.unwrap_or_default();
                if !verify_password(stored, &current).unwrap_or(false) {
                    return Err(ServerError::Forbidden("Current password is incorrect".into()));
                }
            }

            if !state.with_store(|store| store.change_password(&id, &new_password))? {
                return Err(ServerError::Internal("password change was not saved".into()));
            }
            Ok(Json(json!({
                "success": true,
                "message": "Password changed",
            })))
        }

        ProfileRequest::Export => {
            let raw = state
                .with_store(|store| store.export_user_data(&id))?
                .ok_or_else(|| ServerError::Internal("user export failed".into()))?;
            let data: Value = serde_json::from_str(&raw)
                .map_err(|e| ServerError::Internal(format!("user export failed: {e}")))?;
            Ok(Json(json!({ "success": true, "data": data })))
        }

        ProfileRequest::Notifications => {
            let notifications = state.with_store(|store| store.get_notifications(&id))?;
            let unread = notifications.iter().filter(|n| !n.read).count();
            Ok(Json(json!({
                "success": true,
                "notifications": notifications,
                "unread": unread,
            })))
        }

        ProfileRequest::MarkNotificationRead { notification_id } => {
            if !state.with_store(|store| store.mark_notification_as_read(&id, &notification_id))? {
                return Err(ServerError::NotFound(format!(
                    "notification {notification_id}"
                )));
            }
            Ok(Json(json!({ "success": true })))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::build_router;
    use crate::api::tests::{admin_token, call, register, test_state};

    #[tokio::test]
    async fn test_get_and_update_profile() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;

        let (status, body) = call(&app, "/api/profile", Some(&token), json!({"action": "get"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["profile"]["company"], "");
        assert!(body["user"].get("password").is_none());

        let (status, body) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({
                "action": "update_profile",
                "profile": {"company": "Google Inc", "skills": ["Rust", "SQL"]},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["profile"]["company"], "Google Inc");
        assert_eq!(body["user"]["profile"]["skills"][1], "SQL");
        assert_eq!(body["user"]["profile"]["experience"], "0-2 years");
    }

    #[tokio::test]
    async fn test_update_preferences() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;

        let (status, body) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({"action": "update_preferences", "preferences": {"theme": "dark"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preferences"]["theme"], "dark");
        assert_eq!(body["preferences"]["language"], "en");
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;

        let (status, _) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({"action": "change_password", "currentPassword": "wrong", "newPassword": "n3w"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({"action": "change_password", "currentPassword": "secret", "newPassword": "n3w"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            "/api/auth",
            None,
            json!({"action": "login", "email": "ana@example.com", "password": "n3w"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_export_omits_credential() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;

        let (status, body) = call(&app, "/api/profile", Some(&token), json!({"action": "export"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "ana@example.com");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_notifications_feed() {
        let app = build_router(test_state());
        let token = register(&app, "Ana", "ana@example.com").await;
        let admin = admin_token(&app).await;

        let (_, me) = call(&app, "/api/profile", Some(&token), json!({"action": "get"})).await;
        let id = me["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "/api/admin",
            Some(&admin),
            json!({
                "action": "notify",
                "userId": id,
                "notification": {"type": "info", "title": "Hello", "message": "Welcome"},
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "/api/profile", Some(&token), json!({"action": "notifications"})).await;
        assert_eq!(body["unread"], 1);
        let notif_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({"action": "mark_notification_read", "notificationId": notif_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "/api/profile", Some(&token), json!({"action": "notifications"})).await;
        assert_eq!(body["unread"], 0);
        assert_eq!(body["notifications"][0]["read"], true);

        let (status, _) = call(
            &app,
            "/api/profile",
            Some(&token),
            json!({"action": "mark_notification_read", "notificationId": "notif_missing"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
