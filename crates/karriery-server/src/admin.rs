//! `/api/admin`: dashboard actions. Every action needs an admin session.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use karriery_shared::{ContactStatus, Role, TicketStatus, UserStatus};
use karriery_store::{NewUser, NotificationDraft, RecordStore, SettingsPatch, UserSummary};

use crate::api::{public_user, require_admin, AppState};
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AdminRequest {
    Stats,
    UserStats,
    ListUsers,
    SearchUsers {
        query: String,
    },
    ChangeRole {
        user_id: String,
        role: Role,
    },
    ChangeStatus {
        user_id: String,
        status: UserStatus,
    },
    DeleteUser {
        user_id: String,
    },
    CreateUser {
        user: NewUser,
        #[serde(default)]
        role: Role,
    },
    SetTicketStatus {
        ticket_id: String,
        status: TicketStatus,
    },
    Settings {
        settings: SettingsPatch,
    },
    Export,
    Import {
        data: Value,
    },
    Notify {
        user_id: String,
        notification: NotificationDraft,
    },
    Contacts,
    UpdateContactStatus {
        request_id: String,
        status: ContactStatus,
    },
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AdminRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload?;
    let caller = require_admin(&state, &headers).await?;
    let admin_id = caller.user.id;

    match request {
        AdminRequest::Stats => {
            let statistics = state.with_store(|store| store.get_statistics())?;
            Ok(Json(json!({ "success": true, "statistics": statistics })))
        }

        AdminRequest::UserStats => {
            let stats = state.with_store(|store| store.get_user_stats())?;
            Ok(Json(json!({ "success": true, "stats": stats })))
        }

        AdminRequest::ListUsers => {
            let users = state.with_store(|store| store.get_all_users_for_admin())?;
            Ok(Json(json!({ "success": true, "users": users })))
        }

        AdminRequest::SearchUsers { query } => {
            let users: Vec<UserSummary> = state.with_store(|store| {
                store.search_users(&query).iter().map(UserSummary::from).collect()
            })?;
            Ok(Json(json!({ "success": true, "users": users })))
        }

        AdminRequest::ChangeRole { user_id, role } => {
            state.with_store(|store| {
                if store.change_user_role(&user_id, role) {
                    Ok(())
                } else {
                    Err(refused(store, &user_id, "change the role of"))
                }
            })??;
            info!(admin = %admin_id, user_id = %user_id, role = role.as_str(), "role changed");
            Ok(Json(json!({ "success": true, "message": "Role updated" })))
        }

        AdminRequest::ChangeStatus { user_id, status } => {
            state.with_store(|store| {
                if store.change_user_status(&user_id, status) {
                    Ok(())
                } else {
                    Err(refused(store, &user_id, "change the status of"))
                }
            })??;
            if status == UserStatus::Inactive {
                state.sessions.revoke_user(&user_id).await;
            }
            info!(admin = %admin_id, user_id = %user_id, status = status.as_str(), "status changed");
            Ok(Json(json!({ "success": true, "message": "Status updated" })))
        }

        AdminRequest::DeleteUser { user_id } => {
            state.with_store(|store| {
                if store.delete_user(&user_id) {
                    Ok(())
                } else {
                    Err(refused(store, &user_id, "delete"))
                }
            })??;
            state.sessions.revoke_user(&user_id).await;
            info!(admin = %admin_id, user_id = %user_id, "user deleted");
            Ok(Json(json!({ "success": true, "message": "User deleted" })))
        }

        AdminRequest::CreateUser { user, role } => {
            if user.name.trim().is_empty() || user.email.trim().is_empty() {
                return Err(ServerError::BadRequest("Name and email are required".into()));
            }
            let created = state.with_store(|store| -> Result<_, ServerError> {
                let created = store.create_user(user)?;
                if role.is_admin() && !store.change_user_role(&created.id, role) {
                    return Err(ServerError::Internal("role was not saved".into()));
                }
                Ok(store.get_user(&created.id).unwrap_or(created))
            })??;
            info!(admin = %admin_id, id = %created.id, role = created.role.as_str(), "user created by admin");
            Ok(Json(json!({
                "success": true,
                "message": "User created",
                "user": public_user(created),
            })))
        }

        AdminRequest::SetTicketStatus { ticket_id, status } => {
            if !state.with_store(|store| store.set_ticket_status(&ticket_id, status))? {
                return Err(ServerError::NotFound(format!("ticket {ticket_id}")));
            }
            Ok(Json(json!({ "success": true, "message": "Ticket updated" })))
        }

        AdminRequest::Settings { settings } => {
            let settings = state
                .with_store(|store| store.update_settings(settings))?
                .ok_or_else(|| ServerError::Internal("settings were not saved".into()))?;
            Ok(Json(json!({ "success": true, "settings": settings })))
        }

        AdminRequest::Export => {
            let bundle = state.with_store(|store| store.export_all_data())?;
            Ok(Json(json!({ "success": true, "data": bundle })))
        }

        AdminRequest::Import { data } => {
            let raw = data.to_string();
            let written = state.with_store(|store| store.import_data(&raw))??;
            if !written {
                return Err(ServerError::Internal("imported data was not saved".into()));
            }
            info!(admin = %admin_id, "data imported");
            Ok(Json(json!({ "success": true, "message": "Data imported" })))
        }

        AdminRequest::Notify {
            user_id,
            notification,
        } => {
            let notification = state
                .with_store(|store| store.add_notification(&user_id, notification))?
                .ok_or_else(|| ServerError::NotFound(format!("user {user_id}")))?;
            Ok(Json(json!({ "success": true, "notification": notification })))
        }

        AdminRequest::Contacts => {
            let requests = state.with_store(|store| store.get_contact_requests())?;
            Ok(Json(json!({ "success": true, "requests": requests })))
        }

        AdminRequest::UpdateContactStatus { request_id, status } => {
            state.with_store(|store| {
                if store.update_contact_status(&request_id, status) {
                    Ok(())
                } else if store.get_contact_request(&request_id).is_none() {
                    Err(ServerError::NotFound(format!("contact request {request_id}")))
                } else {
                    Err(ServerError::Internal("contact status was not saved".into()))
                }
            })??;
            info!(admin = %admin_id, request = %request_id, status = status.as_str(), "contact request updated");
            Ok(Json(json!({ "success": true, "message": "Status updated" })))
        }
    }
}

/// Explain why a user mutation returned `false`.
fn refused(store: &RecordStore, user_id: &str, what: &str) -> ServerError {
    if store.get_user(user_id).is_none() {
        ServerError::NotFound(format!("user {user_id}"))
    } else {
        ServerError::Forbidden(format!("Cannot {what} this account"))
    }
}
