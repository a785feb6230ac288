//! `/api/tickets`: support tickets for the signed-in user, and the admin
//! view over all of them.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use karriery_shared::{TicketCategory, TicketPriority};
use karriery_store::{Attachment, NewTicket, NotificationDraft, ReplyDraft};

use crate::api::{authenticate, AppState};
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TicketRequest {
    Create {
        subject: String,
        message: String,
        #[serde(default)]
        category: Option<TicketCategory>,
        #[serde(default)]
        priority: Option<TicketPriority>,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    List,
    Reply {
        ticket_id: String,
        message: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    Search {
        query: String,
    },
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TicketRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload?;
    let caller = authenticate(&state, &headers).await?;
    let user = caller.user;

    match request {
        TicketRequest::Create {
            subject,
            message,
            category,
            priority,
            attachments,
        } => {
            if subject.trim().is_empty() || message.trim().is_empty() {
                return Err(ServerError::BadRequest("Subject and message are required".into()));
            }
            let ticket = state.with_store(|store| {
                store.create_ticket(NewTicket {
                    user_id: user.id.clone(),
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                    subject,
                    message,
                    category,
                    priority,
                    attachments,
                })
            })?;
            Ok(Json(json!({
                "success": true,
                "message": "Ticket created",
                "ticket": ticket,
            })))
        }

        TicketRequest::List => {
            let tickets = state.with_store(|store| {
                if user.role.is_admin() {
                    store.get_all_tickets()
                } else {
                    store.tickets_for_user(&user.id)
                }
            })?;
            Ok(Json(json!({ "success": true, "tickets": tickets })))
        }

        TicketRequest::Reply {
            ticket_id,
            message,
            attachments,
        } => {
            if message.trim().is_empty() {
                return Err(ServerError::BadRequest("Reply message is required".into()));
            }

            let reply = state.with_store(|store| -> Result<_, ServerError> {
                let ticket = store
                    .get_ticket(&ticket_id)
                    .ok_or_else(|| ServerError::NotFound(format!("ticket {ticket_id}")))?;
                if ticket.user_id != user.id && !user.role.is_admin() {
                    return Err(ServerError::Forbidden("Not your ticket".into()));
                }

                let reply = store
                    .add_reply_to_ticket(
                        &ticket_id,
                        ReplyDraft {
                            user_id: user.id.clone(),
                            user_name: user.name.clone(),
                            user_role: user.role,
                            message,
                            attachments,
                        },
                    )
                    .ok_or_else(|| ServerError::Internal("reply was not saved".into()))?;

                // Staff answers land in the owner's notification feed.
                if user.role.is_admin() && ticket.user_id != user.id {
                    let notified = store.add_notification(
                        &ticket.user_id,
                        NotificationDraft {
                            kind: "ticket_reply".to_string(),
                            title: "New reply to your ticket".to_string(),
                            message: ticket.subject.clone(),
                            data: Some(json!({ "ticketId": ticket.id })),
                        },
                    );
                    if notified.is_none() {
                        debug!(ticket = %ticket.id, "ticket owner not notified");
                    }
                }
                Ok(reply)
            })??;

            Ok(Json(json!({ "success": true, "reply": reply })))
        }

        TicketRequest::Search { query } => {
            if !user.role.is_admin() {
                return Err(ServerError::Forbidden("Administrator access required".into()));
            }
            let tickets = state.with_store(|store| store.search_tickets(&query))?;
            Ok(Json(json!({ "success": true, "tickets": tickets })))
        }
    }
}
