//! Support tickets and their reply threads.

use chrono::Utc;

use karriery_shared::{generate_id, TicketStatus};

use crate::models::{NewTicket, Reply, ReplyDraft, Ticket, TicketPatch};
use crate::store::RecordStore;

impl RecordStore {
    pub fn get_all_tickets(&self) -> Vec<Ticket> {
        self.load_tickets()
    }

    pub fn get_ticket(&self, id: &str) -> Option<Ticket> {
        self.load_tickets().into_iter().find(|t| t.id == id)
    }

    /// Tickets opened by `user_id`, in creation order.
    pub fn tickets_for_user(&self, user_id: &str) -> Vec<Ticket> {
        self.load_tickets()
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect()
    }

    /// Open a ticket. Category and priority fall back to `general` / `medium`.
    pub fn create_ticket(&mut self, data: NewTicket) -> Ticket {
        let now = Utc::now();
        let mut ticket = Ticket {
            id: generate_id("ticket"),
            user_id: data.user_id,
            user_name: data.user_name,
            user_email: data.user_email,
            subject: data.subject,
            message: data.message,
            category: data.category.unwrap_or_default(),
            priority: data.priority.unwrap_or_default(),
            status: TicketStatus::Open,
            attachments: data.attachments,
            created_at: now,
            updated_at: now,
            replies: Vec::new(),
            admin_replies: Vec::new(),
        };

        let saved = self.modify_tickets("create_ticket", |tickets| {
            while tickets.iter().any(|t| t.id == ticket.id) {
                ticket.id = generate_id("ticket");
            }
            tickets.push(ticket.clone());
            Some(())
        });

        if saved.is_some() {
            tracing::info!(
                id = %ticket.id,
                user_id = %ticket.user_id,
                category = ?ticket.category,
                priority = ?ticket.priority,
                "ticket created"
            );
            self.update_statistics();
        }
        ticket
    }

    /// Apply a patch and bump `updatedAt`. `false` if the id is unknown.
    pub fn update_ticket(&mut self, id: &str, patch: TicketPatch) -> bool {
        let updated = self
            .modify_tickets("update_ticket", |tickets| {
                let ticket = tickets.iter_mut().find(|t| t.id == id)?;
                patch.apply(ticket);
                ticket.updated_at = Utc::now();
                Some(())
            })
            .is_some();

        if updated {
            self.update_statistics();
        }
        updated
    }

    /// Explicit status transition.
    pub fn set_ticket_status(&mut self, id: &str, status: TicketStatus) -> bool {
        let changed = self.update_ticket(
            id,
            TicketPatch {
                status: Some(status),
                ..TicketPatch::default()
            },
        );
        if changed {
            tracing::info!(id, status = status.as_str(), "ticket status changed");
        }
        changed
    }

    /// Append a reply. Staff replies go to `adminReplies`, everyone else's to
    /// `replies`. The ticket status is left alone.
    pub fn add_reply_to_ticket(&mut self, ticket_id: &str, draft: ReplyDraft) -> Option<Reply> {
        self.modify_tickets("add_reply_to_ticket", |tickets| {
            let ticket = tickets.iter_mut().find(|t| t.id == ticket_id)?;
            let now = Utc::now();
            let reply = Reply {
                id: generate_id("reply"),
                user_id: draft.user_id,
                user_name: draft.user_name,
                user_role: draft.user_role,
                message: draft.message,
                attachments: draft.attachments,
                created_at: now,
            };

            if reply.user_role.is_admin() {
                ticket.admin_replies.push(reply.clone());
            } else {
                ticket.replies.push(reply.clone());
            }
            ticket.updated_at = now;
            Some(reply)
        })
    }

    /// Case-insensitive substring search over subject, message and the
    /// denormalized owner name / email.
    pub fn search_tickets(&self, query: &str) -> Vec<Ticket> {
        let needle = query.to_lowercase();
        self.load_tickets()
            .into_iter()
            .filter(|t| {
                [&t.subject, &t.message, &t.user_name, &t.user_email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }
}
