//! Contact-form inbox.

use chrono::Utc;

use karriery_shared::{generate_id, ContactStatus};

use crate::models::{ContactRequest, NewContactRequest};
use crate::store::RecordStore;

impl RecordStore {
    /// Every contact request, newest first.
    pub fn get_contact_requests(&self) -> Vec<ContactRequest> {
        let mut contacts = self.load_contacts();
        contacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        contacts
    }

    pub fn get_contact_request(&self, id: &str) -> Option<ContactRequest> {
        self.load_contacts().into_iter().find(|c| c.id == id)
    }

    /// File a new request in the `pending` state. The request is returned
    /// even when the substrate drops the write.
    pub fn create_contact_request(&mut self, data: NewContactRequest) -> ContactRequest {
        let now = Utc::now();
        let mut request = ContactRequest {
            id: generate_id("contact"),
            name: data.name,
            email: data.email,
            message: data.message,
            status: ContactStatus::Pending,
            user_id: data.user_id,
            created_at: now,
            updated_at: now,
        };

        let saved = self.modify_contacts("create_contact_request", |contacts| {
            while contacts.iter().any(|c| c.id == request.id) {
                request.id = generate_id("contact");
            }
            contacts.push(request.clone());
            Some(())
        });

        if saved.is_some() {
            tracing::info!(
                id = %request.id,
                signed_in = request.user_id.is_some(),
                "contact request filed"
            );
        }
        request
    }

    /// Move a request to `status`. `false` if the id is unknown.
    pub fn update_contact_status(&mut self, id: &str, status: ContactStatus) -> bool {
        self.modify_contacts("update_contact_status", |contacts| {
            let request = contacts.iter_mut().find(|c| c.id == id)?;
            request.status = status;
            request.updated_at = Utc::now();
            Some(())
        })
        .is_some()
    }

    /// Drop the link from requests to a deleted account.
    pub(crate) fn detach_contacts(&mut self, user_id: &str) {
        let detached = self.modify_contacts("detach_contacts", |contacts| {
            let mut touched = 0usize;
            for request in contacts
                .iter_mut()
                .filter(|c| c.user_id.as_deref() == Some(user_id))
            {
                request.user_id = None;
                touched += 1;
            }
            (touched > 0).then_some(touched)
        });
        if let Some(count) = detached {
            tracing::debug!(user_id, count, "contact requests detached");
        }
    }
}
