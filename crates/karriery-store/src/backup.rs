//! Whole-store export and import.
//!
//! A [`DataBundle`] carries every collection. Import validates the bundle
//! up front and then overwrites all documents in one `set_many` call, so a
//! rejected bundle leaves the substrate untouched.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karriery_shared::constants::{CONTACTS_KEY, SYSTEM_KEY, TICKETS_KEY, USERS_KEY};

use crate::error::{Result, StoreError};
use crate::models::{ContactRequest, SystemRecord, Ticket, User};
use crate::store::{compute_statistics, RecordStore};

/// Full dump of every collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataBundle {
    pub users: Vec<User>,
    pub tickets: Vec<Ticket>,
    /// Exports from the old site have no contact inbox.
    #[serde(default)]
    pub contacts: Vec<ContactRequest>,
    /// Settings are kept as they are when a bundle carries no system record.
    #[serde(default)]
    pub system: Option<SystemRecord>,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

impl RecordStore {
    /// Snapshot every collection into one serializable bundle.
    pub fn export_all_data(&self) -> DataBundle {
        let bundle = DataBundle {
            users: self.load_users(),
            tickets: self.load_tickets(),
            contacts: self.load_contacts(),
            system: Some(self.get_system()),
            exported_at: Utc::now(),
        };
        tracing::info!(
            users = bundle.users.len(),
            tickets = bundle.tickets.len(),
            contacts = bundle.contacts.len(),
            "data exported"
        );
        bundle
    }

    /// Decode a JSON bundle and overwrite all collections with it.
    ///
    /// Any decode or validation failure yields [`StoreError::Import`] before
    /// anything is written. `Ok(false)` means the bundle was valid but the
    /// substrate rejected the write.
    pub fn import_data(&mut self, raw: &str) -> Result<bool> {
        let bundle: DataBundle =
            serde_json::from_str(raw).map_err(|e| StoreError::Import(e.to_string()))?;
        self.import_bundle(bundle)
    }

    /// Overwrite all collections with an already decoded bundle.
    pub fn import_bundle(&mut self, bundle: DataBundle) -> Result<bool> {
        validate(&bundle)?;

        let mut system = match bundle.system {
            Some(system) => system,
            None => self.get_system(),
        };
        system.statistics = compute_statistics(&bundle.users, &bundle.tickets);
        system.last_updated = Utc::now();

        let encoded = (|| -> Result<Vec<(&str, String)>> {
            Ok(vec![
                (
                    USERS_KEY,
                    serde_json::to_string_pretty(&Self::users_doc(&bundle.users))?,
                ),
                (
                    TICKETS_KEY,
                    serde_json::to_string_pretty(&Self::tickets_doc(&bundle.tickets))?,
                ),
                (
                    CONTACTS_KEY,
                    serde_json::to_string_pretty(&Self::contacts_doc(&bundle.contacts))?,
                ),
                (SYSTEM_KEY, serde_json::to_string_pretty(&system)?),
            ])
        })()
        .map_err(|e| StoreError::Import(e.to_string()))?;

        if let Err(e) = self.backend().set_many(&encoded) {
            tracing::error!(error = %e, "failed to write imported data");
            return Ok(false);
        }

        tracing::info!(
            users = bundle.users.len(),
            tickets = bundle.tickets.len(),
            contacts = bundle.contacts.len(),
            "data imported"
        );
        self.initialize();
        Ok(true)
    }
}

fn validate(bundle: &DataBundle) -> Result<()> {
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    for user in &bundle.users {
        if !ids.insert(user.id.as_str()) {
            return Err(StoreError::Import(format!("duplicate user id {}", user.id)));
        }
        if !emails.insert(user.email.as_str()) {
            return Err(StoreError::Import(format!(
                "duplicate user email {}",
                user.email
            )));
        }
    }

    let mut ticket_ids = HashSet::new();
    for ticket in &bundle.tickets {
        if !ticket_ids.insert(ticket.id.as_str()) {
            return Err(StoreError::Import(format!(
                "duplicate ticket id {}",
                ticket.id
            )));
        }
    }

    let mut contact_ids = HashSet::new();
    for contact in &bundle.contacts {
        if !contact_ids.insert(contact.id.as_str()) {
            return Err(StoreError::Import(format!(
                "duplicate contact id {}",
                contact.id
            )));
        }
    }
    Ok(())
}
