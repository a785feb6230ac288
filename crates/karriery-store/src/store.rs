//! The record store handle.
//!
//! [`RecordStore`] keeps the `users`, `tickets`, `contacts` and `system` collections as
//! whole JSON documents in a [`KvBackend`]. Every mutation is a
//! read-modify-write of one complete collection. Substrate failures are
//! logged and absorbed here; only domain errors reach callers.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use karriery_shared::constants::{
    ADMIN_EMAIL, ADMIN_ID, APP_NAME, CONTACTS_KEY, DEFAULT_ADMIN_PASSWORD, DEFAULT_SITE_VERSION,
    SYSTEM_KEY, TICKETS_KEY, USERS_KEY,
};
use karriery_shared::credential::hash_password;
use karriery_shared::{CredentialError, ExperienceBracket, Role, TicketStatus, UserStatus};

use crate::backend::{KvBackend, MemoryKv};
use crate::database::SqliteKv;
use crate::error::Result;
use crate::models::{
    ContactRequest, Education, ExperienceDetail, SettingsPatch, SiteSettings, Statistics, SystemRecord, Ticket,
    User, UserPreferences, UserProfile,
};

/// Values the store needs when it seeds a fresh substrate.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub site_name: String,
    pub version: String,
    /// Password given to the bootstrap admin when it has to be created.
    pub admin_password: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            site_name: APP_NAME.to_string(),
            version: DEFAULT_SITE_VERSION.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsersDocRef<'a> {
    users: &'a [User],
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct UsersDoc {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketsDocRef<'a> {
    tickets: &'a [Ticket],
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TicketsDoc {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactsDocRef<'a> {
    contacts: &'a [ContactRequest],
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ContactsDoc {
    #[serde(default)]
    contacts: Vec<ContactRequest>,
}

/// Local record store over a key-value substrate.
pub struct RecordStore {
    backend: Box<dyn KvBackend>,
    options: StoreOptions,
}

impl RecordStore {
    /// Wrap a substrate without touching it. Call [`initialize`](Self::initialize)
    /// before use.
    pub fn new(backend: Box<dyn KvBackend>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    /// Open (or create) a SQLite-backed store at `path` and initialize it.
    pub fn open_at(path: &Path, options: StoreOptions) -> Result<Self> {
        let backend = SqliteKv::open_at(path)?;
        let mut store = Self::new(Box::new(backend), options);
        store.initialize();
        Ok(store)
    }

    /// Open the store in the platform data directory and initialize it.
    pub fn open_default(options: StoreOptions) -> Result<Self> {
        let backend = SqliteKv::open_default()?;
        let mut store = Self::new(Box::new(backend), options);
        store.initialize();
        Ok(store)
    }

    /// Initialized store living only in process memory.
    pub fn in_memory(options: StoreOptions) -> Self {
        let mut store = Self::new(Box::new(MemoryKv::new()), options);
        store.initialize();
        store
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Seed missing collection documents and make sure the bootstrap admin
    /// exists. Safe to call any number of times.
    pub fn initialize(&mut self) {
        let now = Utc::now();
        self.ensure_key(
            USERS_KEY,
            &UsersDocRef {
                users: &[],
                last_updated: now,
            },
        );
        self.ensure_key(
            TICKETS_KEY,
            &TicketsDocRef {
                tickets: &[],
                last_updated: now,
            },
        );
        self.ensure_key(
            CONTACTS_KEY,
            &ContactsDocRef {
                contacts: &[],
                last_updated: now,
            },
        );
        self.ensure_key(SYSTEM_KEY, &self.default_system());
        self.ensure_admin();
    }

    fn ensure_key<T: Serialize>(&self, key: &str, default: &T) {
        match self.backend.get(key) {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.write_doc(key, default) {
                    tracing::error!(key, error = %e, "failed to seed collection");
                }
            }
            Err(e) => tracing::error!(key, error = %e, "failed to read collection"),
        }
    }

    fn ensure_admin(&mut self) {
        let mut users = match self.try_users() {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "cannot read users, skipping admin bootstrap");
                return;
            }
        };

        match users.iter_mut().find(|u| u.email == ADMIN_EMAIL) {
            Some(existing) if existing.role.is_admin() => return,
            Some(existing) => {
                tracing::warn!(id = %existing.id, "restoring admin role on bootstrap account");
                existing.role = Role::Admin;
            }
            None => match bootstrap_admin(&self.options.admin_password) {
                Ok(admin) => {
                    tracing::info!(id = ADMIN_ID, "creating bootstrap admin");
                    users.push(admin);
                }
                Err(e) => {
                    tracing::error!(error = %e, "cannot hash bootstrap admin password");
                    return;
                }
            },
        }

        if self.save_users(&users) {
            self.update_statistics();
        }
    }

    // ------------------------------------------------------------------
    // Document I/O
    // ------------------------------------------------------------------

    fn read_doc<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_doc<T: Serialize + ?Sized>(&self, key: &str, doc: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(doc)?;
        self.backend.set(key, &raw)
    }

    pub(crate) fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    pub(crate) fn try_users(&self) -> Result<Vec<User>> {
        Ok(self
            .read_doc::<UsersDoc>(USERS_KEY)?
            .map(|doc| doc.users)
            .unwrap_or_default())
    }

    pub(crate) fn try_tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self
            .read_doc::<TicketsDoc>(TICKETS_KEY)?
            .map(|doc| doc.tickets)
            .unwrap_or_default())
    }

    pub(crate) fn try_contacts(&self) -> Result<Vec<ContactRequest>> {
        Ok(self
            .read_doc::<ContactsDoc>(CONTACTS_KEY)?
            .map(|doc| doc.contacts)
            .unwrap_or_default())
    }

    pub(crate) fn try_system(&self) -> Result<SystemRecord> {
        Ok(self
            .read_doc::<SystemRecord>(SYSTEM_KEY)?
            .unwrap_or_else(|| self.default_system()))
    }

    /// Users snapshot; empty when the substrate cannot be read.
    pub(crate) fn load_users(&self) -> Vec<User> {
        self.try_users().unwrap_or_else(|e| {
            tracing::error!(key = USERS_KEY, error = %e, "failed to read users");
            Vec::new()
        })
    }

    /// Tickets snapshot; empty when the substrate cannot be read.
    pub(crate) fn load_tickets(&self) -> Vec<Ticket> {
        self.try_tickets().unwrap_or_else(|e| {
            tracing::error!(key = TICKETS_KEY, error = %e, "failed to read tickets");
            Vec::new()
        })
    }

    /// Contact inbox snapshot; empty when the substrate cannot be read.
    pub(crate) fn load_contacts(&self) -> Vec<ContactRequest> {
        self.try_contacts().unwrap_or_else(|e| {
            tracing::error!(key = CONTACTS_KEY, error = %e, "failed to read contacts");
            Vec::new()
        })
    }

    pub(crate) fn users_doc(users: &[User]) -> impl Serialize + '_ {
        UsersDocRef {
            users,
            last_updated: Utc::now(),
        }
    }

    pub(crate) fn tickets_doc(tickets: &[Ticket]) -> impl Serialize + '_ {
        TicketsDocRef {
            tickets,
            last_updated: Utc::now(),
        }
    }

    pub(crate) fn contacts_doc(contacts: &[ContactRequest]) -> impl Serialize + '_ {
        ContactsDocRef {
            contacts,
            last_updated: Utc::now(),
        }
    }

    pub(crate) fn save_users(&self, users: &[User]) -> bool {
        match self.write_doc(USERS_KEY, &Self::users_doc(users)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = USERS_KEY, error = %e, "failed to write users");
                false
            }
        }
    }

    pub(crate) fn save_tickets(&self, tickets: &[Ticket]) -> bool {
        match self.write_doc(TICKETS_KEY, &Self::tickets_doc(tickets)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = TICKETS_KEY, error = %e, "failed to write tickets");
                false
            }
        }
    }

    fn save_system(&self, system: &SystemRecord) -> bool {
        match self.write_doc(SYSTEM_KEY, system) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = SYSTEM_KEY, error = %e, "failed to write system record");
                false
            }
        }
    }

    /// Read-modify-write of the users collection. `op` returns `None` to
    /// abort without writing. Yields `None` on read or write failure too.
    pub(crate) fn modify_users<R>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut Vec<User>) -> Option<R>,
    ) -> Option<R> {
        let mut users = match self.try_users() {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(op = what, error = %e, "failed to read users");
                return None;
            }
        };
        let out = op(&mut users)?;
        if !self.save_users(&users) {
            return None;
        }
        tracing::debug!(op = what, "users updated");
        Some(out)
    }

    /// Read-modify-write of the tickets collection; see [`Self::modify_users`].
    pub(crate) fn modify_tickets<R>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut Vec<Ticket>) -> Option<R>,
    ) -> Option<R> {
        let mut tickets = match self.try_tickets() {
            Ok(tickets) => tickets,
            Err(e) => {
                tracing::error!(op = what, error = %e, "failed to read tickets");
                return None;
            }
        };
        let out = op(&mut tickets)?;
        if !self.save_tickets(&tickets) {
            return None;
        }
        tracing::debug!(op = what, "tickets updated");
        Some(out)
    }

    /// Read-modify-write of the contact inbox; see [`Self::modify_users`].
    pub(crate) fn modify_contacts<R>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut Vec<ContactRequest>) -> Option<R>,
    ) -> Option<R> {
        let mut contacts = match self.try_contacts() {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!(op = what, error = %e, "failed to read contacts");
                return None;
            }
        };
        let out = op(&mut contacts)?;
        if let Err(e) = self.write_doc(CONTACTS_KEY, &Self::contacts_doc(&contacts)) {
            tracing::error!(key = CONTACTS_KEY, error = %e, "failed to write contacts");
            return None;
        }
        tracing::debug!(op = what, "contacts updated");
        Some(out)
    }

    // ------------------------------------------------------------------
    // System record
    // ------------------------------------------------------------------

    fn default_system(&self) -> SystemRecord {
        SystemRecord {
            settings: SiteSettings {
                site_name: self.options.site_name.clone(),
                version: self.options.version.clone(),
                maintenance: false,
            },
            statistics: Statistics::default(),
            last_updated: Utc::now(),
        }
    }

    /// Recount every collection and store the snapshot in the system record.
    pub(crate) fn update_statistics(&self) {
        let (users, tickets, mut system) =
            match (self.try_users(), self.try_tickets(), self.try_system()) {
                (Ok(u), Ok(t), Ok(s)) => (u, t, s),
                (u, t, s) => {
                    let e = [u.err(), t.err(), s.err()].into_iter().flatten().next();
                    tracing::error!(error = ?e, "failed to read collections for statistics");
                    return;
                }
            };

        system.statistics = compute_statistics(&users, &tickets);
        system.last_updated = Utc::now();
        self.save_system(&system);
    }

    /// The last recomputed statistics snapshot. Not recounted on read.
    pub fn get_statistics(&self) -> Statistics {
        match self.try_system() {
            Ok(system) => system.statistics,
            Err(e) => {
                tracing::error!(key = SYSTEM_KEY, error = %e, "failed to read statistics");
                Statistics::default()
            }
        }
    }

    /// Full system record (settings, statistics, last update time).
    pub fn get_system(&self) -> SystemRecord {
        self.try_system().unwrap_or_else(|e| {
            tracing::error!(key = SYSTEM_KEY, error = %e, "failed to read system record");
            self.default_system()
        })
    }

    pub fn get_settings(&self) -> SiteSettings {
        self.get_system().settings
    }

    /// Apply a settings patch. Returns the new settings, or `None` if the
    /// substrate rejected the read or write.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Option<SiteSettings> {
        let mut system = match self.try_system() {
            Ok(system) => system,
            Err(e) => {
                tracing::error!(key = SYSTEM_KEY, error = %e, "failed to read system record");
                return None;
            }
        };
        if let Some(name) = patch.site_name {
            system.settings.site_name = name;
        }
        if let Some(maintenance) = patch.maintenance {
            system.settings.maintenance = maintenance;
        }
        system.last_updated = Utc::now();

        if !self.save_system(&system) {
            return None;
        }
        tracing::info!(
            site_name = %system.settings.site_name,
            maintenance = system.settings.maintenance,
            "site settings updated"
        );
        Some(system.settings)
    }
}

pub(crate) fn compute_statistics(users: &[User], tickets: &[Ticket]) -> Statistics {
    Statistics {
        total_users: users.len(),
        active_users: users
            .iter()
            .filter(|u| u.status == UserStatus::Active)
            .count(),
        total_tickets: tickets.len(),
        open_tickets: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open)
            .count(),
        closed_tickets: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Closed)
            .count(),
    }
}

/// Whether `user` is the account the store keeps alive at all times.
pub(crate) fn is_bootstrap_admin(user: &User) -> bool {
    user.email == ADMIN_EMAIL
}

fn bootstrap_admin(password: &str) -> std::result::Result<User, CredentialError> {
    let now = Utc::now();
    Ok(User {
        id: ADMIN_ID.to_string(),
        name: "Administrator".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: Some(hash_password(password)?),
        role: Role::Admin,
        status: UserStatus::Active,
        is_google_user: false,
        google_id: None,
        profile_image: None,
        created_at: now,
        last_login: now,
        profile: Some(UserProfile {
            title: "System Administrator".to_string(),
            company: "Karriery Platform".to_string(),
            location: "Global".to_string(),
            experience: ExperienceBracket::Expert,
            bio: "System administrator with full platform access and management capabilities."
                .to_string(),
            skills: [
                "System Administration",
                "Platform Management",
                "User Management",
                "Security",
            ]
            .map(String::from)
            .to_vec(),
            education: vec![Education {
                degree: "Master of Information Technology".to_string(),
                school: "Administrative Institute".to_string(),
                year: "2020".to_string(),
            }],
            experience_details: vec![ExperienceDetail {
                title: "System Administrator".to_string(),
                company: "Karriery Platform".to_string(),
                period: "2020 - Present".to_string(),
                description:
                    "Managing platform infrastructure, user accounts, and system security"
                        .to_string(),
            }],
            ..UserProfile::default()
        }),
        preferences: UserPreferences::default(),
        notifications: Vec::new(),
    })
}
