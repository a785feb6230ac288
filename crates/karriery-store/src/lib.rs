//! # karriery-store
//!
//! Local record store for the Karriery site.
//!
//! Users, support tickets, contact requests and the system record are
//! persisted as four JSON documents in a key-value substrate ([`SqliteKv`]
//! on disk, [`MemoryKv`] in memory). The crate exposes a synchronous [`RecordStore`] handle with typed
//! CRUD, search, notification and statistics helpers. Substrate failures are
//! logged and absorbed; callers only ever see the domain errors of
//! [`StoreError`].

pub mod backend;
pub mod backup;
pub mod contacts;
pub mod database;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod session;
pub mod store;
pub mod tickets;
pub mod users;

mod error;

pub use backend::{KvBackend, MemoryKv};
pub use backup::DataBundle;
pub use database::SqliteKv;
pub use error::{Result, StoreError};
pub use models::*;
pub use store::{RecordStore, StoreOptions};
