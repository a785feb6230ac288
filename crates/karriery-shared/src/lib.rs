//! # karriery-shared
//!
//! Types shared by the Karriery record store and its HTTP service: domain
//! enums, record id generation, storage key names and credential hashing.

pub mod constants;
pub mod credential;
pub mod error;
pub mod types;

pub use error::CredentialError;
pub use types::*;
