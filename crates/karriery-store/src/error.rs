use thiserror::Error;

/// Errors produced by the store layer.
///
/// Only the domain variants (`DuplicateEmail`, `InvalidCredentials`,
/// `AccountInactive`, `Import`) ever leave a [`RecordStore`](crate::RecordStore)
/// method, plus `Credential` when password hashing itself fails. The
/// remaining variants describe substrate failures, which the store logs and
/// absorbs.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A user with this email already exists (case-sensitive match).
    #[error("User with this email already exists: {0}")]
    DuplicateEmail(String),

    /// No user matches the given email / password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The credentials matched an account that has been deactivated.
    #[error("Account is deactivated")]
    AccountInactive,

    /// Bulk import payload could not be decoded or validated.
    #[error("Import error: {0}")]
    Import(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted document failed to encode or decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Password hashing failed.
    #[error("Credential error: {0}")]
    Credential(#[from] karriery_shared::CredentialError),

    /// Any other substrate failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
