use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Stored credential is malformed")]
    Malformed,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}
