//! The "signed in on this device" snapshot, kept under its own key.

use karriery_shared::constants::CURRENT_USER_KEY;

use crate::models::{SessionUser, User};
use crate::store::RecordStore;

impl RecordStore {
    pub fn current_user(&self) -> Option<SessionUser> {
        let raw = match self.backend().get(CURRENT_USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!(key = CURRENT_USER_KEY, error = %e, "failed to read session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session snapshot");
                None
            }
        }
    }

    /// Store a denormalized snapshot of `user` as the current session.
    pub fn set_current_user(&mut self, user: &User) -> bool {
        let snapshot = SessionUser::from(user);
        let result = serde_json::to_string(&snapshot)
            .map_err(Into::into)
            .and_then(|raw| self.backend().set(CURRENT_USER_KEY, &raw));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = CURRENT_USER_KEY, error = %e, "failed to write session");
                false
            }
        }
    }

    pub fn clear_current_user(&mut self) {
        if let Err(e) = self.backend().remove(CURRENT_USER_KEY) {
            tracing::error!(key = CURRENT_USER_KEY, error = %e, "failed to clear session");
        }
    }
}
