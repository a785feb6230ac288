//! In-memory sign-in sessions.
//!
//! Tokens are random 32-byte values, hex encoded, handed out on login and
//! presented back as `Authorization: Bearer <token>`. Sessions are not
//! persisted; a restart signs everybody out.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use karriery_shared::credential::generate_token;

/// A live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Token -> session map shared by all handlers.
#[derive(Clone)]
pub struct SessionRegistry {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a session for `user_id` and return its token.
    pub async fn issue(&self, user_id: &str) -> String {
        let token = generate_token();
        let session = Session {
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        debug!(user_id, "session issued");
        token
    }

    /// Look up a token. Expired sessions resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| s.is_fresh()).cloned()
    }

    /// Drop one session. Returns `true` if it existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every session belonging to `user_id` (deleted or deactivated
    /// accounts).
    pub async fn revoke_user(&self, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(user_id, dropped, "sessions revoked");
        }
    }

    pub async fn purge_expired(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_fresh());
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "expired sessions purged");
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
