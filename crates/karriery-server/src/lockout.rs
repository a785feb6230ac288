//! Failed-login lockout.
//!
//! Failures are counted per (client IP, email) pair. After
//! `max_failures` consecutive misses the pair is refused until the lockout
//! expires; a successful login clears the count. Other clients keep access
//! to the same account, so a third party cannot lock a user out.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AttemptKey {
    client: Option<IpAddr>,
    email: String,
}

impl AttemptKey {
    fn new(client: Option<IpAddr>, email: &str) -> Self {
        Self {
            client,
            email: email.trim().to_lowercase(),
        }
    }
}

#[derive(Debug)]
struct Attempts {
    failures: u32,
    locked_until: Option<Instant>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct SignInGuard {
    attempts: Arc<Mutex<HashMap<AttemptKey, Attempts>>>,
    max_failures: u32,
    lockout: Duration,
}

impl SignInGuard {
    pub fn new(max_failures: u32, lockout: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(HashMap::new())),
            max_failures: max_failures.max(1),
            lockout,
        }
    }

    /// `Err(remaining)` while the pair is locked out.
    pub async fn check(&self, client: Option<IpAddr>, email: &str) -> Result<(), Duration> {
        let key = AttemptKey::new(client, email);
        let mut attempts = self.attempts.lock().await;
        let Some(locked_until) = attempts.get(&key).map(|entry| entry.locked_until) else {
            return Ok(());
        };

        let now = Instant::now();
        match locked_until {
            Some(until) if until > now => Err(until - now),
            Some(_) => {
                attempts.remove(&key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a failed login. Returns `true` when this failure locks the pair.
    pub async fn record_failure(&self, client: Option<IpAddr>, email: &str) -> bool {
        let key = AttemptKey::new(client, email);
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;
        let entry = attempts.entry(key).or_insert(Attempts {
            failures: 0,
            locked_until: None,
            last_seen: now,
        });

        entry.failures += 1;
        entry.last_seen = now;
        if entry.failures >= self.max_failures && entry.locked_until.is_none() {
            entry.locked_until = Some(now + self.lockout);
            warn!(
                client = ?client,
                failures = entry.failures,
                lockout_secs = self.lockout.as_secs(),
                "sign-in locked out"
            );
            return true;
        }
        false
    }

    pub async fn record_success(&self, client: Option<IpAddr>, email: &str) {
        self.attempts
            .lock()
            .await
            .remove(&AttemptKey::new(client, email));
    }

    /// Forget pairs that are not locked and have been idle for `max_idle`.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let now = Instant::now();
        self.attempts.lock().await.retain(|_, entry| match entry.locked_until {
            Some(until) => until > now,
            None => now.duration_since(entry.last_seen) < max_idle,
        });
    }
}

/// Client address: the socket peer when known, else the first hop of
/// `X-Forwarded-For`, else `X-Real-IP`.
pub fn client_ip(connect: Option<&ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(ConnectInfo(addr)) = connect {
        return Some(addr.ip());
    }

    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Option<IpAddr> {
        Some(s.parse().unwrap())
    }

    #[tokio::test]
    async fn test_locks_after_max_failures() {
        let guard = SignInGuard::new(3, Duration::from_secs(60));
        let client = ip("198.51.100.4");

        assert!(!guard.record_failure(client, "ana@example.com").await);
        assert!(!guard.record_failure(client, "ana@example.com").await);
        assert!(guard.check(client, "ana@example.com").await.is_ok());

        assert!(guard.record_failure(client, "ana@example.com").await);
        let remaining = guard.check(client, "ana@example.com").await.unwrap_err();
        assert!(remaining <= Duration::from_secs(60));

        // emails are compared without case or padding
        assert!(guard.check(client, " ANA@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_lock_is_scoped_to_client_and_email() {
        let guard = SignInGuard::new(1, Duration::from_secs(60));
        guard.record_failure(ip("198.51.100.4"), "ana@example.com").await;

        assert!(guard.check(ip("198.51.100.4"), "ana@example.com").await.is_err());
        assert!(guard.check(ip("198.51.100.5"), "ana@example.com").await.is_ok());
        assert!(guard.check(ip("198.51.100.4"), "bob@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let guard = SignInGuard::new(2, Duration::from_secs(60));
        let client = ip("2001:db8::7");

        guard.record_failure(client, "ana@example.com").await;
        guard.record_success(client, "ana@example.com").await;
        assert!(!guard.record_failure(client, "ana@example.com").await);
        assert!(guard.check(client, "ana@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_lockout_expires() {
        let guard = SignInGuard::new(1, Duration::from_millis(20));
        guard.record_failure(None, "ana@example.com").await;
        assert!(guard.check(None, "ana@example.com").await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(guard.check(None, "ana@example.com").await.is_ok());
        assert!(guard.attempts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_keeps_active_lockouts() {
        let guard = SignInGuard::new(2, Duration::from_secs(60));
        guard.record_failure(ip("192.0.2.1"), "idle@example.com").await;
        guard.record_failure(ip("192.0.2.2"), "locked@example.com").await;
        guard.record_failure(ip("192.0.2.2"), "locked@example.com").await;

        guard.purge_stale(Duration::ZERO).await;

        assert!(guard.check(ip("192.0.2.2"), "locked@example.com").await.is_err());
        assert_eq!(guard.attempts.lock().await.len(), 1);
    }

    #[test]
    fn test_client_ip_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(None, &headers), None);

        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(None, &headers), ip("198.51.100.2"));

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(None, &headers), ip("203.0.113.7"));

        let peer = ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(client_ip(Some(&peer), &headers), ip("127.0.0.1"));
    }
}
