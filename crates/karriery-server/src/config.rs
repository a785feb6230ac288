//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use karriery_shared::constants::{APP_NAME, DEFAULT_ADMIN_PASSWORD, DEFAULT_HTTP_PORT};
use karriery_store::StoreOptions;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite file holding the record store.
    /// Env: `KARRIERY_DATA_PATH`
    /// Default: `None` (platform data directory, `karriery.db`).
    pub data_path: Option<PathBuf>,

    /// Site name written into a fresh system record.
    /// Env: `SITE_NAME`
    /// Default: `"Karriery"`
    pub site_name: String,

    /// Password for the bootstrap admin, used only when that account has to
    /// be created.
    /// Env: `ADMIN_PASSWORD`
    /// Default: `"admin"`
    pub admin_password: String,

    /// Lifetime of a sign-in session in hours.
    /// Env: `SESSION_TTL_HOURS`
    /// Default: `24`
    pub session_ttl_hours: i64,

    /// Maximum request body size in bytes (5 MiB). Bounds import payloads.
    /// Env: `MAX_BODY_BYTES`
    pub max_body_bytes: usize,

    /// Consecutive failed logins for one email from one client before the
    /// pair is locked out.
    /// Env: `AUTH_MAX_FAILURES`
    /// Default: `5`
    pub auth_max_failures: u32,

    /// How long a locked (client, email) pair stays locked.
    /// Env: `AUTH_LOCKOUT_SECS`
    /// Default: `300`
    pub auth_lockout: Duration,

    /// OAuth client id that Google ID tokens must be issued for. Google
    /// sign-in is refused while unset.
    /// Env: `GOOGLE_CLIENT_ID`
    pub google_client_id: Option<String>,

    /// Google token introspection endpoint.
    /// Env: `GOOGLE_TOKENINFO_URL`
    /// Default: `https://oauth2.googleapis.com/tokeninfo`
    pub google_tokeninfo_url: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("data_path", &self.data_path)
            .field("site_name", &self.site_name)
            .field("admin_password", &"<redacted>")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("auth_max_failures", &self.auth_max_failures)
            .field("auth_lockout", &self.auth_lockout)
            .field("google_client_id", &self.google_client_id)
            .field("google_tokeninfo_url", &self.google_tokeninfo_url)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            data_path: None,
            site_name: APP_NAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_ttl_hours: 24,
            max_body_bytes: 5 * 1024 * 1024, // 5 MiB
            auth_max_failures: 5,
            auth_lockout: Duration::from_secs(300),
            google_client_id: None,
            google_tokeninfo_url: GOOGLE_TOKENINFO_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = get("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = get("KARRIERY_DATA_PATH") {
            if !path.is_empty() {
                config.data_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = get("SITE_NAME") {
            config.site_name = name;
        }

        if let Some(password) = get("ADMIN_PASSWORD") {
            if password.is_empty() {
                tracing::warn!("Empty ADMIN_PASSWORD ignored, using default");
            } else {
                config.admin_password = password;
            }
        }

        if let Some(val) = get("SESSION_TTL_HOURS") {
            match val.parse::<i64>() {
                Ok(hours) if hours > 0 => config.session_ttl_hours = hours,
                _ => tracing::warn!(value = %val, "Invalid SESSION_TTL_HOURS, using default"),
            }
        }

        if let Some(val) = get("MAX_BODY_BYTES") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_body_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BODY_BYTES, using default"),
            }
        }

        if let Some(val) = get("AUTH_MAX_FAILURES") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.auth_max_failures = n,
                _ => tracing::warn!(value = %val, "Invalid AUTH_MAX_FAILURES, using default"),
            }
        }

        if let Some(val) = get("AUTH_LOCKOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.auth_lockout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid AUTH_LOCKOUT_SECS, using default"),
            }
        }

        if let Some(id) = get("GOOGLE_CLIENT_ID") {
            if !id.is_empty() {
                config.google_client_id = Some(id);
            }
        }

        if let Some(url) = get("GOOGLE_TOKENINFO_URL") {
            if !url.is_empty() {
                config.google_tokeninfo_url = url;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            site_name: self.site_name.clone(),
            admin_password: self.admin_password.clone(),
            ..StoreOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.data_path.is_none());
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.admin_password, "admin");
        assert!(config.google_client_id.is_none());
        assert_eq!(config.google_tokeninfo_url, GOOGLE_TOKENINFO_URL);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("KARRIERY_DATA_PATH", "/tmp/k.db"),
            ("SITE_NAME", "Karriery Staging"),
            ("ADMIN_PASSWORD", "hunter2"),
            ("SESSION_TTL_HOURS", "2"),
            ("AUTH_MAX_FAILURES", "3"),
            ("AUTH_LOCKOUT_SECS", "60"),
            ("GOOGLE_CLIENT_ID", "1234.apps.googleusercontent.com"),
        ]));
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.data_path, Some(PathBuf::from("/tmp/k.db")));
        assert_eq!(config.session_ttl_hours, 2);
        assert_eq!(config.auth_max_failures, 3);
        assert_eq!(config.auth_lockout, Duration::from_secs(60));
        assert_eq!(
            config.google_client_id.as_deref(),
            Some("1234.apps.googleusercontent.com")
        );

        let options = config.store_options();
        assert_eq!(options.site_name, "Karriery Staging");
        assert_eq!(options.admin_password, "hunter2");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("SESSION_TTL_HOURS", "-1"),
            ("MAX_BODY_BYTES", "lots"),
            ("ADMIN_PASSWORD", ""),
            ("AUTH_MAX_FAILURES", "0"),
            ("AUTH_LOCKOUT_SECS", "soon"),
            ("GOOGLE_CLIENT_ID", ""),
        ]));
        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.session_ttl_hours, defaults.session_ttl_hours);
        assert_eq!(config.max_body_bytes, defaults.max_body_bytes);
        assert_eq!(config.admin_password, defaults.admin_password);
        assert_eq!(config.auth_max_failures, defaults.auth_max_failures);
        assert_eq!(config.auth_lockout, defaults.auth_lockout);
        assert!(config.google_client_id.is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", ServerConfig::default());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"admin\""));
    }
}
