/// Application name
pub const APP_NAME: &str = "Karriery";

/// Default version string written into a fresh system record
pub const DEFAULT_SITE_VERSION: &str = "1.0.0";

/// Substrate key of the users collection
pub const USERS_KEY: &str = "karriery_users.json";

/// Substrate key of the support ticket collection
pub const TICKETS_KEY: &str = "karriery_support.json";

/// Substrate key of the contact-form inbox
pub const CONTACTS_KEY: &str = "karriery_contacts.json";

/// Substrate key of the system settings / statistics record
pub const SYSTEM_KEY: &str = "karriery_system.json";

/// Substrate key of the current session snapshot
pub const CURRENT_USER_KEY: &str = "karriery_current_user";

/// Fixed id of the bootstrap administrator
pub const ADMIN_ID: &str = "admin_001";

/// Login name of the bootstrap administrator
pub const ADMIN_EMAIL: &str = "admin";

/// Password given to the bootstrap administrator when none is configured
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Maximum number of notifications kept per user (newest first)
pub const MAX_NOTIFICATIONS: usize = 50;

/// Length of the random suffix in generated record ids
pub const ID_SUFFIX_LEN: usize = 9;

/// Prefix shared by every argon2 PHC credential string
pub const PHC_PREFIX: &str = "$argon2";

/// Session token size in bytes (hex-encoded on the wire)
pub const SESSION_TOKEN_SIZE: usize = 32;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;
