//! Domain model structs persisted as JSON documents in the key-value substrate.
//!
//! Every persisted struct derives `Serialize` and `Deserialize` with the
//! field names the web client already understands (`camelCase`, with the
//! historical `experience_details` exception).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use karriery_shared::{
    ContactStatus, ExperienceBracket, ProfileVisibility, Role, Theme, TicketCategory, TicketPriority,
    TicketStatus, UserStatus,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique, compared case-sensitively.
    pub email: String,
    /// Argon2id PHC string; legacy imports may hold plaintext until the next
    /// sign-in. `None` for accounts that only sign in through the identity
    /// provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub is_google_user: bool,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub preferences: UserPreferences,
    /// Newest first, at most [`MAX_NOTIFICATIONS`](karriery_shared::constants::MAX_NOTIFICATIONS).
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserProfile {
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience: ExperienceBracket,
    pub bio: String,
    pub skills: Vec<String>,
    pub education: Vec<Education>,
    pub experience_details: Vec<ExperienceDetail>,
    pub avatar: Option<String>,
    pub phone: String,
    pub website: String,
    pub linkedin: String,
    pub github: String,
    pub twitter: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub school: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExperienceDetail {
    pub title: String,
    pub company: String,
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: NotificationSettings,
    pub privacy: PrivacySettings,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            notifications: NotificationSettings::default(),
            privacy: PrivacySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub sms: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sms: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacySettings {
    pub profile_visibility: ProfileVisibility,
    pub show_email: bool,
    pub show_phone: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: ProfileVisibility::Public,
            show_email: true,
            show_phone: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Denormalized "who is signed in on this device" record, stored apart
/// from the users collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub is_google_user: bool,
    pub profile_image: Option<String>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            is_google_user: user.is_google_user,
            profile_image: user.profile_image.clone(),
        }
    }
}

/// Row shown in the admin user table. Carries no credential or profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub is_google_user: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            last_login: user.last_login,
            is_google_user: user.is_google_user,
        }
    }
}

/// Live account breakdown, computed on every call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub google_users: usize,
    pub admin_users: usize,
    pub regular_users: usize,
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A support ticket. Owner replies and staff replies are kept in two lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub admin_replies: Vec<Reply>,
}

impl Ticket {
    /// Both reply lists merged into one conversation, oldest first.
    pub fn thread(&self) -> Vec<&Reply> {
        let mut thread: Vec<&Reply> = self.replies.iter().chain(&self.admin_replies).collect();
        thread.sort_by_key(|r| r.created_at);
        thread
    }
}

/// File metadata only; content is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Contact requests
// ---------------------------------------------------------------------------

/// A message left through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub status: ContactStatus,
    /// Account that was signed in when the form was sent, cleared when that
    /// account is deleted.
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Singleton record with site settings and the last statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemRecord {
    pub settings: SiteSettings,
    #[serde(default)]
    pub statistics: Statistics,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub version: String,
    #[serde(default)]
    pub maintenance: bool,
}

/// Collection counts. Recomputed after mutations, never incrementally.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub total_users: usize,
    pub active_users: usize,
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub closed_tickets: usize,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Registration payload. Unset profile fields get the site defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub is_google_user: bool,
    pub google_id: Option<String>,
    pub profile_image: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<ExperienceBracket>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub education: Vec<Education>,
    #[serde(rename = "experience_details")]
    pub experience_details: Vec<ExperienceDetail>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
}

impl NewUser {
    /// Registration payload for a first sign-in through the identity provider.
    pub fn from_google(profile: &GoogleProfile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            is_google_user: true,
            google_id: Some(profile.id.clone()),
            profile_image: profile.picture.clone(),
            ..Self::default()
        }
    }
}

/// Identity provider profile, used for field mapping only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTicket {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub subject: String,
    pub message: String,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDraft {
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDraft {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Shallow patch over [`UserProfile`]: each set field replaces the old value
/// wholesale (lists are replaced, not appended).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<ExperienceBracket>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub education: Option<Vec<Education>>,
    pub experience_details: Option<Vec<ExperienceDetail>>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
}

impl ProfilePatch {
    pub fn apply(self, profile: &mut UserProfile) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { profile.$field = v; })*
            };
        }
        merge!(
            title, company, location, experience, bio, skills, education,
            experience_details, phone, website, linkedin, github, twitter
        );
        if let Some(avatar) = self.avatar {
            profile.avatar = Some(avatar);
        }
    }
}

/// Shallow patch over [`UserPreferences`]: a set `notifications` or
/// `privacy` group replaces the whole group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub notifications: Option<NotificationSettings>,
    pub privacy: Option<PrivacySettings>,
}

impl PreferencesPatch {
    pub fn apply(self, prefs: &mut UserPreferences) {
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(language) = self.language {
            prefs.language = language;
        }
        if let Some(notifications) = self.notifications {
            prefs.notifications = notifications;
        }
        if let Some(privacy) = self.privacy {
            prefs.privacy = privacy;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketPatch {
    pub subject: Option<String>,
    pub message: Option<String>,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
}

impl TicketPatch {
    pub fn apply(self, ticket: &mut Ticket) {
        if let Some(subject) = self.subject {
            ticket.subject = subject;
        }
        if let Some(message) = self.message {
            ticket.message = message;
        }
        if let Some(category) = self.category {
            ticket.category = category;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub site_name: Option<String>,
    pub maintenance: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(id: &str, role: Role, at: &str) -> Reply {
        Reply {
            id: id.to_string(),
            user_id: "u1".to_string(),
            user_name: "U".to_string(),
            user_role: role,
            message: "m".to_string(),
            attachments: vec![],
            created_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn thread_merges_by_timestamp() {
        let now = Utc::now();
        let ticket = Ticket {
            id: "t".to_string(),
            user_id: "u1".to_string(),
            user_name: String::new(),
            user_email: String::new(),
            subject: "s".to_string(),
            message: "m".to_string(),
            category: TicketCategory::General,
            priority: TicketPriority::Medium,
            status: TicketStatus::Open,
            attachments: vec![],
            created_at: now,
            updated_at: now,
            replies: vec![
                reply("r1", Role::User, "2026-01-01T10:00:00Z"),
                reply("r3", Role::User, "2026-01-01T12:00:00Z"),
            ],
            admin_replies: vec![reply("a2", Role::Admin, "2026-01-01T11:00:00Z")],
        };

        let ids: Vec<&str> = ticket.thread().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r1", "a2", "r3"]);
    }

    #[test]
    fn profile_patch_is_shallow() {
        let mut profile = UserProfile {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            skills: vec!["Rust".to_string()],
            ..UserProfile::default()
        };

        ProfilePatch {
            company: Some("Google Inc".to_string()),
            skills: Some(vec!["Go".to_string()]),
            ..ProfilePatch::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.title, "Engineer");
        assert_eq!(profile.company, "Google Inc");
        assert_eq!(profile.skills, ["Go"]);
    }

    #[test]
    fn preferences_patch_replaces_groups() {
        let mut prefs = UserPreferences::default();
        PreferencesPatch {
            theme: Some(Theme::Dark),
            notifications: Some(NotificationSettings {
                email: false,
                push: false,
                sms: true,
            }),
            ..PreferencesPatch::default()
        }
        .apply(&mut prefs);

        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, "en");
        assert!(prefs.notifications.sms);
        assert!(!prefs.notifications.email);
        assert_eq!(prefs.privacy, PrivacySettings::default());
    }

    #[test]
    fn user_document_field_names() {
        let json = serde_json::json!({
            "id": "user_1_abc",
            "name": "Ana",
            "email": "ana@example.com",
            "role": "user",
            "status": "active",
            "isGoogleUser": false,
            "googleId": null,
            "createdAt": "2026-01-01T00:00:00Z",
            "lastLogin": "2026-01-01T00:00:00Z",
            "profile": {
                "title": "Designer",
                "experience": "3-5 years",
                "experience_details": [{"title": "Lead", "company": "X", "period": "2020", "description": ""}]
            },
            "preferences": {"privacy": {"profileVisibility": "private"}}
        });

        let user: User = serde_json::from_value(json).unwrap();
        let profile = user.profile.as_ref().unwrap();
        assert_eq!(profile.experience, ExperienceBracket::Intermediate);
        assert_eq!(profile.experience_details.len(), 1);
        assert_eq!(
            user.preferences.privacy.profile_visibility,
            ProfileVisibility::Private
        );
        assert!(user.preferences.privacy.show_email);
        assert!(user.notifications.is_empty());
        assert!(user.password.is_none());

        let back = serde_json::to_value(&user).unwrap();
        assert!(back.get("isGoogleUser").is_some());
        assert!(back.get("password").is_none());
    }
}
