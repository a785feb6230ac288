//! Account operations: registration, sign-in, profile edits and admin
//! management of [`User`] records.

use chrono::Utc;

use karriery_shared::credential::{hash_password, is_legacy, verify_password};
use karriery_shared::{generate_id, Role, UserStatus};

use crate::error::{Result, StoreError};
use crate::models::{
    GoogleProfile, NewUser, PreferencesPatch, ProfilePatch, User, UserProfile, UserStats,
    UserSummary,
};
use crate::store::{is_bootstrap_admin, RecordStore};

impl RecordStore {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Snapshot of every user. Changes to the returned values are not
    /// persisted until handed back through an update method.
    pub fn get_all_users(&self) -> Vec<User> {
        self.load_users()
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.load_users().into_iter().find(|u| u.id == id)
    }

    /// Exact, case-sensitive email lookup.
    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.load_users().into_iter().find(|u| u.email == email)
    }

    /// Admin table rows, without credentials or profile data.
    pub fn get_all_users_for_admin(&self) -> Vec<UserSummary> {
        self.load_users().iter().map(UserSummary::from).collect()
    }

    /// Live account breakdown (computed now, unlike [`Self::get_statistics`]).
    pub fn get_user_stats(&self) -> UserStats {
        let users = self.load_users();
        let admin_users = users.iter().filter(|u| u.role.is_admin()).count();
        UserStats {
            total_users: users.len(),
            active_users: users
                .iter()
                .filter(|u| u.status == UserStatus::Active)
                .count(),
            google_users: users.iter().filter(|u| u.is_google_user).count(),
            admin_users,
            regular_users: users.len() - admin_users,
        }
    }

    /// Case-insensitive substring search over name, email, profile title
    /// and profile company. Users without a profile only match on name or
    /// email.
    pub fn search_users(&self, query: &str) -> Vec<User> {
        let needle = query.to_lowercase();
        self.load_users()
            .into_iter()
            .filter(|u| {
                contains_ci(&u.name, &needle)
                    || contains_ci(&u.email, &needle)
                    || u.profile.as_ref().is_some_and(|p| {
                        contains_ci(&p.title, &needle) || contains_ci(&p.company, &needle)
                    })
            })
            .collect()
    }

    /// One user serialized as pretty JSON, credential omitted.
    pub fn export_user_data(&self, id: &str) -> Option<String> {
        let mut user = self.get_user(id)?;
        user.password = None;
        match serde_json::to_string_pretty(&user) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(id, error = %e, "failed to serialize user export");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Sign-in
    // ------------------------------------------------------------------

    /// Check an email / password pair and stamp `lastLogin`.
    ///
    /// Legacy plaintext credentials are re-hashed on success.
    pub fn authenticate_user(&mut self, email: &str, password: &str) -> Result<User> {
        let mut users = self.load_users();

        let user = users
            .iter_mut()
            .find(|u| u.email == email)
            .ok_or(StoreError::InvalidCredentials)?;

        let stored = user
            .password
            .as_deref()
            .ok_or(StoreError::InvalidCredentials)?;
        let matches = verify_password(stored, password).unwrap_or_else(|e| {
            tracing::warn!(id = %user.id, error = %e, "unreadable stored credential");
            false
        });
        if !matches {
            return Err(StoreError::InvalidCredentials);
        }
        if user.status == UserStatus::Inactive {
            return Err(StoreError::AccountInactive);
        }

        if is_legacy(stored) {
            match hash_password(password) {
                Ok(hash) => {
                    tracing::info!(id = %user.id, "upgrading legacy plaintext credential");
                    user.password = Some(hash);
                }
                Err(e) => tracing::warn!(id = %user.id, error = %e, "legacy credential kept"),
            }
        }
        user.last_login = Utc::now();

        let user = user.clone();
        self.save_users(&users);
        Ok(user)
    }

    /// Match an identity-provider profile by `googleId`, then by email.
    ///
    /// Returns `None` when nobody matches; creating the account is left to
    /// the caller (see [`NewUser::from_google`]).
    pub fn authenticate_google_user(&mut self, profile: &GoogleProfile) -> Option<User> {
        let mut users = self.load_users();

        let index = users
            .iter()
            .position(|u| u.google_id.as_deref() == Some(profile.id.as_str()))
            .or_else(|| users.iter().position(|u| u.email == profile.email))?;

        let user = &mut users[index];
        user.last_login = Utc::now();
        if profile.picture.is_some() {
            user.profile_image = profile.picture.clone();
        }

        let user = user.clone();
        self.save_users(&users);
        Some(user)
    }

    // ------------------------------------------------------------------
    // Create / update / delete
    // ------------------------------------------------------------------

    /// Register a new account. Fails with [`StoreError::DuplicateEmail`] if
    /// the email is taken; nothing is written in that case.
    pub fn create_user(&mut self, data: NewUser) -> Result<User> {
        let mut users = match self.try_users() {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "cannot read users, new account will not be persisted");
                let password = data.password.as_deref().map(hash_password).transpose()?;
                return Ok(build_user(data, password, &[]));
            }
        };

        if users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::DuplicateEmail(data.email));
        }

        let password = data.password.as_deref().map(hash_password).transpose()?;
        let user = build_user(data, password, &users);
        users.push(user.clone());

        if self.save_users(&users) {
            tracing::info!(id = %user.id, google = user.is_google_user, "user created");
            self.update_statistics();
        }
        Ok(user)
    }

    /// Replace a whole record by id. `false` if the id is unknown, if the
    /// new email belongs to someone else, or if the change would strip the
    /// bootstrap admin of its identity or role.
    ///
    /// The credential is never written as plaintext: a missing password
    /// keeps the stored one, and a plaintext value is hashed first. Use
    /// [`Self::change_password`] for deliberate password changes.
    pub fn update_user(&mut self, mut user: User) -> bool {
        let updated = self
            .modify_users("update_user", |users| {
                if users.iter().any(|u| u.id != user.id && u.email == user.email) {
                    tracing::warn!(id = %user.id, "update rejected: email in use");
                    return None;
                }
                let slot = users.iter_mut().find(|u| u.id == user.id)?;
                if is_bootstrap_admin(slot) && !(is_bootstrap_admin(&user) && user.role.is_admin())
                {
                    tracing::warn!(id = %user.id, "update rejected: bootstrap admin");
                    return None;
                }
                user.password = match user.password.take() {
                    None => slot.password.clone(),
                    Some(given) if slot.password.as_deref() == Some(given.as_str()) => Some(given),
                    Some(given) if is_legacy(&given) => match hash_password(&given) {
                        Ok(hash) => Some(hash),
                        Err(e) => {
                            tracing::error!(id = %user.id, error = %e, "update rejected: hashing failed");
                            return None;
                        }
                    },
                    Some(given) => Some(given),
                };
                *slot = user;
                Some(())
            })
            .is_some();

        if updated {
            self.update_statistics();
        }
        updated
    }

    /// Shallow-merge `patch` into the user's profile.
    pub fn update_user_profile(&mut self, id: &str, patch: ProfilePatch) -> Option<User> {
        self.modify_users("update_user_profile", |users| {
            let user = users.iter_mut().find(|u| u.id == id)?;
            patch.apply(user.profile.get_or_insert_with(UserProfile::default));
            Some(user.clone())
        })
    }

    /// Shallow-merge `patch` into the user's preferences.
    pub fn update_user_preferences(&mut self, id: &str, patch: PreferencesPatch) -> Option<User> {
        self.modify_users("update_user_preferences", |users| {
            let user = users.iter_mut().find(|u| u.id == id)?;
            patch.apply(&mut user.preferences);
            Some(user.clone())
        })
    }

    pub fn change_user_role(&mut self, id: &str, role: Role) -> bool {
        self.modify_users("change_user_role", |users| {
            let user = users.iter_mut().find(|u| u.id == id)?;
            if is_bootstrap_admin(user) && !role.is_admin() {
                tracing::warn!(id, "refusing to demote bootstrap admin");
                return None;
            }
            user.role = role;
            Some(())
        })
        .is_some()
    }

    pub fn change_user_status(&mut self, id: &str, status: UserStatus) -> bool {
        let changed = self
            .modify_users("change_user_status", |users| {
                let user = users.iter_mut().find(|u| u.id == id)?;
                if is_bootstrap_admin(user) && status == UserStatus::Inactive {
                    tracing::warn!(id, "refusing to deactivate bootstrap admin");
                    return None;
                }
                user.status = status;
                Some(())
            })
            .is_some();

        if changed {
            self.update_statistics();
        }
        changed
    }

    /// Replace the user's credential with a hash of `new_password`.
    pub fn change_password(&mut self, id: &str, new_password: &str) -> bool {
        let hash = match hash_password(new_password) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(id, error = %e, "cannot hash new password");
                return false;
            }
        };
        self.modify_users("change_password", |users| {
            let user = users.iter_mut().find(|u| u.id == id)?;
            user.password = Some(hash);
            Some(())
        })
        .is_some()
    }

    /// Remove a user. Returns `true` if a record was removed.
    pub fn delete_user(&mut self, id: &str) -> bool {
        let removed = self
            .modify_users("delete_user", |users| {
                let index = users.iter().position(|u| u.id == id)?;
                if is_bootstrap_admin(&users[index]) {
                    tracing::warn!(id, "refusing to delete bootstrap admin");
                    return None;
                }
                users.remove(index);
                Some(())
            })
            .is_some();

        if removed {
            self.detach_contacts(id);
            self.update_statistics();
        }
        removed
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn build_user(data: NewUser, password: Option<String>, existing: &[User]) -> User {
    let id = loop {
        let candidate = generate_id("user");
        if !existing.iter().any(|u| u.id == candidate) {
            break candidate;
        }
    };
    let now = Utc::now();

    let profile = UserProfile {
        title: data.title.unwrap_or_else(|| "Professional".to_string()),
        company: data.company.unwrap_or_default(),
        location: data.location.unwrap_or_default(),
        experience: data.experience.unwrap_or_default(),
        bio: data
            .bio
            .unwrap_or_else(|| "Welcome to my professional profile!".to_string()),
        skills: data.skills,
        education: data.education,
        experience_details: data.experience_details,
        avatar: data.profile_image.clone(),
        phone: data.phone.unwrap_or_default(),
        website: data.website.unwrap_or_default(),
        linkedin: data.linkedin.unwrap_or_default(),
        github: data.github.unwrap_or_default(),
        twitter: data.twitter.unwrap_or_default(),
    };

    User {
        id,
        name: data.name,
        email: data.email,
        password,
        role: Role::User,
        status: UserStatus::Active,
        is_google_user: data.is_google_user,
        google_id: data.google_id,
        profile_image: data.profile_image,
        created_at: now,
        last_login: now,
        profile: Some(profile),
        preferences: Default::default(),
        notifications: Vec::new(),
    }
}
