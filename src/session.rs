//! The signed-in user, persisted under the `user` key.
//!
//! Sign-in is local only: any non-empty credentials are accepted and signup
//! only checks the form fields. There is no authority to verify against.

use crate::config::SessionConfig;
use crate::model::{SignupData, User};
use crate::storage::{load_json, save_json, KeyValueStore, StorageError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub const USER_KEY: &str = "user";

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").unwrap());

/// A problem with one signup form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SignupData {
    /// Check every field, collecting all problems
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut fail = |field: &'static str, message: &'static str| {
            errors.push(FieldError { field, message })
        };

        if self.name.trim().is_empty() {
            fail("name", "Name is required");
        }

        if self.email.trim().is_empty() {
            fail("email", "Email is required");
        } else if !EMAIL_RE.is_match(&self.email) {
            fail("email", "Email is invalid");
        }

        if self.password.is_empty() {
            fail("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            fail("password", "Password must be at least 6 characters");
        }

        if self.password != self.confirm_password {
            fail("confirmPassword", "Passwords do not match");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Username derived from a display name: lower-cased, whitespace removed
pub fn derive_username(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub struct SessionStore<S: KeyValueStore> {
    storage: S,
    settings: SessionConfig,
    user: Option<User>,
    signup_errors: Vec<FieldError>,
    recovered_from: Option<StorageError>,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Restore the persisted user, if any. Unreadable state yields no user.
    pub fn open(storage: S, settings: SessionConfig) -> Self {
        let (user, recovered_from) = match load_json::<User>(&storage, USER_KEY) {
            Ok(user) => (user, None),
            Err(e) => (None, Some(e)),
        };
        Self {
            storage,
            settings,
            user,
            signup_errors: Vec::new(),
            recovered_from,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Field errors from the most recent failed signup
    pub fn signup_errors(&self) -> &[FieldError] {
        &self.signup_errors
    }

    /// Error encountered while restoring, if the persisted user was discarded
    pub fn recovered_from(&self) -> Option<&StorageError> {
        self.recovered_from.as_ref()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<bool, StorageError> {
        self.simulate_delay();

        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }

        let user = User {
            id: "1".to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            avatar: Some(self.settings.default_avatar.clone()),
            name: Some(username.to_string()),
        };
        self.set_user(user)?;
        Ok(true)
    }

    pub fn signup(&mut self, data: &SignupData) -> Result<bool, StorageError> {
        self.simulate_delay();

        if let Err(errors) = data.validate() {
            self.signup_errors = errors;
            return Ok(false);
        }

        let user = User {
            id: chrono::Utc::now().timestamp_millis().to_string(),
            username: derive_username(&data.name),
            email: data.email.clone(),
            avatar: Some(self.settings.default_avatar.clone()),
            name: Some(data.name.clone()),
        };
        self.set_user(user)?;
        self.signup_errors.clear();
        Ok(true)
    }

    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.user = None;
        self.storage.remove(USER_KEY)
    }

    /// Replace the avatar of the signed-in user. Does nothing when signed out.
    pub fn update_avatar(&mut self, avatar: &str) -> Result<(), StorageError> {
        let Some(user) = &self.user else {
            return Ok(());
        };
        let mut updated = user.clone();
        updated.avatar = Some(avatar.to_string());
        self.set_user(updated)
    }

    fn set_user(&mut self, user: User) -> Result<(), StorageError> {
        save_json(&self.storage, USER_KEY, &user)?;
        self.user = Some(user);
        Ok(())
    }

    fn simulate_delay(&self) {
        if self.settings.simulated_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.settings.simulated_delay_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    fn instant() -> SessionConfig {
        SessionConfig {
            simulated_delay_ms: 0,
            ..SessionConfig::default()
        }
    }

    fn signup_data(name: &str, email: &str, password: &str, confirm: &str) -> SignupData {
        SignupData {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_login_rejects_empty_username() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        assert!(!session.login("", "x").unwrap());
        assert!(session.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_login_rejects_empty_password() {
        let mut session = SessionStore::open(MemoryStore::new(), instant());
        assert!(!session.login("alice", "").unwrap());
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_login_persists_user() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        assert!(session.login("alice", "pw").unwrap());

        let persisted: User = load_json(&storage, USER_KEY).unwrap().unwrap();
        assert_eq!(persisted.username, "alice");
        assert_eq!(persisted.email, "alice@example.com");
        assert_eq!(persisted.id, "1");
        assert_eq!(persisted.avatar.as_deref(), Some(crate::config::DEFAULT_AVATAR));
        assert_eq!(session.user(), Some(&persisted));
    }

    #[test]
    fn test_signup_derives_username() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        let ok = session
            .signup(&signup_data("Bob Lee", "b@x.com", "abcdef", "abcdef"))
            .unwrap();
        assert!(ok);

        let user = session.user().unwrap();
        assert_eq!(user.username, "boblee");
        assert_eq!(user.name.as_deref(), Some("Bob Lee"));
        assert_eq!(user.email, "b@x.com");
        assert!(user.id.parse::<i64>().unwrap() > 0);
        assert!(session.signup_errors().is_empty());

        let persisted: User = load_json(&storage, USER_KEY).unwrap().unwrap();
        assert_eq!(persisted.username, "boblee");
    }

    #[test]
    fn test_signup_mismatched_confirmation() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        let ok = session
            .signup(&signup_data("Bob Lee", "b@x.com", "abcdef", "abcdeg"))
            .unwrap();
        assert!(!ok);
        assert!(session.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
        assert_eq!(
            session.signup_errors(),
            &[FieldError {
                field: "confirmPassword",
                message: "Passwords do not match",
            }]
        );
    }

    #[test]
    fn test_signup_collects_every_field_error() {
        let errors = signup_data("  ", "not-an-email", "abc", "abc")
            .validate()
            .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
        assert_eq!(errors[1].message, "Email is invalid");
        assert_eq!(errors[2].message, "Password must be at least 6 characters");
    }

    #[test]
    fn test_signup_required_fields() {
        let errors = signup_data("", "", "", "").validate().unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec!["Name is required", "Email is required", "Password is required"]
        );
    }

    #[test]
    fn test_successful_signup_clears_previous_errors() {
        let mut session = SessionStore::open(MemoryStore::new(), instant());
        assert!(!session
            .signup(&signup_data("Bob", "b@x.com", "abcdef", "nope"))
            .unwrap());
        assert!(!session.signup_errors().is_empty());
        assert!(session
            .signup(&signup_data("Bob", "b@x.com", "abcdef", "abcdef"))
            .unwrap());
        assert!(session.signup_errors().is_empty());
    }

    #[test]
    fn test_derive_username_strips_all_whitespace() {
        assert_eq!(derive_username("  Mary\tJane  Watson "), "maryjanewatson");
    }

    #[test]
    fn test_logout_clears_persisted_user() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        session.login("alice", "pw").unwrap();
        session.logout().unwrap();
        assert!(session.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
        // Logging out twice is harmless
        session.logout().unwrap();
    }

    #[test]
    fn test_update_avatar_without_user_is_noop() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        session.update_avatar("https://example.com/a.png").unwrap();
        assert!(session.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_avatar_repersists() {
        let storage = MemoryStore::new();
        let mut session = SessionStore::open(storage.clone(), instant());
        session.login("alice", "pw").unwrap();
        session.update_avatar("https://example.com/a.png").unwrap();

        let persisted: User = load_json(&storage, USER_KEY).unwrap().unwrap();
        assert_eq!(persisted.avatar.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(persisted.username, "alice");
    }

    #[test]
    fn test_restore_previous_user() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        {
            let mut session = SessionStore::open(store.clone(), instant());
            session.login("alice", "pw").unwrap();
        }
        let session = SessionStore::open(store, instant());
        assert_eq!(session.user().unwrap().username, "alice");
        assert!(session.recovered_from().is_none());
    }

    #[test]
    fn test_restore_corrupt_user_falls_back() {
        let storage = MemoryStore::new();
        storage.set(USER_KEY, "{not json").unwrap();
        let session = SessionStore::open(storage, instant());
        assert!(session.user().is_none());
        assert!(session.recovered_from().unwrap().is_corrupt());
    }
}
