//! Auth bridge: turns the authority's verdict into local records.
//!
//! The authority owns identity and password checks. This module caches a
//! compatibility copy of each account in the user list (points, status, role)
//! and writes the session pointer on login.
//!
//! Admin role comes from the local user list, not from the authority. Anyone
//! who can write the list can grant themselves admin; the `admin_usernames`
//! setting is how entries get that role in the first place.

mod authority;
mod supabase;

pub use authority::{Authority, AuthorityError, Rejection};
pub use supabase::SupabaseAuthority;

use std::sync::Arc;

use serde::Deserialize;

use wagerwave_common::{CanonicalUser, Role, Session, SessionPointer, UserRecord};

use crate::store::{RecordStore, SessionEntry, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    AccountDeactivated,
    #[error("Admin role required")]
    NotAdmin,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Phone number already registered")]
    PhoneTaken,
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),
    #[error(transparent)]
    Authority(#[from] AuthorityError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sign-up form as submitted by the UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
}

pub struct AuthBridge {
    store: RecordStore,
    authority: Arc<dyn Authority>,
    admin_usernames: Vec<String>,
}

impl AuthBridge {
    pub fn new(store: RecordStore, authority: Arc<dyn Authority>, admin_usernames: Vec<String>) -> Self {
        Self {
            store,
            authority,
            admin_usernames,
        }
    }

    /// Verify credentials with the authority and start a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let canonical = self.resolve(username, password).await?;
        self.establish(canonical, false)
    }

    /// Like [`AuthBridge::login`], but only admins get a session.
    pub async fn admin_login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let canonical = self.resolve(username, password).await?;
        self.establish(canonical, true)
    }

    /// Create an account with the authority and cache it locally.
    ///
    /// Does not sign the new user in.
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserRecord, AuthError> {
        let username = form.username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if form.password.trim().is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if form.confirm_password.trim().is_empty() {
            return Err(AuthError::MissingField("confirmPassword"));
        }
        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        let phone = non_empty(form.phone.as_deref());

        let known = self.store.all_users();
        if known.iter().any(|u| u.username == username) {
            tracing::warn!("Registration rejected locally: username {} exists", username);
            return Err(AuthError::UsernameTaken);
        }
        if let Some(phone) = phone {
            if known.iter().any(|u| u.phone.as_deref() == Some(phone)) {
                tracing::warn!("Registration rejected locally: phone already registered");
                return Err(AuthError::PhoneTaken);
            }
        }

        let canonical = self
            .authority
            .register_user(username, &form.password, phone)
            .await
            .map_err(|e| match e.classify() {
                Rejection::UsernameTaken => AuthError::UsernameTaken,
                Rejection::PhoneTaken => AuthError::PhoneTaken,
                Rejection::Unknown => match e {
                    AuthorityError::Rejected { message, .. } => AuthError::RegistrationFailed(message),
                    other => AuthError::Authority(other),
                },
            })?;

        let mut record = UserRecord::new(canonical.id.clone(), canonical.username.clone())
            .with_phone(phone.map(str::to_string).or(canonical.phone.clone()))
            .with_referral_code(non_empty(form.referral_code.as_deref()).map(str::to_string));
        record.created_at = canonical.created_at.clone();
        if self.is_listed_admin(&record.username) {
            record.role = Role::Admin;
        }

        // Re-read: another context may have written while the authority call
        // was in flight.
        let mut users = self.store.all_users();
        if !users.iter().any(|u| u.id == record.id) {
            users.push(record.clone());
            self.store.put_all_users(&users)?;
        }

        tracing::info!("Registered user {} ({})", record.username, record.id);
        Ok(record)
    }

    /// End the session. Cached user records stay.
    pub fn logout(&self) -> Result<(), AuthError> {
        if let Some(session) = self.store.session() {
            tracing::info!("User {} signed out", session.user.username);
        }
        self.store.put_session(None)?;
        Ok(())
    }

    async fn resolve(&self, username: &str, password: &str) -> Result<CanonicalUser, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if password.trim().is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let canonical = self
            .authority
            .authenticate_user(username, password)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Login failed for {}: invalid credentials", username);
                AuthError::InvalidCredentials
            })?;

        if !canonical.is_active {
            tracing::warn!("Login refused for {}: deactivated by authority", username);
            return Err(AuthError::AccountDeactivated);
        }
        Ok(canonical)
    }

    /// Merge the canonical identity into the user list and point the session
    /// at it. Nothing is written when a check fails.
    fn establish(&self, canonical: CanonicalUser, admin_only: bool) -> Result<Session, AuthError> {
        let mut users = self.store.all_users();
        let listed_admin = self.is_listed_admin(&canonical.username);

        let record = match users.iter_mut().find(|u| u.id == canonical.id) {
            Some(existing) => {
                if !existing.status.is_active() {
                    tracing::warn!("Login refused for {}: deactivated locally", existing.username);
                    return Err(AuthError::AccountDeactivated);
                }
                existing.username = canonical.username.clone();
                if let Some(phone) = non_empty(canonical.phone.as_deref()) {
                    existing.phone = Some(phone.to_string());
                }
                if listed_admin {
                    existing.role = Role::Admin;
                }
                existing.clone()
            }
            None => {
                let mut record = UserRecord::new(canonical.id.clone(), canonical.username.clone())
                    .with_phone(canonical.phone.clone());
                record.created_at = canonical.created_at.clone();
                if listed_admin {
                    record.role = Role::Admin;
                }
                users.push(record.clone());
                record
            }
        };

        if admin_only && !record.is_admin() {
            tracing::warn!("Admin login refused for {}: role is {}", record.username, record.role);
            return Err(AuthError::NotAdmin);
        }

        self.store.put_all_users(&users)?;
        let pointer = SessionPointer::new(record.id.clone());
        let started_at = pointer.started_at;
        self.store.put_session(Some(&SessionEntry {
            pointer,
            canonical: Some(canonical.clone()),
        }))?;

        tracing::info!("User {} signed in as {}", record.username, record.role);
        Ok(Session {
            user: record,
            started_at,
            canonical: Some(canonical),
        })
    }

    fn is_listed_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|a| a == username)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
