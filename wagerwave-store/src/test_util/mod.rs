//! Test doubles shared by unit and integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use wagerwave_common::protocol::{PHONE_REGISTERED_MESSAGE, USERNAME_EXISTS_MESSAGE};
use wagerwave_common::CanonicalUser;

use crate::auth::{Authority, AuthorityError};
use crate::config::Config;
use crate::store::SharedStorage;
use crate::AppState;

struct Account {
    user: CanonicalUser,
    password: String,
}

/// In-memory authority with the same conflict messages as the real one.
#[derive(Default)]
pub struct StubAuthority {
    accounts: Mutex<Vec<Account>>,
    fail_next: AtomicBool,
    reject_next: Mutex<Option<String>>,
    register_calls: AtomicUsize,
}

impl StubAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account directly and return its id.
    pub fn add_account(&self, username: &str, password: &str, phone: Option<&str>) -> String {
        let user = canonical(username, phone);
        let id = user.id.clone();
        self.accounts.lock().unwrap().push(Account {
            user,
            password: password.to_string(),
        });
        id
    }

    /// Mark the account inactive on the authority side.
    pub fn deactivate(&self, username: &str) {
        for account in self.accounts.lock().unwrap().iter_mut() {
            if account.user.username == username {
                account.user.is_active = false;
            }
        }
    }

    /// The next call of either kind fails as if the network were down.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next registration is refused with `message` and no code.
    pub fn reject_next_registration(&self, message: &str) {
        *self.reject_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    fn check_transport(&self) -> Result<(), AuthorityError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthorityError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Authority for StubAuthority {
    async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<CanonicalUser>, AuthorityError> {
        self.check_transport()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .find(|a| a.user.username == username && a.password == password)
            .map(|a| a.user.clone()))
    }

    async fn register_user(
        &self,
        username: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<CanonicalUser, AuthorityError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.check_transport()?;

        if let Some(message) = self.reject_next.lock().unwrap().take() {
            return Err(AuthorityError::Rejected { code: None, message });
        }

        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.user.username == username) {
            return Err(AuthorityError::Rejected {
                code: Some("P0001".to_string()),
                message: USERNAME_EXISTS_MESSAGE.to_string(),
            });
        }
        if phone.is_some() && accounts.iter().any(|a| a.user.phone.as_deref() == phone) {
            return Err(AuthorityError::Rejected {
                code: Some("P0001".to_string()),
                message: PHONE_REGISTERED_MESSAGE.to_string(),
            });
        }

        let user = canonical(username, phone);
        accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        Ok(user)
    }
}

fn canonical(username: &str, phone: Option<&str>) -> CanonicalUser {
    CanonicalUser {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        phone: phone.map(str::to_string),
        is_active: true,
        created_at: Some(Utc::now().to_rfc3339()),
        extra: serde_json::Map::new(),
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.admin_usernames = vec!["root".to_string()];
    config.logging.level = "debug".to_string();
    config
}

/// App state over in-memory storage and a stub authority seeded with
/// `alice`/`secret` and the admin `root`/`toor`.
pub fn create_test_state() -> (Arc<AppState>, Arc<SharedStorage>, Arc<StubAuthority>) {
    let storage = SharedStorage::in_memory();
    let authority = Arc::new(StubAuthority::new());
    authority.add_account("alice", "secret", Some("555-0100"));
    authority.add_account("root", "toor", None);

    let state = AppState::new(test_config(), &storage, authority.clone());
    (Arc::new(state), storage, authority)
}
