pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod prefill;
pub mod routes;
pub mod store;
pub mod sync;
pub mod test_util;
pub mod token;

pub use auth::{AuthBridge, AuthError, Authority, AuthorityError, RegistrationForm, SupabaseAuthority};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ledger::{LedgerError, PointsLedger};
pub use prefill::{CredentialPrefill, PrefillOutcome, PrefillParams};
pub use store::{Collection, RecordStore, SharedStorage, StorageEvent, StoreError};
pub use sync::{LiveView, PollHandle, SyncPoller, Trigger};

use std::sync::Arc;

use wagerwave_common::{Session, UserRecord};

/// Shared application state.
///
/// Must be built inside a tokio runtime: the views spawn their pollers.
pub struct AppState {
    pub config: Config,
    /// Store handle for this process's execution context.
    pub store: RecordStore,
    pub auth: AuthBridge,
    pub ledger: PointsLedger,
    pub prefill: CredentialPrefill,
    /// Who is signed in, refreshed every `sync.session_interval_ms`.
    pub session_view: LiveView<Option<Session>>,
    /// Regular users for the admin dashboard, refreshed every `sync.users_interval_ms`.
    pub users_view: LiveView<Vec<UserRecord>>,
}

impl AppState {
    pub fn new(config: Config, storage: &Arc<SharedStorage>, authority: Arc<dyn Authority>) -> Self {
        let store = storage.attach();

        let auth = AuthBridge::new(store.clone(), authority, config.auth.admin_usernames.clone());
        let ledger = PointsLedger::new(store.clone(), config.ledger.top_up_amounts.clone());
        let prefill = CredentialPrefill::new(config.prefill.scrub_delay());
        let session_view = sync::session_view(&store, config.sync.session_interval());
        let users_view = sync::users_view(&store, config.sync.users_interval());

        tracing::info!(
            "Session store ready (context {}, {} medium)",
            store.context(),
            store.medium_kind()
        );

        Self {
            config,
            store,
            auth,
            ledger,
            prefill,
            session_view,
            users_view,
        }
    }

    /// Publish this context's own writes to the views right away.
    pub fn refresh_views(&self) {
        self.session_view.publish(self.store.session());
        self.users_view.publish(sync::regular_users(&self.store));
    }
}
