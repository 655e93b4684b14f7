//! Record store: typed access to the persisted session and user list.
//!
//! All reads and writes of persisted records go through [`RecordStore`].
//! Two logical collections exist:
//!
//! - **session**: the `currentUser` pointer plus the authority's canonical
//!   record under `wagerWaveUser`
//! - **all users**: the `users` list, the only copy of per-user fields
//!
//! Reads never fail. Missing or malformed content reads as the empty default
//! (no session, empty list). Writes are last-writer-wins and announce
//! themselves to every other context attached to the same [`SharedStorage`].

mod medium;
mod sqlite;

pub use medium::{KeyValueMedium, MemoryMedium};
pub use sqlite::SqliteMedium;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use wagerwave_common::{CanonicalUser, Session, SessionPointer, UserRecord};

use crate::config::{StorageBackend, StorageConfig};

/// Key of the session pointer.
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Key of the user list.
pub const USERS_KEY: &str = "users";
/// Key of the authority's record for the signed-in user.
pub const CANONICAL_USER_KEY: &str = "wagerWaveUser";

/// Capacity of the change notification channel.
pub(crate) const EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The two logical collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Session,
    AllUsers,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Session, Collection::AllUsers];
}

/// Identifies one execution context (a view, a tab, a server process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Announced after every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StorageEvent {
    pub collection: Collection,
    pub origin: ContextId,
}

/// What gets written for a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub pointer: SessionPointer,
    pub canonical: Option<CanonicalUser>,
}

/// A medium shared by every context of the process, plus the channel that
/// carries storage-change notifications between them.
pub struct SharedStorage {
    medium: Box<dyn KeyValueMedium>,
    events: broadcast::Sender<StorageEvent>,
}

impl SharedStorage {
    pub fn new(medium: impl KeyValueMedium + 'static) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            medium: Box::new(medium),
            events,
        })
    }

    pub fn in_memory() -> Arc<Self> {
        Self::new(MemoryMedium::new())
    }

    /// Open the medium selected by configuration.
    pub fn open(config: &StorageConfig) -> Result<Arc<Self>, StoreError> {
        let storage = match config.backend {
            StorageBackend::Memory => Self::in_memory(),
            StorageBackend::Sqlite => Self::new(SqliteMedium::new(&config.path)?),
        };
        tracing::info!("Using {} storage medium", storage.medium.kind());
        Ok(storage)
    }

    /// A store handle bound to a fresh execution context.
    pub fn attach(self: &Arc<Self>) -> RecordStore {
        RecordStore {
            storage: Arc::clone(self),
            context: ContextId::new(),
        }
    }
}

/// Typed accessor for the persisted collections, bound to one context.
#[derive(Clone)]
pub struct RecordStore {
    storage: Arc<SharedStorage>,
    context: ContextId,
}

impl RecordStore {
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Name of the backing medium, for logs and health output.
    pub fn medium_kind(&self) -> &'static str {
        self.storage.medium.kind()
    }

    /// Change notifications from every context, this one included.
    ///
    /// Filter on [`StorageEvent::origin`] to see only foreign writes.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.storage.events.subscribe()
    }

    /// The signed-in user, joined from the pointer and the user list.
    ///
    /// A pointer naming a user that is not in the list reads as no session.
    pub fn session(&self) -> Option<Session> {
        let pointer: SessionPointer = self.read(CURRENT_USER_KEY)?;
        let user = self.all_users().into_iter().find(|u| u.id == pointer.id);
        let Some(user) = user else {
            tracing::debug!("Session points at unknown user {}, treating as signed out", pointer.id);
            return None;
        };
        let canonical = self
            .read::<CanonicalUser>(CANONICAL_USER_KEY)
            .filter(|c| c.id == pointer.id);

        Some(Session {
            user,
            started_at: pointer.started_at,
            canonical,
        })
    }

    /// Replace the session collection. `None` signs out.
    pub fn put_session(&self, entry: Option<&SessionEntry>) -> Result<(), StoreError> {
        match entry {
            Some(entry) => {
                if !self.all_users().iter().any(|u| u.id == entry.pointer.id) {
                    tracing::warn!(
                        "Session written for unknown user {}; it reads as signed out",
                        entry.pointer.id
                    );
                }
                match &entry.canonical {
                    Some(canonical) => self.write(CANONICAL_USER_KEY, canonical)?,
                    None => self.storage.medium.remove(CANONICAL_USER_KEY)?,
                }
                self.write(CURRENT_USER_KEY, &entry.pointer)?;
            }
            None => {
                self.storage.medium.remove(CURRENT_USER_KEY)?;
                self.storage.medium.remove(CANONICAL_USER_KEY)?;
            }
        }
        self.announce(Collection::Session);
        Ok(())
    }

    /// Every cached user record, in stored order.
    pub fn all_users(&self) -> Vec<UserRecord> {
        self.read(USERS_KEY).unwrap_or_default()
    }

    /// Replace the user list.
    pub fn put_all_users(&self, users: &[UserRecord]) -> Result<(), StoreError> {
        self.write(USERS_KEY, &users)?;
        self.announce(Collection::AllUsers);
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.medium.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {} content: {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.storage.medium.set(key, &raw)
    }

    fn announce(&self, collection: Collection) {
        // No subscribers is fine.
        let _ = self.storage.events.send(StorageEvent {
            collection,
            origin: self.context,
        });
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("context", &self.context)
            .field("medium", &self.storage.medium.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagerwave_common::{Role, Status};

    fn user(id: &str, username: &str, points: u64) -> UserRecord {
        let mut user = UserRecord::new(id, username);
        user.points = points;
        user
    }

    #[test]
    fn test_empty_store_reads_defaults() {
        let store = SharedStorage::in_memory().attach();
        assert!(store.session().is_none());
        assert!(store.all_users().is_empty());
    }

    #[test]
    fn test_malformed_content_reads_as_absent() {
        let storage = SharedStorage::in_memory();
        storage.medium.set(USERS_KEY, "{not json").unwrap();
        storage.medium.set(CURRENT_USER_KEY, r#"{"username":"no id"}"#).unwrap();

        let store = storage.attach();
        assert!(store.all_users().is_empty());
        assert!(store.session().is_none());
    }

    #[test]
    fn test_wrong_shape_reads_as_absent() {
        let storage = SharedStorage::in_memory();
        storage.medium.set(USERS_KEY, r#"{"id":"u1"}"#).unwrap();
        assert!(storage.attach().all_users().is_empty());
    }

    #[test]
    fn test_session_is_derived_from_user_list() {
        let store = SharedStorage::in_memory().attach();
        store.put_all_users(&[user("u1", "alice", 100)]).unwrap();
        store
            .put_session(Some(&SessionEntry {
                pointer: SessionPointer::new("u1"),
                canonical: None,
            }))
            .unwrap();

        assert_eq!(store.session().unwrap().points(), 100);

        store.put_all_users(&[user("u1", "alice", 300)]).unwrap();
        let session = store.session().unwrap();
        assert_eq!(session.points(), 300);
        assert_eq!(session.user.role, Role::User);
        assert_eq!(session.user.status, Status::Active);
    }

    #[test]
    fn test_dangling_pointer_reads_as_no_session() {
        let store = SharedStorage::in_memory().attach();
        store
            .put_session(Some(&SessionEntry {
                pointer: SessionPointer::new("ghost"),
                canonical: None,
            }))
            .unwrap();
        assert!(store.session().is_none());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_dangling_pointer_warns_on_write_not_on_read() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let store = SharedStorage::in_memory().attach();
            store
                .put_session(Some(&SessionEntry {
                    pointer: SessionPointer::new("ghost"),
                    canonical: None,
                }))
                .unwrap();
            assert_eq!(logs.contents().matches("unknown user ghost").count(), 1);

            // Pollers re-read every second; reads stay quiet.
            for _ in 0..5 {
                assert!(store.session().is_none());
            }
            assert_eq!(logs.contents().matches("unknown user ghost").count(), 1);
        });
    }

    #[test]
    fn test_legacy_current_user_record() {
        let storage = SharedStorage::in_memory();
        storage
            .medium
            .set(
                USERS_KEY,
                r#"[{"id":"u1","username":"alice","points":40,"status":"active","role":"user","password":"x"}]"#,
            )
            .unwrap();
        storage
            .medium
            .set(
                CURRENT_USER_KEY,
                r#"{"id":"u1","username":"alice","role":"user","phone":"","points":0,"status":"active"}"#,
            )
            .unwrap();

        let session = storage.attach().session().unwrap();
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.points(), 40);
    }

    #[test]
    fn test_canonical_record_must_match_pointer() {
        let store = SharedStorage::in_memory().attach();
        store.put_all_users(&[user("u1", "alice", 0)]).unwrap();
        let canonical: CanonicalUser = serde_json::from_str(
            r#"{"id":"someone-else","username":"bob","is_active":true}"#,
        )
        .unwrap();
        store
            .put_session(Some(&SessionEntry {
                pointer: SessionPointer::new("u1"),
                canonical: Some(canonical),
            }))
            .unwrap();
        assert!(store.session().unwrap().canonical.is_none());
    }

    #[test]
    fn test_clearing_session_keeps_users() {
        let store = SharedStorage::in_memory().attach();
        store.put_all_users(&[user("u1", "alice", 5)]).unwrap();
        store
            .put_session(Some(&SessionEntry {
                pointer: SessionPointer::new("u1"),
                canonical: None,
            }))
            .unwrap();

        store.put_session(None).unwrap();
        assert!(store.session().is_none());
        assert_eq!(store.all_users().len(), 1);
    }

    #[tokio::test]
    async fn test_writes_announce_origin_and_collection() {
        let storage = SharedStorage::in_memory();
        let writer = storage.attach();
        let reader = storage.attach();
        let mut rx = reader.subscribe();

        writer.put_all_users(&[]).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, Collection::AllUsers);
        assert_eq!(event.origin, writer.context());
        assert_ne!(event.origin, reader.context());

        writer.put_session(None).unwrap();
        assert_eq!(rx.recv().await.unwrap().collection, Collection::Session);
    }

    #[test]
    fn test_contexts_share_one_medium() {
        let storage = SharedStorage::in_memory();
        let a = storage.attach();
        let b = storage.attach();
        a.put_all_users(&[user("u1", "alice", 1)]).unwrap();
        assert_eq!(b.all_users(), a.all_users());
        assert_ne!(a.context(), b.context());
    }
}
