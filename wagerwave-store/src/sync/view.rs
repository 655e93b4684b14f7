use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use wagerwave_common::{Role, Session, UserRecord};

use super::{PollHandle, SyncPoller, TriggerStream};
use crate::store::{Collection, RecordStore};

/// A polled value that observers can watch.
///
/// Poll results are published only when they differ from the current value.
/// The writing context calls [`LiveView::publish`] to update its own view
/// without waiting for the next trigger.
pub struct LiveView<T> {
    tx: Arc<watch::Sender<T>>,
    handle: PollHandle,
}

impl<T> LiveView<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn spawn<R>(triggers: TriggerStream, mut read: R) -> Self
    where
        R: FnMut() -> T + Send + 'static,
    {
        let (tx, _rx) = watch::channel(read());
        let tx = Arc::new(tx);

        let publisher = Arc::clone(&tx);
        let handle = SyncPoller::spawn(triggers, read, move |value| {
            replace_if_changed(&publisher, value);
        });

        Self { tx, handle }
    }

    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Returns true if the view changed.
    pub fn publish(&self, value: T) -> bool {
        replace_if_changed(&self.tx, value)
    }

    pub fn cancel(self) {
        self.handle.cancel();
    }
}

fn replace_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

/// Who is signed in. Watches both collections since the session is joined
/// from the user list.
pub fn session_view(store: &RecordStore, every: Duration) -> LiveView<Option<Session>> {
    let reader = store.clone();
    LiveView::spawn(
        SyncPoller::triggers(store, every, &Collection::ALL),
        move || reader.session(),
    )
}

/// Regular (non-admin) users, as the admin dashboard lists them.
pub fn users_view(store: &RecordStore, every: Duration) -> LiveView<Vec<UserRecord>> {
    let reader = store.clone();
    LiveView::spawn(
        SyncPoller::triggers(store, every, &[Collection::AllUsers]),
        move || regular_users(&reader),
    )
}

/// The user list without admin accounts.
pub fn regular_users(store: &RecordStore) -> Vec<UserRecord> {
    store
        .all_users()
        .into_iter()
        .filter(|u| u.role == Role::User)
        .collect()
}
