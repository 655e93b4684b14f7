//! Sync poller: re-read the record store on a timer and on storage changes.
//!
//! A poller consumes a stream of [`Trigger`]s. The default stream merges a
//! fixed interval with change notifications written by other contexts, so a
//! push channel can later replace the interval without touching callers.

mod view;

pub use view::{regular_users, session_view, users_view, LiveView};

use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::Stream;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt as TokioStreamExt;

use crate::store::{Collection, RecordStore};

/// Why a poller re-read the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The interval elapsed.
    Tick,
    /// Another context wrote this collection.
    StorageChanged(Collection),
    /// Notifications were dropped; state may have changed.
    Resync,
}

pub type TriggerStream = Pin<Box<dyn Stream<Item = Trigger> + Send>>;

/// Cancels the poll loop when cancelled or dropped.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop both the interval and the notification subscription.
    pub fn cancel(mut self) {
        self.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

pub struct SyncPoller;

impl SyncPoller {
    /// Default trigger stream: a tick every `every`, plus a trigger for each
    /// foreign write to one of `interest`.
    ///
    /// The subscription starts now, so writes made after this call are seen
    /// even if the stream is polled later.
    pub fn triggers(store: &RecordStore, every: Duration, interest: &[Collection]) -> TriggerStream {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ticks = TokioStreamExt::map(IntervalStream::new(interval), |_| Trigger::Tick);

        let own = store.context();
        let interest = interest.to_vec();
        let changes = TokioStreamExt::filter_map(BroadcastStream::new(store.subscribe()), move |result| {
            match result {
                Ok(event) if event.origin != own && interest.contains(&event.collection) => {
                    Some(Trigger::StorageChanged(event.collection))
                }
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!("Poller lagged by {} notifications, resyncing", skipped);
                    Some(Trigger::Resync)
                }
            }
        });

        Box::pin(TokioStreamExt::merge(ticks, changes))
    }

    /// Invoke `callback(read())` now, then again on every trigger.
    ///
    /// The first call happens before this returns. Consumers must treat the
    /// callback as idempotent: ticks and notifications are not ordered.
    pub fn spawn<T, R, C>(mut triggers: TriggerStream, mut read: R, mut callback: C) -> PollHandle
    where
        T: Send + 'static,
        R: FnMut() -> T + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        callback(read());

        let task = tokio::spawn(async move {
            while let Some(trigger) = TokioStreamExt::next(&mut triggers).await {
                tracing::debug!(?trigger, "Poll triggered");
                callback(read());
            }
        });

        PollHandle { task: Some(task) }
    }

    /// [`SyncPoller::spawn`] over the default trigger stream.
    pub fn poll<T, R, C>(
        store: &RecordStore,
        every: Duration,
        interest: &[Collection],
        read: R,
        callback: C,
    ) -> PollHandle
    where
        T: Send + 'static,
        R: FnMut() -> T + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        Self::spawn(Self::triggers(store, every, interest), read, callback)
    }
}
