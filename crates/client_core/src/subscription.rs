//! Typed listener interface over the real-time document store.

use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::warn;

use crate::config::Settings;

pub type Callback<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Stops a subscription when called or dropped. Changes already delivered
/// stay applied.
#[must_use = "dropping an Unsubscribe cancels the subscription"]
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Unsubscribe {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One entity stream of the document store: `on_add` fires for creations and
/// updates, `on_remove` for deletions.
pub trait EntityFeed<T>: Send + Sync {
    fn subscribe(&self, on_add: Callback<T>, on_remove: Callback<T>) -> Unsubscribe;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Added(T),
    Removed(T),
}

/// In-process feed backed by a broadcast channel. Each subscriber gets its
/// own receiver, drained by a spawned task until unsubscribed.
pub struct BroadcastFeed<T> {
    changes: broadcast::Sender<Change<T>>,
}

impl<T> BroadcastFeed<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self { changes }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.feed_capacity)
    }

    pub fn publish(&self, change: Change<T>) {
        // No subscribers is not an error for a feed.
        let _ = self.changes.send(change);
    }

    pub fn publish_added(&self, entity: T) {
        self.publish(Change::Added(entity));
    }

    pub fn publish_removed(&self, entity: T) {
        self.publish(Change::Removed(entity));
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

impl<T> EntityFeed<T> for BroadcastFeed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, on_add: Callback<T>, on_remove: Callback<T>) -> Unsubscribe {
        let mut changes = BroadcastStream::new(self.changes.subscribe());
        let task = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                match change {
                    Ok(Change::Added(entity)) => on_add(entity),
                    Ok(Change::Removed(entity)) => on_remove(entity),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "entity feed lagged; changes dropped");
                    }
                }
            }
        });
        Unsubscribe::new(move || task.abort())
    }
}
