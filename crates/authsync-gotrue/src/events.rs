//! In-process auth event fan-out.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use authsync_core::AuthEvent;

/// Fans auth events out to every live subscriber.
///
/// Each subscriber has its own unbounded queue, so a slow consumer never
/// loses or reorders events. Subscribers whose stream was dropped are pruned
/// on the next emission.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber whose first event is produced by `initial`.
    ///
    /// `initial` runs while registration is exclusive, so no emission can
    /// slip between the initial event and the subscriber going live.
    pub fn subscribe_with<F>(&self, initial: F) -> AuthEventStream
    where
        F: FnOnce() -> AuthEvent,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscribers = self.lock();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(initial());
        subscribers.push(tx);
        drop(subscribers);

        AuthEventStream::new(async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        })
    }

    /// Deliver an event to all live subscribers.
    pub fn emit(&self, event: AuthEvent) {
        self.emit_with(|| event);
    }

    /// Produce an event and deliver it under the subscriber lock.
    ///
    /// State changes made inside `update` are ordered exactly like their
    /// events: a concurrent emission can neither deliver first nor observe
    /// the state before this event is queued.
    pub fn emit_with<F>(&self, update: F)
    where
        F: FnOnce() -> AuthEvent,
    {
        let mut subscribers = self.lock();
        let event = update();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|tx| !tx.is_closed()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<AuthEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A subscription to auth-state changes. Dropping it unsubscribes.
pub struct AuthEventStream {
    inner: Pin<Box<dyn Stream<Item = AuthEvent> + Send>>,
}

impl AuthEventStream {
    pub(crate) fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = AuthEvent> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for AuthEventStream {
    type Item = AuthEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for AuthEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEventStream").finish_non_exhaustive()
    }
}
