//! Per-endpoint lifecycle events.
//!
//! Each [`Endpoint`](crate::Endpoint) owns one [`EventBus`]. Listeners added to
//! one endpoint never see traffic from another.
//!
//! | Event | Fired | Payload |
//! |-------|-------|---------|
//! | `sending` | before dispatch | [`OutgoingRequest`] |
//! | `complete` | after the request settles, either way | `Result<&Response, &EndpointError>` |
//! | `success` | after `complete`, on 2xx | [`Response`] |
//! | `error` | after `complete`, on failure | [`EndpointError`] |
//!
//! Subscribing returns a [`Subscription`]; dropping it removes the listener.
//!
//! ```
//! use endpoint_http::events::EventBus;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! let subscription = bus.on_success(move |_response| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! assert_eq!(bus.listener_count(), 1);
//!
//! drop(subscription);
//! assert_eq!(bus.listener_count(), 0);
//! ```

use crate::error::EndpointError;
use crate::types::{OutgoingRequest, Response};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Request is about to be dispatched
    Sending,
    /// Request settled with a 2xx response
    Success,
    /// Request settled with an error
    Error,
    /// Request settled, either way
    Complete,
}

impl EventKind {
    /// Event name as used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Sending => "sending",
            EventKind::Success => "success",
            EventKind::Error => "error",
            EventKind::Complete => "complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type SendingListener = Arc<dyn Fn(&OutgoingRequest) + Send + Sync>;
type SuccessListener = Arc<dyn Fn(&Response) + Send + Sync>;
type ErrorListener = Arc<dyn Fn(&EndpointError) + Send + Sync>;
type CompleteListener = Arc<dyn Fn(Result<&Response, &EndpointError>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    sending: Vec<(u64, SendingListener)>,
    success: Vec<(u64, SuccessListener)>,
    error: Vec<(u64, ErrorListener)>,
    complete: Vec<(u64, CompleteListener)>,
}

impl Listeners {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove(&mut self, kind: EventKind, id: u64) {
        match kind {
            EventKind::Sending => self.sending.retain(|(i, _)| *i != id),
            EventKind::Success => self.success.retain(|(i, _)| *i != id),
            EventKind::Error => self.error.retain(|(i, _)| *i != id),
            EventKind::Complete => self.complete.retain(|(i, _)| *i != id),
        }
    }

    fn len(&self) -> usize {
        self.sending.len() + self.success.len() + self.error.len() + self.complete.len()
    }
}

/// Publish/subscribe registry for one endpoint.
///
/// Cloning shares the registry. Listeners run synchronously on the task that
/// fires the event, outside the registry lock, so a listener may itself
/// subscribe or unsubscribe.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for requests about to be dispatched.
    pub fn before_sending<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&OutgoingRequest) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id();
        listeners.sending.push((id, Arc::new(callback)));
        self.subscription(EventKind::Sending, id)
    }

    /// Listen for successful responses.
    pub fn on_success<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id();
        listeners.success.push((id, Arc::new(callback)));
        self.subscription(EventKind::Success, id)
    }

    /// Listen for failed requests.
    pub fn on_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EndpointError) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id();
        listeners.error.push((id, Arc::new(callback)));
        self.subscription(EventKind::Error, id)
    }

    /// Listen for every settled request.
    pub fn on_complete<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Result<&Response, &EndpointError>) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id();
        listeners.complete.push((id, Arc::new(callback)));
        self.subscription(EventKind::Complete, id)
    }

    /// Total number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub(crate) fn emit_sending(&self, request: &OutgoingRequest) {
        let callbacks: Vec<_> = self
            .listeners
            .lock()
            .sending
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in callbacks {
            cb(request);
        }
    }

    /// Fire `complete` then `success` or `error`.
    pub(crate) fn emit_settled(&self, outcome: Result<&Response, &EndpointError>) {
        let (complete, success, error) = {
            let listeners = self.listeners.lock();
            (
                listeners.complete.iter().map(|(_, cb)| cb.clone()).collect::<Vec<_>>(),
                listeners.success.iter().map(|(_, cb)| cb.clone()).collect::<Vec<_>>(),
                listeners.error.iter().map(|(_, cb)| cb.clone()).collect::<Vec<_>>(),
            )
        };

        for cb in complete {
            cb(outcome);
        }

        match outcome {
            Ok(response) => {
                for cb in success {
                    cb(response);
                }
            }
            Err(err) => {
                for cb in error {
                    cb(err);
                }
            }
        }
    }

    fn subscription(&self, kind: EventKind, id: u64) -> Subscription {
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            kind,
            id,
            active: true,
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    kind: EventKind,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Event kind this subscription listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the listener registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().remove(self.kind, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_response() -> Response {
        Response::new(200, BTreeMap::new(), Bytes::from_static(b"{}"))
    }

    #[test]
    fn test_complete_fires_before_success() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        let _s1 = bus.on_success(move |_| o.lock().push(EventKind::Success));
        let o = order.clone();
        let _s2 = bus.on_complete(move |_| o.lock().push(EventKind::Complete));
        let o = order.clone();
        let _s3 = bus.on_error(move |_| o.lock().push(EventKind::Error));

        bus.emit_settled(Ok(&ok_response()));

        assert_eq!(*order.lock(), vec![EventKind::Complete, EventKind::Success]);
    }

    #[test]
    fn test_error_listeners_only_on_failure() {
        let bus = EventBus::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let successes = Arc::new(AtomicUsize::new(0));

        let e = errors.clone();
        let _s1 = bus.on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });
        let s = successes.clone();
        let _s2 = bus.on_success(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_settled(Err(&EndpointError::Aborted));

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_and_detach() {
        let bus = EventBus::new();

        let s1 = bus.on_success(|_| {});
        let s2 = bus.on_error(|_| {});
        assert_eq!(bus.listener_count(), 2);

        s1.unsubscribe();
        assert_eq!(bus.listener_count(), 1);

        s2.detach();
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_buses_are_isolated() {
        let a = EventBus::new();
        let b = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let _sub = a.on_success(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        b.emit_settled(Ok(&ok_response()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        a.emit_settled(Ok(&ok_response()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_subscribe_while_firing() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();

        let _sub = bus.on_success(move |_| {
            inner_bus.on_error(|_| {}).detach();
        });

        bus.emit_settled(Ok(&ok_response()));
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let sub = bus.on_complete(|_| {});
        drop(bus);
        drop(sub);
    }
}
