//! Listener registries and fan-out for connection events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::error;

use linguahub_core::error::AppError;

use crate::message::types::ServerMessage;

/// Handler for inbound application messages.
pub type MessageHandler = dyn Fn(&ServerMessage) + Send + Sync;
/// Handler for connection-level errors.
pub type ErrorHandler = dyn Fn(&AppError) + Send + Sync;
/// Handler for connected/disconnected transitions.
pub type StatusHandler = dyn Fn(bool) + Send + Sync;
/// Handler for authentication failures.
pub type AuthErrorHandler = dyn Fn(&str) + Send + Sync;

/// Keeps a registered listener alive; the listener is unregistered when
/// the subscription is dropped or [`Subscription::cancel`] is called.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Unregisters the listener now.
    pub fn cancel(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Leaves the listener registered for the lifetime of the client.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

/// Ordered set of listeners of one kind.
struct Registry<H: ?Sized> {
    next_id: AtomicU64,
    entries: Arc<Mutex<Vec<(u64, Arc<H>)>>>,
}

impl<H: ?Sized + Send + Sync + 'static> Registry<H> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn add(&self, handler: Arc<H>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, handler));

        let entries: Weak<Mutex<Vec<(u64, Arc<H>)>>> = Arc::downgrade(&self.entries);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries.lock().retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Snapshot in registration order, taken so handlers run without the
    /// registry lock held.
    fn snapshot(&self) -> Vec<Arc<H>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

/// The four independent listener sets of the connection manager.
pub(crate) struct Listeners {
    message: Registry<MessageHandler>,
    error: Registry<ErrorHandler>,
    status: Registry<StatusHandler>,
    auth_error: Registry<AuthErrorHandler>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self {
            message: Registry::new(),
            error: Registry::new(),
            status: Registry::new(),
            auth_error: Registry::new(),
        }
    }

    pub(crate) fn on_message(
        &self,
        handler: impl Fn(&ServerMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.message.add(Arc::new(handler))
    }

    pub(crate) fn on_error(
        &self,
        handler: impl Fn(&AppError) + Send + Sync + 'static,
    ) -> Subscription {
        self.error.add(Arc::new(handler))
    }

    pub(crate) fn on_status_change(
        &self,
        handler: impl Fn(bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.status.add(Arc::new(handler))
    }

    pub(crate) fn on_auth_error(
        &self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        self.auth_error.add(Arc::new(handler))
    }

    pub(crate) fn notify_message(&self, message: &ServerMessage) {
        dispatch(self.message.snapshot(), |handler| handler(message));
    }

    pub(crate) fn notify_error(&self, err: &AppError) {
        dispatch(self.error.snapshot(), |handler| handler(err));
    }

    pub(crate) fn notify_status(&self, connected: bool) {
        dispatch(self.status.snapshot(), |handler| handler(connected));
    }

    pub(crate) fn notify_auth_error(&self, reason: &str) {
        dispatch(self.auth_error.snapshot(), |handler| handler(reason));
    }
}

/// Invokes every handler in registration order. A panicking handler is
/// logged and must not stop the remaining handlers or reach the caller.
fn dispatch<H: ?Sized>(handlers: Vec<Arc<H>>, mut call: impl FnMut(&H)) {
    for handler in handlers {
        if catch_unwind(AssertUnwindSafe(|| call(handler.as_ref()))).is_err() {
            error!("realtime listener panicked during notification");
        }
    }
}
