use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use tracing::warn;

/// Error returned by an observer handler.
///
/// The bus never propagates it; it is logged and counted in [`NotifyReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ObserverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer failed: {}", self.0)
    }
}

impl std::error::Error for ObserverError {}

pub type HandlerResult = Result<(), ObserverError>;

/// Outcome of one [`ObserverBus::notify`] fan-out.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Plain subscriber list scoped to one owner.
///
/// `O` is usually a trait object whose methods all have default no-op
/// bodies, so a subscriber that does not care about an event simply does not
/// override the handler.
///
/// Ordering contract:
/// - Observers are notified in subscription order.
/// - A failing or panicking observer does not stop delivery to the rest.
pub struct ObserverBus<O: ?Sized> {
    observers: Vec<Rc<O>>,
}

impl<O: ?Sized> Default for ObserverBus<O> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
        }
    }
}

impl<O: ?Sized> std::fmt::Debug for ObserverBus<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<O: ?Sized> ObserverBus<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn contains(&self, observer: &Rc<O>) -> bool {
        self.position(observer).is_some()
    }

    /// Adds `observer`. Returns `false` if that exact instance is already subscribed.
    pub fn subscribe(&mut self, observer: Rc<O>) -> bool {
        if self.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes `observer` by identity. Returns `true` if it was subscribed.
    pub fn unsubscribe(&mut self, observer: &Rc<O>) -> bool {
        match self.position(observer) {
            Some(idx) => {
                self.observers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }

    /// Invokes `handler` once per observer.
    ///
    /// Errors and panics raised by a handler are caught, logged with the event
    /// name, and counted as failures.
    pub fn notify<F>(&self, event: &'static str, mut handler: F) -> NotifyReport
    where
        F: FnMut(&O) -> HandlerResult,
    {
        let mut report = NotifyReport::default();
        for (idx, observer) in self.observers.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&**observer)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(event, observer = idx, error = %err, "observer handler failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        event,
                        observer = idx,
                        panic = panic_message(&*payload),
                        "observer handler panicked"
                    );
                }
            }
        }
        report
    }

    fn position(&self, observer: &Rc<O>) -> Option<usize> {
        self.observers
            .iter()
            .position(|o| std::ptr::addr_eq(Rc::as_ptr(o), Rc::as_ptr(observer)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
