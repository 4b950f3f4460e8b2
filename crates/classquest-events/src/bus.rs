//! The session-scoped event registry.
//!
//! An [`EventBus`] is an explicitly owned value: create one per session,
//! clone it into whatever needs to emit or subscribe (clones share the same
//! registry), and [`clear`](EventBus::clear) it at session or test
//! boundaries.
//!
//! # Delivery rules
//!
//! - Handlers for one kind run in registration order.
//! - [`emit`](EventBus::emit) delivers to the handlers registered when the
//!   call began. Handlers subscribed during delivery first see the *next*
//!   event; handlers unsubscribed during delivery are skipped.
//! - A handler that returns `Err` or panics is logged and skipped; siblings
//!   still run and the emitter never sees the failure.
//! - No borrow of the registry is held while a handler runs, so handlers may
//!   emit, subscribe, and unsubscribe freely.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use crate::event::{AppEvent, EventKind};

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error>;

/// Result type handlers return.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Rc<dyn Fn(&AppEvent) -> HandlerResult>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<Registration>>,
}

impl Registry {
    fn is_registered(&self, kind: EventKind, id: u64) -> bool {
        self.handlers
            .get(&kind)
            .is_some_and(|list| list.iter().any(|r| r.id == id))
    }

    fn remove(&mut self, kind: EventKind, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&kind);
        }
        removed
    }
}

/// Outcome of a single [`EventBus::emit`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Typed publish/subscribe registry for [`AppEvent`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    ///
    /// The returned [`Subscription`] is the only way to remove the handler
    /// short of [`clear`](Self::clear); dropping it keeps the handler
    /// registered.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) -> HandlerResult + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id = registry.next_id.wrapping_add(1);
        registry
            .handlers
            .entry(kind)
            .or_default()
            .push(Registration {
                id,
                handler: Rc::new(handler),
            });
        Subscription {
            registry: Rc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Deliver `event` synchronously to every handler of its kind.
    pub fn emit(&self, event: &AppEvent) -> EmitReport {
        let kind = event.kind();
        let snapshot: Vec<(u64, Handler)> = {
            let registry = self.registry.borrow();
            registry
                .handlers
                .get(&kind)
                .map(|list| {
                    list.iter()
                        .map(|r| (r.id, Rc::clone(&r.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut report = EmitReport::default();
        for (id, handler) in snapshot {
            let live = self.registry.borrow().is_registered(kind, id);
            if !live {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {
                    report.delivered = report.delivered.saturating_add(1);
                }
                Ok(Err(error)) => {
                    report.failed = report.failed.saturating_add(1);
                    tracing::warn!(%kind, handler = id, %error, "Event handler failed");
                }
                Err(payload) => {
                    report.failed = report.failed.saturating_add(1);
                    tracing::warn!(
                        %kind,
                        handler = id,
                        panic = panic_message(payload.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        report
    }

    /// Remove every registration of every kind.
    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut counts: Vec<(EventKind, usize)> = registry
            .handlers
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

/// Capability to remove one handler registration.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// The kind this subscription listens to.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Stop future deliveries to the handler.
    ///
    /// Returns `false` when the handler was already gone (bus cleared or
    /// dropped).
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.borrow_mut().remove(self.kind, self.id);
        removed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
