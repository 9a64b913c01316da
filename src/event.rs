//! Structural-change events and the per-model event bus
//!
//! Every mutation in the model funnels through [`EventBus::publish`]. The bus
//! carries one process-wide enabled flag per model instance; bulk operations
//! suppress delivery through a scoped [`EventGuard`] that restores the prior
//! value when dropped, so nested suppression and early error returns cannot
//! leave the flag in the wrong state.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::arena::EntityKey;

/// Kinds of structural-change events published by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LibraryAdded,
    LibraryRemoved,
    NameModified,
    NamespaceModified,
    PrefixModified,
    ResourceUrlModified,
    VersionSchemeModified,
    DocumentationModified,
    ImportAdded,
    ImportRemoved,
    MemberAdded,
    MemberRemoved,
    MemberMoved,
    AliasAdded,
    AliasRemoved,
    FacetAdded,
    FacetRemoved,
    FacetReplaced,
    FacetCleared,
    AttributeAdded,
    AttributeRemoved,
    ElementAdded,
    ElementRemoved,
    ValueAdded,
    ValueRemoved,
    TypeAssignmentModified,
    ChildrenReordered,
}

/// What an event is about: the model registry itself, or one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Subject {
    Model,
    Entity(EntityKey),
}

/// An immutable structural-change record.
///
/// Add/remove-style events carry the affected child in `item`;
/// value-modifying events carry `old`/`new`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub subject: Subject,
    pub item: Option<EntityKey>,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl Event {
    /// An add/remove-style event carrying the affected child
    pub fn structural(kind: EventKind, subject: Subject, item: EntityKey) -> Self {
        Self {
            kind,
            subject,
            item: Some(item),
            old: None,
            new: None,
        }
    }

    /// A field-modification event carrying the old and new values
    pub fn valued(
        kind: EventKind,
        subject: Subject,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        Self {
            kind,
            subject,
            item: None,
            old,
            new,
        }
    }

    /// An event with neither an affected child nor values
    pub fn bare(kind: EventKind, subject: Subject) -> Self {
        Self {
            kind,
            subject,
            item: None,
            old: None,
            new: None,
        }
    }
}

/// Receiver of structural-change events.
///
/// Listeners run synchronously on the mutating thread and must not fail;
/// they receive the event record only, never mutable model access.
pub trait ModelListener {
    /// Event-kind filter; the bus skips listeners that do not accept a kind.
    fn accepts(&self, _kind: EventKind) -> bool {
        true
    }

    fn on_event(&self, event: &Event);
}

/// Per-model listener registry with a single suppressible enabled flag
pub struct EventBus {
    listeners: Vec<Rc<dyn ModelListener>>,
    enabled: Rc<Cell<bool>>,
}

impl EventBus {
    pub fn new(enabled: bool) -> Self {
        Self {
            listeners: Vec::new(),
            enabled: Rc::new(Cell::new(enabled)),
        }
    }

    /// Register a listener. Idempotent: re-adding the same listener
    /// (by identity) has no effect.
    pub fn add_listener(&mut self, listener: Rc<dyn ModelListener>) {
        if !self.listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            self.listeners.push(listener);
        }
    }

    /// Remove a listener by identity. Idempotent.
    pub fn remove_listener(&mut self, listener: &Rc<dyn ModelListener>) {
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Flip the enabled flag and return its previous value.
    ///
    /// Bulk callers must restore the returned value on every exit path;
    /// prefer [`EventGuard`] via `Model::suppress_events`.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.replace(enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Deliver an event to every compatible listener.
    ///
    /// No-op while disabled. Delivery iterates a snapshot copy of the
    /// listener list, so registration changes during delivery do not affect
    /// the delivery in progress.
    pub fn publish(&self, event: &Event) {
        if !self.enabled.get() {
            return;
        }
        trace!(kind = ?event.kind, subject = ?event.subject, "publish");
        let snapshot: Vec<Rc<dyn ModelListener>> = self.listeners.clone();
        for listener in snapshot {
            if listener.accepts(event.kind) {
                listener.on_event(event);
            }
        }
    }

    pub(crate) fn suppression_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.enabled)
    }
}

/// Scoped event suppression.
///
/// Construction disables delivery and captures the prior flag value; dropping
/// the guard restores that value, whatever happened in between. Guards nest:
/// each one restores exactly what it displaced.
#[must_use = "events stay suppressed only while the guard is alive"]
pub struct EventGuard {
    flag: Rc<Cell<bool>>,
    prev: bool,
}

impl EventGuard {
    pub(crate) fn new(flag: Rc<Cell<bool>>) -> Self {
        let prev = flag.replace(false);
        Self { flag, prev }
    }

    /// The flag value this guard will restore.
    pub fn prior(&self) -> bool {
        self.prev
    }
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}
