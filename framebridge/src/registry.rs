//! Handler registry keyed by message tag.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use framebridge_proto::{Message, MessageType};

use crate::error::HandlerError;

/// A registered message handler.
pub(crate) type Handler = Arc<dyn Fn(&Message) -> Result<(), HandlerError> + Send + Sync>;

/// Handlers per tag, ordered by registration.
#[derive(Default)]
pub(crate) struct Registry {
    /// Next registration id. Never reused, so a stale [`Subscription`]
    /// cannot remove a handler registered after a `clear`.
    next_id: u64,
    /// Registered handlers.
    handlers: HashMap<MessageType, BTreeMap<u64, Handler>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<MessageType, usize> =
            self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Registry")
            .field("next_id", &self.next_id)
            .field("handlers", &counts)
            .finish()
    }
}

impl Registry {
    /// Adds `handler` under `kind` and returns its registration id.
    pub(crate) fn insert(&mut self, kind: MessageType, handler: Handler) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.entry(kind).or_default().insert(id, handler);
        id
    }

    /// Removes one registration. Returns `false` if it was already gone.
    pub(crate) fn remove(&mut self, kind: MessageType, id: u64) -> bool {
        let Some(set) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let removed = set.remove(&id).is_some();
        if set.is_empty() {
            self.handlers.remove(&kind);
        }
        removed
    }

    /// Copies out the handlers for `kind` so dispatch can run unlocked.
    pub(crate) fn snapshot(&self, kind: MessageType) -> Vec<Handler> {
        self.handlers
            .get(&kind)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops every registration.
    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Number of handlers registered under `kind`.
    pub(crate) fn count(&self, kind: MessageType) -> usize {
        self.handlers.get(&kind).map_or(0, BTreeMap::len)
    }
}

/// Locks a registry, recovering from poisoning.
///
/// Handlers never run under this lock, so a poisoned registry is still
/// consistent.
pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration returned by `on`; [`unsubscribe`](Self::unsubscribe)
/// removes exactly this handler.
///
/// Dropping a `Subscription` leaves the handler registered until the
/// endpoint disconnects.
#[derive(Debug)]
pub struct Subscription {
    /// Registry the handler lives in.
    registry: Weak<Mutex<Registry>>,
    /// Tag the handler was registered under.
    kind: MessageType,
    /// Registration id.
    id: u64,
}

impl Subscription {
    /// Creates a handle for registration `id`.
    pub(crate) fn new(registry: &Arc<Mutex<Registry>>, kind: MessageType, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            kind,
            id,
        }
    }

    /// Tag the handler was registered under.
    pub const fn kind(&self) -> MessageType {
        self.kind
    }

    /// Removes the handler.
    ///
    /// Returns `false` if it was already gone, e.g. after a disconnect.
    /// Other handlers and the endpoint's listener are unaffected.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| {
                let mut guard = lock(&registry);
                guard.remove(self.kind, self.id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Arc::new(|_: &Message| -> Result<(), HandlerError> { Ok(()) })
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let first = lock(&registry).insert(MessageType::Ready, noop());
        let stale = Subscription::new(&registry, MessageType::Ready, first);

        lock(&registry).clear();
        let second = lock(&registry).insert(MessageType::Ready, noop());
        assert_ne!(first, second);

        assert!(!stale.unsubscribe());
        assert_eq!(lock(&registry).count(MessageType::Ready), 1);
    }

    #[test]
    fn remove_is_exact() {
        let mut registry = Registry::default();
        let a = registry.insert(MessageType::Event, noop());
        let _b = registry.insert(MessageType::Event, noop());
        let c = registry.insert(MessageType::Navigate, noop());

        assert!(registry.remove(MessageType::Event, a));
        assert!(!registry.remove(MessageType::Event, a));
        assert!(!registry.remove(MessageType::Event, c));
        assert_eq!(registry.count(MessageType::Event), 1);
        assert_eq!(registry.snapshot(MessageType::Navigate).len(), 1);
        assert!(registry.snapshot(MessageType::Ready).is_empty());
    }

    #[test]
    fn unsubscribe_after_registry_dropped() {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let id = lock(&registry).insert(MessageType::Ready, noop());
        let sub = Subscription::new(&registry, MessageType::Ready, id);
        drop(registry);
        assert!(!sub.unsubscribe());
    }
}
