//! The cross-document messaging primitive endpoints are built on.
//!
//! A [`Window`] is the browsing context an endpoint lives in: it can post a
//! message to another context and broadcast inbound messages to registered
//! listeners, tagging each with the sender's origin and identity. In a
//! browser this is `window.postMessage` plus the `message` event; the
//! [`sim`](crate::sim) module provides an in-memory implementation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Identity of a browsing context.
///
/// Two events came from the same context iff their `source` ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Wraps a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Handle for removing a registered message listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// An inbound cross-document message with transport-supplied metadata.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct MessageEvent {
    /// Structured-cloned message data, not yet validated.
    pub data: Value,
    /// Origin of the sending context, as reported by the transport.
    pub origin: String,
    /// Identity of the sending context, when the transport knows it.
    pub source: Option<WindowId>,
}

impl MessageEvent {
    /// Creates an event.
    pub fn new(data: Value, origin: impl Into<String>, source: Option<WindowId>) -> Self {
        Self {
            data,
            origin: origin.into(),
            source,
        }
    }
}

/// Callback invoked for every message delivered to a window.
pub type Listener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// A browsing context able to send and receive cross-document messages.
pub trait Window: Send + Sync {
    /// This context's identity.
    fn id(&self) -> WindowId;

    /// The embedding context.
    ///
    /// Top-level contexts report themselves, as browsers do; `None` means
    /// the parent is not reachable at all.
    fn parent(&self) -> Option<WindowId>;

    /// Posts `data` to `target`, fire-and-forget.
    ///
    /// `target_origin` is `"*"` or an origin the target must have for the
    /// transport to deliver at all. Delivery is asynchronous and
    /// unconfirmed; messages to a vanished target are dropped.
    fn post_message(&self, target: WindowId, data: Value, target_origin: &str);

    /// Registers a listener for messages delivered to this context.
    fn add_message_listener(&self, listener: Listener) -> ListenerId;

    /// Removes a listener. Unknown ids are ignored.
    fn remove_message_listener(&self, id: ListenerId);
}

/// An embedded frame whose lifetime the embedding page does not control.
pub trait Frame: Send + Sync {
    /// The frame's inner browsing context, or `None` once it is gone.
    fn content_window(&self) -> Option<WindowId>;
}
