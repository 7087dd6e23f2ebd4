//! Generic bridge endpoint shared by [`Host`](crate::Host) and
//! [`Guest`](crate::Guest).
//!
//! An endpoint owns a handler registry and, while connected, one message
//! listener on its [`Window`]. Inbound events pass three gates before any
//! handler runs:
//!
//! 1. the reported origin must be in the configured allow-list;
//! 2. the sender must be the counterpart frame;
//! 3. the data must be a valid [`Message`].
//!
//! Everything that fails a gate is dropped silently (debug-logged when the
//! endpoint was configured with `debug`). The two roles differ only in how
//! the counterpart is resolved, which is what [`Counterpart`] captures.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use framebridge_proto::{EndpointConfig, InvalidMessage, Message, MessageType, Value};

use crate::error::{HandlerError, Result};
use crate::registry::{self, Registry, Subscription};
use crate::window::{ListenerId, MessageEvent, Window, WindowId};

/// Emits a `debug!` event only when the endpoint's config enables it.
macro_rules! verbose {
    ($config:expr, $($arg:tt)+) => {
        if $config.debug() {
            tracing::debug!($($arg)+);
        }
    };
}

/// Strategy resolving "the other side" of a bridge.
pub trait Counterpart: fmt::Debug + Default + Send + Sync + 'static {
    /// Role name used in log events.
    const ROLE: &'static str;

    /// The window outbound messages are posted to, if reachable.
    fn resolve_target(&self, window: &dyn Window) -> Option<WindowId>;

    /// The window inbound messages must come from, if any.
    fn expected_sender(&self, window: &dyn Window) -> Option<WindowId>;

    /// Forgets any counterpart reference; called on disconnect.
    fn release(&mut self) {}

    /// Reports a send skipped because [`resolve_target`](Self::resolve_target)
    /// found nothing.
    fn report_unreachable(&self, config: &EndpointConfig, message: &Message) {
        verbose!(
            config,
            role = Self::ROLE,
            kind = %message.kind(),
            "no counterpart window, skipping message"
        );
    }
}

/// Why an inbound event was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    /// Reported origin is not in the allow-list.
    Origin(String),
    /// Sender is not the counterpart window.
    Source {
        /// Counterpart window, if there is one.
        expected: Option<WindowId>,
        /// Reported sender.
        actual: Option<WindowId>,
    },
    /// Data is not a valid message.
    Malformed(InvalidMessage),
}

/// Outcome of handling one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Delivery {
    /// The message was accepted and dispatched.
    Dispatched {
        /// Handlers invoked.
        handled: usize,
        /// Handlers that returned an error or panicked.
        failed: usize,
    },
    /// The event was dropped before dispatch.
    Rejected(Rejection),
}

impl Delivery {
    /// Whether the message reached dispatch (even with zero handlers).
    pub const fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

/// State reachable from the window listener.
pub(crate) struct Shared<C> {
    /// Window this endpoint lives in.
    pub(crate) window: Arc<dyn Window>,
    /// Immutable configuration.
    pub(crate) config: EndpointConfig,
    /// Counterpart resolution strategy; written only by connect/disconnect.
    counterpart: RwLock<C>,
    /// Registered handlers.
    registry: Arc<Mutex<Registry>>,
}

impl<C: fmt::Debug> fmt::Debug for Shared<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("window", &self.window.id())
            .field("config", &self.config)
            .field("counterpart", &self.counterpart)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<C: Counterpart> Shared<C> {
    /// Read access to the counterpart.
    pub(crate) fn counterpart(&self) -> RwLockReadGuard<'_, C> {
        self.counterpart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the counterpart.
    pub(crate) fn counterpart_mut(&self) -> RwLockWriteGuard<'_, C> {
        self.counterpart
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Authenticates, validates and dispatches one inbound event.
    fn receive(&self, event: &MessageEvent) -> Delivery {
        if !self.config.is_origin_allowed(&event.origin) {
            verbose!(
                self.config,
                role = C::ROLE,
                origin = %event.origin,
                "blocked message from origin"
            );
            return Delivery::Rejected(Rejection::Origin(event.origin.clone()));
        }

        let expected = self.counterpart().expected_sender(&*self.window);
        if expected.is_none() || event.source != expected {
            verbose!(
                self.config,
                role = C::ROLE,
                ?expected,
                actual = ?event.source,
                "blocked message from unexpected source"
            );
            return Delivery::Rejected(Rejection::Source {
                expected,
                actual: event.source,
            });
        }

        let message = match Message::parse(&event.data) {
            Ok(message) => message,
            Err(e) => {
                verbose!(
                    self.config,
                    role = C::ROLE,
                    error = %e,
                    data = %event.data,
                    "blocked invalid message"
                );
                return Delivery::Rejected(Rejection::Malformed(e));
            }
        };
        verbose!(
            self.config,
            role = C::ROLE,
            kind = %message.kind(),
            "received message"
        );

        // Snapshot so handlers may (un)subscribe while we iterate.
        let handlers = registry::lock(&self.registry).snapshot(message.kind());
        let mut failed = 0;
        for handler in &handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::error!(
                        role = C::ROLE,
                        kind = %message.kind(),
                        error = %e,
                        "handler error"
                    );
                }
                Err(payload) => {
                    failed += 1;
                    tracing::error!(
                        role = C::ROLE,
                        kind = %message.kind(),
                        panic = panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }

        Delivery::Dispatched {
            handled: handlers.len(),
            failed,
        }
    }
}

/// One side of a bridge, parameterised by how it finds its counterpart.
///
/// Construct with [`Endpoint::new`], then `connect`, register handlers with
/// [`on`](Self::on), send with [`send`](Self::send) and its wrappers, and
/// finally [`disconnect`](Self::disconnect). Dropping a connected endpoint
/// removes its listener.
#[derive(Debug)]
pub struct Endpoint<C: Counterpart> {
    /// State shared with the listener.
    pub(crate) shared: Arc<Shared<C>>,
    /// Listener registered by the last `connect`.
    listener: Option<ListenerId>,
}

impl<C: Counterpart> Endpoint<C> {
    /// Creates a disconnected endpoint living in `window`.
    pub fn new(window: Arc<dyn Window>, config: EndpointConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                window,
                config,
                counterpart: RwLock::new(C::default()),
                registry: Arc::new(Mutex::new(Registry::default())),
            }),
            listener: None,
        }
    }

    /// Creates an endpoint configured from `FRAMEBRIDGE_*` environment
    /// variables.
    pub fn from_env(window: Arc<dyn Window>) -> Result<Self> {
        Ok(Self::new(window, EndpointConfig::from_env()?))
    }

    /// The endpoint's configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.shared.config
    }

    /// Identity of the window this endpoint lives in.
    pub fn window_id(&self) -> WindowId {
        self.shared.window.id()
    }

    /// Whether a listener is currently registered.
    pub const fn is_connected(&self) -> bool {
        self.listener.is_some()
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: MessageType) -> usize {
        registry::lock(&self.shared.registry).count(kind)
    }

    /// Registers the window listener, replacing one from an earlier
    /// `connect`.
    pub(crate) fn listen(&mut self) {
        if let Some(previous) = self.listener.take() {
            verbose!(
                self.shared.config,
                role = C::ROLE,
                "already connected, replacing listener"
            );
            self.shared.window.remove_message_listener(previous);
        }

        let weak: Weak<Shared<C>> = Arc::downgrade(&self.shared);
        let id = self
            .shared
            .window
            .add_message_listener(Arc::new(move |event: &MessageEvent| {
                if let Some(shared) = weak.upgrade() {
                    let _ = shared.receive(event);
                }
            }));
        self.listener = Some(id);
        verbose!(self.shared.config, role = C::ROLE, "connected");
    }

    /// Removes the listener, forgets the counterpart and drops every
    /// handler. Safe to call when not connected.
    pub fn disconnect(&mut self) {
        if let Some(id) = self.listener.take() {
            self.shared.window.remove_message_listener(id);
        }
        self.shared.counterpart_mut().release();
        registry::lock(&self.shared.registry).clear();
        verbose!(self.shared.config, role = C::ROLE, "disconnected");
    }

    /// Posts `message` to the counterpart at the configured target origin.
    ///
    /// Fire-and-forget: returns as soon as the transport has the message.
    /// When no counterpart is reachable the message is skipped and logged.
    pub fn send(&self, message: &Message) {
        let shared = &self.shared;
        let target = shared.counterpart().resolve_target(&*shared.window);
        let Some(target) = target else {
            shared
                .counterpart()
                .report_unreachable(&shared.config, message);
            return;
        };

        verbose!(
            shared.config,
            role = C::ROLE,
            kind = %message.kind(),
            %target,
            "sending message"
        );
        shared
            .window
            .post_message(target, message.to_value(), shared.config.target_origin());
    }

    /// Sends `STATE_SYNC`.
    pub fn sync_state(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.send(&Message::state_sync(key, value));
    }

    /// Sends `EVENT`.
    pub fn emit(&self, name: impl Into<String>, payload: Option<Value>) {
        self.send(&Message::event(name, payload));
    }

    /// Registers `handler` for messages tagged `kind`.
    ///
    /// Handlers run synchronously during dispatch. An `Err` or a panic is
    /// logged and does not stop the remaining handlers.
    pub fn on<F>(&self, kind: MessageType, handler: F) -> Subscription
    where
        F: Fn(&Message) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = registry::lock(&self.shared.registry).insert(kind, Arc::new(handler));
        Subscription::new(&self.shared.registry, kind, id)
    }

    /// Handles one inbound event; this is what the window listener calls.
    ///
    /// Exposed for transports that deliver events themselves.
    pub fn receive(&self, event: &MessageEvent) -> Delivery {
        self.shared.receive(event)
    }
}

impl<C: Counterpart> Drop for Endpoint<C> {
    fn drop(&mut self) {
        if let Some(id) = self.listener.take() {
            self.shared.window.remove_message_listener(id);
        }
    }
}

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
