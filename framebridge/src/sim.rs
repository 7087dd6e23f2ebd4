//! In-memory browsing contexts for tests and local simulation.
//!
//! [`Browser`] keeps a tree of windows, each with an origin, and a single
//! FIFO of pending message events. [`Window::post_message`] applies the
//! same target-origin rule a browser does, clones the data and queues it;
//! nothing is delivered until [`Browser::run_until_idle`] pumps the queue,
//! so delivery is asynchronous with respect to the sender just as it is in
//! a real page.
//!
//! ```
//! use framebridge::sim::Browser;
//! use framebridge::{EndpointConfig, Guest, Host, MessageType};
//!
//! let browser = Browser::new();
//! let top = browser.open("https://host.test");
//! let (iframe, inner) = browser.embed(&top, "https://guest.test");
//!
//! let mut host = Host::new(top, EndpointConfig::builder().target_origin("https://guest.test").build());
//! host.connect(&iframe);
//! let mut guest = Guest::new(inner, EndpointConfig::builder().target_origin("https://host.test").build());
//! guest.connect();
//!
//! host.on(MessageType::Ready, |_| Ok(()));
//! guest.ready();
//! assert_eq!(browser.run_until_idle(), 1);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use framebridge_proto::{Value, WILDCARD_ORIGIN};

use crate::window::{Frame, Listener, ListenerId, MessageEvent, Window, WindowId};

/// One browsing context.
struct Context {
    /// Origin of the loaded document.
    origin: String,
    /// Embedding context; `None` for top-level windows.
    parent: Option<WindowId>,
    /// Registered `message` listeners.
    listeners: BTreeMap<ListenerId, Listener>,
}

/// An event waiting to be delivered.
struct Pending {
    /// Receiving context.
    target: WindowId,
    /// The event itself.
    event: MessageEvent,
}

/// Mutable browser state.
#[derive(Default)]
struct State {
    /// Next window id.
    next_window: u64,
    /// Next listener id.
    next_listener: u64,
    /// Live contexts.
    windows: HashMap<WindowId, Context>,
    /// Undelivered events, oldest first.
    queue: VecDeque<Pending>,
}

impl State {
    /// Allocates a new context.
    fn create(&mut self, origin: String, parent: Option<WindowId>) -> WindowId {
        let id = WindowId::new(self.next_window);
        self.next_window += 1;
        self.windows.insert(
            id,
            Context {
                origin,
                parent,
                listeners: BTreeMap::new(),
            },
        );
        id
    }
}

/// A simulated browser hosting any number of windows and iframes.
///
/// Cheap to clone; clones share the same windows and event queue.
#[derive(Clone, Default)]
pub struct Browser {
    /// Shared state.
    state: Arc<Mutex<State>>,
}

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Browser")
            .field("windows", &state.windows.len())
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Browser {
    /// Creates an empty browser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the shared state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a top-level window showing a document from `origin`.
    pub fn open(&self, origin: impl Into<String>) -> Arc<SimWindow> {
        let origin = origin.into();
        let id = self.lock().create(origin.clone(), None);
        Arc::new(SimWindow {
            id,
            origin,
            browser: self.clone(),
        })
    }

    /// Embeds an iframe showing a document from `origin` inside `parent`.
    ///
    /// Returns the frame element (what the embedding page holds) and the
    /// frame's inner window (what the embedded page runs in).
    pub fn embed(
        &self,
        parent: &SimWindow,
        origin: impl Into<String>,
    ) -> (Arc<IFrame>, Arc<SimWindow>) {
        let origin = origin.into();
        let id = self.lock().create(origin.clone(), Some(parent.id));
        let frame = Arc::new(IFrame {
            content: Mutex::new(Some(id)),
        });
        let window = Arc::new(SimWindow {
            id,
            origin,
            browser: self.clone(),
        });
        (frame, window)
    }

    /// Removes an iframe from the page.
    ///
    /// Its inner window and every window nested below it stop existing:
    /// listeners are dropped, queued events for them are discarded and the
    /// frame reports no content window.
    pub fn remove_frame(&self, frame: &IFrame) {
        let Some(id) = frame.take() else {
            return;
        };
        let mut state = self.lock();
        let mut doomed = vec![id];
        let mut next = 0;
        while let Some(&current) = doomed.get(next) {
            next += 1;
            doomed.extend(
                state
                    .windows
                    .iter()
                    .filter(|(_, ctx)| ctx.parent == Some(current))
                    .map(|(child, _)| *child),
            );
        }
        for gone in &doomed {
            state.windows.remove(gone);
        }
        state.queue.retain(|p| !doomed.contains(&p.target));
    }

    /// Number of events waiting for delivery.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Delivers queued events in FIFO order until the queue is empty,
    /// including events posted by listeners along the way.
    ///
    /// Returns the number of events delivered to a live window. Listeners
    /// that answer every message with another message keep this looping.
    pub fn run_until_idle(&self) -> usize {
        let mut delivered = 0;
        loop {
            let (event, listeners) = {
                let mut state = self.lock();
                let Some(pending) = state.queue.pop_front() else {
                    break;
                };
                let Some(ctx) = state.windows.get(&pending.target) else {
                    continue;
                };
                let listeners: Vec<Listener> = ctx.listeners.values().cloned().collect();
                (pending.event, listeners)
            };

            // Listeners run unlocked: they post, subscribe and disconnect.
            for listener in &listeners {
                listener(&event);
            }
            delivered += 1;
        }
        delivered
    }

    /// Queues `event` for `target` if the target exists and `target_origin`
    /// permits it.
    fn enqueue(&self, target: WindowId, event: MessageEvent, target_origin: &str) {
        let mut state = self.lock();
        let Some(ctx) = state.windows.get(&target) else {
            tracing::trace!(%target, "post to a closed window dropped");
            return;
        };
        if target_origin != WILDCARD_ORIGIN && target_origin != ctx.origin {
            tracing::trace!(
                %target,
                target_origin,
                actual = %ctx.origin,
                "post dropped by target origin"
            );
            return;
        }
        state.queue.push_back(Pending { target, event });
    }
}

/// A window inside a [`Browser`].
pub struct SimWindow {
    /// Identity.
    id: WindowId,
    /// Origin of the loaded document.
    origin: String,
    /// Owning browser.
    browser: Browser,
}

impl fmt::Debug for SimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimWindow")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SimWindow {
    /// Origin of the loaded document.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Queues an arbitrary event for this window, bypassing the
    /// target-origin rule. Lets tests forge origins and senders.
    pub fn dispatch(&self, event: MessageEvent) {
        self.browser.lock().queue.push_back(Pending {
            target: self.id,
            event,
        });
    }
}

impl Window for SimWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn parent(&self) -> Option<WindowId> {
        let state = self.browser.lock();
        let ctx = state.windows.get(&self.id)?;
        Some(ctx.parent.unwrap_or(self.id))
    }

    fn post_message(&self, target: WindowId, data: Value, target_origin: &str) {
        let event = MessageEvent::new(data, self.origin.clone(), Some(self.id));
        self.browser.enqueue(target, event, target_origin);
    }

    fn add_message_listener(&self, listener: Listener) -> ListenerId {
        let mut state = self.browser.lock();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;
        if let Some(ctx) = state.windows.get_mut(&self.id) {
            ctx.listeners.insert(id, listener);
        }
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        if let Some(ctx) = self.browser.lock().windows.get_mut(&self.id) {
            ctx.listeners.remove(&id);
        }
    }
}

/// An iframe element inside a [`Browser`] page.
#[derive(Debug)]
pub struct IFrame {
    /// Inner window, until the frame is removed.
    content: Mutex<Option<WindowId>>,
}

impl IFrame {
    /// Detaches the inner window, returning it.
    fn take(&self) -> Option<WindowId> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Frame for IFrame {
    fn content_window(&self) -> Option<WindowId> {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
