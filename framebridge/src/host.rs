//! Host side of the bridge: runs in the embedding page and talks to one
//! specific iframe.

use std::fmt;
use std::sync::{Arc, Weak};

use framebridge_proto::{EndpointConfig, Message};

use crate::endpoint::{Counterpart, Endpoint};
use crate::window::{Frame, Window, WindowId};

/// Counterpart strategy of a [`Host`]: the connected iframe's inner window.
///
/// The frame is held weakly; the page owns it and may tear it down at any
/// time.
#[derive(Default)]
pub struct EmbeddedFrame {
    /// Frame passed to the last `connect`.
    frame: Option<Weak<dyn Frame>>,
}

impl fmt::Debug for EmbeddedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFrame")
            .field("content_window", &self.content_window())
            .finish()
    }
}

impl EmbeddedFrame {
    /// The frame's inner window, if the frame is still around.
    fn content_window(&self) -> Option<WindowId> {
        self.frame.as_ref()?.upgrade()?.content_window()
    }
}

impl Counterpart for EmbeddedFrame {
    const ROLE: &'static str = "host";

    fn resolve_target(&self, _window: &dyn Window) -> Option<WindowId> {
        self.content_window()
    }

    fn expected_sender(&self, _window: &dyn Window) -> Option<WindowId> {
        self.content_window()
    }

    fn release(&mut self) {
        self.frame = None;
    }

    fn report_unreachable(&self, _config: &EndpointConfig, message: &Message) {
        tracing::warn!(
            role = Self::ROLE,
            kind = %message.kind(),
            "iframe not connected, skipping message"
        );
    }
}

/// Bridge endpoint in the embedding page.
///
/// Sends go to the connected iframe's inner window; inbound messages are
/// accepted only from that window.
pub type Host = Endpoint<EmbeddedFrame>;

impl Endpoint<EmbeddedFrame> {
    /// Attaches to `frame` and starts listening.
    ///
    /// Only a weak reference is kept. Connecting again switches to the new
    /// frame and replaces the listener.
    pub fn connect<F: Frame + 'static>(&mut self, frame: &Arc<F>) {
        let weak: Weak<F> = Arc::downgrade(frame);
        self.shared.counterpart_mut().frame = Some(weak);
        self.listen();
    }

    /// Inner window of the connected frame, if any.
    pub fn frame_window(&self) -> Option<WindowId> {
        self.shared.counterpart().content_window()
    }

    /// Sends `NAVIGATE` to `route`.
    pub fn navigate(&self, route: impl Into<String>) {
        self.send(&Message::navigate(route));
    }
}
