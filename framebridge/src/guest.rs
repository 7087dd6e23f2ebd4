//! Guest side of the bridge: runs inside the embedded frame and talks to
//! whatever frame embeds it.

use framebridge_proto::{Message, User};

use crate::endpoint::{Counterpart, Endpoint};
use crate::window::{Window, WindowId};

/// Counterpart strategy of a [`Guest`]: the parent browsing context.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct ParentFrame;

impl ParentFrame {
    /// The parent window, if `window` is actually embedded.
    fn parent_of(window: &dyn Window) -> Option<WindowId> {
        window.parent().filter(|parent| *parent != window.id())
    }
}

impl Counterpart for ParentFrame {
    const ROLE: &'static str = "guest";

    fn resolve_target(&self, window: &dyn Window) -> Option<WindowId> {
        Self::parent_of(window)
    }

    fn expected_sender(&self, window: &dyn Window) -> Option<WindowId> {
        Self::parent_of(window)
    }
}

/// Bridge endpoint inside the embedded frame.
///
/// Sends go to the parent frame; inbound messages are accepted only from
/// it, and only while actually embedded.
pub type Guest = Endpoint<ParentFrame>;

impl Endpoint<ParentFrame> {
    /// Starts listening for messages from the parent frame.
    ///
    /// Meant to be called once per lifecycle; a second call replaces the
    /// listener instead of adding another.
    pub fn connect(&mut self) {
        self.listen();
    }

    /// Whether this frame has a parent distinct from itself.
    pub fn is_embedded(&self) -> bool {
        ParentFrame::parent_of(&*self.shared.window).is_some()
    }

    /// Sends `READY`.
    pub fn ready(&self) {
        self.send(&Message::Ready);
    }

    /// Sends `AUTH_READY` for `user`.
    pub fn auth_ready(&self, user: User) {
        self.send(&Message::AuthReady { user });
    }
}
