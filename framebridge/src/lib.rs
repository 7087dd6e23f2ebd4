//! Authenticated, typed message bridge between a host page and the page it
//! embeds in an iframe.
//!
//! Both sides are the same generic [`Endpoint`]; they differ only in how
//! the counterpart window is found:
//!
//! - [`Host`] lives in the embedding page and talks to one connected
//!   [`Frame`];
//! - [`Guest`] lives inside the iframe and talks to its parent.
//!
//! Inbound traffic is checked against the origin allow-list, the expected
//! sender and the message schema before any handler sees it. Sends are
//! fire-and-forget.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! use framebridge::sim::Browser;
//! use framebridge::{EndpointConfig, Guest, Host, Message, MessageType};
//!
//! let browser = Browser::new();
//! let page = browser.open("https://app.test");
//! let (iframe, legacy) = browser.embed(&page, "https://legacy.test");
//!
//! let mut host = Host::new(
//!     page,
//!     EndpointConfig::builder().target_origin("https://legacy.test").build(),
//! );
//! host.connect(&iframe);
//!
//! let mut guest = Guest::new(
//!     legacy,
//!     EndpointConfig::builder().target_origin("https://app.test").build(),
//! );
//! guest.connect();
//!
//! let ready = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&ready);
//! host.on(MessageType::Ready, move |_| {
//!     flag.store(true, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! guest.ready();
//! browser.run_until_idle();
//! assert!(ready.load(Ordering::SeqCst));
//!
//! host.disconnect();
//! guest.disconnect();
//! ```

mod endpoint;
mod error;
mod guest;
mod host;
mod registry;
pub mod sim;
mod window;

pub use endpoint::{Counterpart, Delivery, Endpoint, Rejection};
pub use error::{Error, HandlerError, Result};
pub use framebridge_proto::{
    EndpointConfig, EndpointConfigBuilder, InvalidMessage, Message, MessageType, ROUTE_CHANGE,
    RouteChange, User, UserId, Value, is_valid_message,
};
pub use guest::{Guest, ParentFrame};
pub use host::{EmbeddedFrame, Host};
pub use registry::Subscription;
pub use window::{Frame, Listener, ListenerId, MessageEvent, Window, WindowId};
