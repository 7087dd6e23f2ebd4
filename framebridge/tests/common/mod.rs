//! Shared fixtures for framebridge integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use framebridge::sim::{Browser, IFrame, SimWindow};
use framebridge::{EndpointConfig, Guest, Host, Message};
use tracing::Level;

pub const HOST_ORIGIN: &str = "https://a.test";
pub const GUEST_ORIGIN: &str = "https://b.test";
pub const EVIL_ORIGIN: &str = "https://evil.test";

static INIT_TRACING: Once = Once::new();

/// Installs a compact `tracing` subscriber once per test binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .with_test_writer()
            .try_init();
    });
}

/// A host page with one embedded guest frame.
pub struct Page {
    pub browser: Browser,
    pub top: Arc<SimWindow>,
    pub iframe: Arc<IFrame>,
    pub inner: Arc<SimWindow>,
}

impl Page {
    pub fn new() -> Self {
        init_tracing();
        let browser = Browser::new();
        let top = browser.open(HOST_ORIGIN);
        let (iframe, inner) = browser.embed(&top, GUEST_ORIGIN);
        Self {
            browser,
            top,
            iframe,
            inner,
        }
    }

    /// Host allowing only the guest origin, connected to the iframe.
    pub fn host(&self) -> Host {
        let mut host = Host::new(
            self.top.clone(),
            EndpointConfig::builder()
                .target_origin(GUEST_ORIGIN)
                .debug(true)
                .build(),
        );
        host.connect(&self.iframe);
        host
    }

    /// Guest allowing only the host origin, connected.
    pub fn guest(&self) -> Guest {
        let mut guest = Guest::new(
            self.inner.clone(),
            EndpointConfig::builder()
                .target_origin(HOST_ORIGIN)
                .debug(true)
                .build(),
        );
        guest.connect();
        guest
    }
}

/// Counts invocations.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records received messages.
#[derive(Clone, Default)]
pub struct Inbox(Arc<Mutex<Vec<Message>>>);

impl Inbox {
    pub fn push(&self, message: &Message) {
        self.0.lock().unwrap().push(message.clone());
    }

    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}
