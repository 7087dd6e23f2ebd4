//! Wire protocol for framebridge host↔guest messaging.
//!
//! A host page and the page it embeds in an iframe exchange a closed set of
//! tagged [`Message`]s over the browser's cross-document channel. Payloads
//! arrive untyped, so every inbound value goes through [`Message::parse`]
//! (or [`is_valid_message`]) before anything is dispatched.
//!
//! ```
//! use framebridge_proto::{Message, is_valid_message};
//! use serde_json::json;
//!
//! assert!(is_valid_message(&json!({ "type": "NAVIGATE", "route": "/users" })));
//! assert!(!is_valid_message(&json!({ "type": "ROUTE_CHANGE" })));
//!
//! let msg = Message::parse(&json!({ "type": "READY" })).unwrap();
//! assert_eq!(msg, Message::Ready);
//! ```

mod config;
mod message;
mod user;

pub use config::{
    ConfigError, ENV_ALLOWED_ORIGINS, ENV_DEBUG, ENV_TARGET_ORIGIN, EndpointConfig,
    EndpointConfigBuilder, WILDCARD_ORIGIN,
};
pub use message::{InvalidMessage, Message, MessageType, ROUTE_CHANGE, RouteChange, is_valid_message};
pub use user::{User, UserId};

/// Re-exported so callers can build `value`/`payload` fields without
/// naming `serde_json` themselves.
pub use serde_json::Value;
