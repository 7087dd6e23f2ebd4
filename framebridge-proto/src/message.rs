//! Protocol message types and the inbound validation gate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::user::User;

/// Event name a guest emits (inside [`Message::Event`]) after its router
/// settles on a new route. Application-level, never a protocol tag.
pub const ROUTE_CHANGE: &str = "ROUTE_CHANGE";

/// A message exchanged between host and guest.
///
/// The schema is closed: payloads whose tag is not one of these five are a
/// sign of a protocol mismatch and are dropped by [`Message::parse`].
#[allow(clippy::exhaustive_enums)]
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Guest application finished booting.
    Ready,
    /// Guest completed login.
    AuthReady {
        /// The logged-in user, forwarded untouched.
        user: User,
    },
    /// Host asks the guest to route somewhere.
    Navigate {
        /// Target route; any string, including empty.
        route: String,
    },
    /// One side mirrors a piece of state to the other.
    StateSync {
        /// State key.
        key: String,
        /// State value; `Null` when the sender omitted it.
        value: Value,
    },
    /// Free-form application event.
    Event {
        /// Event name.
        name: String,
        /// Optional event payload.
        payload: Option<Value>,
    },
}

/// Discriminant of a [`Message`], i.e. its wire `type` tag.
#[allow(clippy::exhaustive_enums)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// `READY`
    Ready,
    /// `AUTH_READY`
    AuthReady,
    /// `NAVIGATE`
    Navigate,
    /// `STATE_SYNC`
    StateSync,
    /// `EVENT`
    Event,
}

impl MessageType {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Ready,
        Self::AuthReady,
        Self::Navigate,
        Self::StateSync,
        Self::Event,
    ];

    /// The wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::AuthReady => "AUTH_READY",
            Self::Navigate => "NAVIGATE",
            Self::StateSync => "STATE_SYNC",
            Self::Event => "EVENT",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = InvalidMessage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| InvalidMessage::UnknownTag(s.to_owned()))
    }
}

/// Why an inbound value was not accepted as a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidMessage {
    /// The value is not a JSON object.
    #[error("message is not an object")]
    NotAnObject,

    /// The object has no string `type` field.
    #[error("message has no string `type` tag")]
    MissingTag,

    /// The `type` tag names no known message.
    #[error("unknown message type `{0}`")]
    UnknownTag(String),

    /// A field required by the tag is missing or has the wrong shape.
    #[error("{kind} message requires {expected} field `{field}`")]
    InvalidField {
        /// Tag of the offending message.
        kind: MessageType,
        /// Name of the offending field.
        field: &'static str,
        /// Expected JSON shape.
        expected: &'static str,
    },
}

impl Message {
    /// Validates an untyped inbound value and narrows it to a [`Message`].
    ///
    /// Only the envelope is checked; `value`, `payload` and the user record
    /// are carried through as-is.
    pub fn parse(data: &Value) -> Result<Self, InvalidMessage> {
        let obj = data.as_object().ok_or(InvalidMessage::NotAnObject)?;
        let kind: MessageType = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(InvalidMessage::MissingTag)?
            .parse()?;

        match kind {
            MessageType::Ready => Ok(Self::Ready),
            MessageType::AuthReady => match obj.get("user") {
                Some(Value::Object(user)) => Ok(Self::AuthReady {
                    user: User::from(user.clone()),
                }),
                _ => Err(InvalidMessage::InvalidField {
                    kind,
                    field: "user",
                    expected: "object",
                }),
            },
            MessageType::Navigate => Ok(Self::Navigate {
                route: string_field(obj, kind, "route")?,
            }),
            MessageType::StateSync => Ok(Self::StateSync {
                key: string_field(obj, kind, "key")?,
                value: obj.get("value").cloned().unwrap_or(Value::Null),
            }),
            MessageType::Event => Ok(Self::Event {
                name: string_field(obj, kind, "name")?,
                payload: obj.get("payload").cloned(),
            }),
        }
    }

    /// The wire tag of this message.
    pub const fn kind(&self) -> MessageType {
        match self {
            Self::Ready => MessageType::Ready,
            Self::AuthReady { .. } => MessageType::AuthReady,
            Self::Navigate { .. } => MessageType::Navigate,
            Self::StateSync { .. } => MessageType::StateSync,
            Self::Event { .. } => MessageType::Event,
        }
    }

    /// Builds the wire object for this message.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_owned(), Value::from(self.kind().as_str()));
        match self {
            Self::Ready => {}
            Self::AuthReady { user } => {
                obj.insert("user".to_owned(), Value::from(user.clone()));
            }
            Self::Navigate { route } => {
                obj.insert("route".to_owned(), Value::from(route.as_str()));
            }
            Self::StateSync { key, value } => {
                obj.insert("key".to_owned(), Value::from(key.as_str()));
                obj.insert("value".to_owned(), value.clone());
            }
            Self::Event { name, payload } => {
                obj.insert("name".to_owned(), Value::from(name.as_str()));
                if let Some(payload) = payload {
                    obj.insert("payload".to_owned(), payload.clone());
                }
            }
        }
        Value::Object(obj)
    }

    /// `NAVIGATE` to `route`.
    pub fn navigate(route: impl Into<String>) -> Self {
        Self::Navigate {
            route: route.into(),
        }
    }

    /// `STATE_SYNC` of `key` to `value`.
    pub fn state_sync(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::StateSync {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `EVENT` named `name`.
    pub fn event(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self::Event {
            name: name.into(),
            payload,
        }
    }

    /// `EVENT` announcing a guest route change.
    pub fn route_change(change: &RouteChange) -> Self {
        Self::event(
            ROUTE_CHANGE,
            Some(json!({ "path": change.path, "name": change.name })),
        )
    }

    /// Interprets this message as a [`ROUTE_CHANGE`] event.
    ///
    /// Returns `None` for any other message or when the payload lacks a
    /// string `path`.
    pub fn as_route_change(&self) -> Option<RouteChange> {
        match self {
            Self::Event {
                name,
                payload: Some(payload),
            } if name == ROUTE_CHANGE => RouteChange::deserialize(payload).ok(),
            _ => None,
        }
    }
}

impl TryFrom<&Value> for Message {
    type Error = InvalidMessage;

    fn try_from(data: &Value) -> Result<Self, Self::Error> {
        Self::parse(data)
    }
}

impl From<&Message> for Value {
    fn from(msg: &Message) -> Self {
        msg.to_value()
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Payload of a [`ROUTE_CHANGE`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RouteChange {
    /// Route path, e.g. `/users/42`.
    pub path: String,
    /// Route name, when the guest router names its routes.
    #[serde(default)]
    pub name: Option<String>,
}

impl RouteChange {
    /// Creates a route change payload.
    pub fn new(path: impl Into<String>, name: Option<String>) -> Self {
        Self {
            path: path.into(),
            name,
        }
    }
}

/// Returns `true` iff `data` is one of the five known messages with the
/// fields its tag requires.
pub fn is_valid_message(data: &Value) -> bool {
    Message::parse(data).is_ok()
}

/// Extracts a required string field.
fn string_field(
    obj: &Map<String, Value>,
    kind: MessageType,
    field: &'static str,
) -> Result<String, InvalidMessage> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(InvalidMessage::InvalidField {
            kind,
            field,
            expected: "string",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_known_tag() {
        let cases = [
            json!({ "type": "READY" }),
            json!({ "type": "AUTH_READY", "user": { "id": 1, "name": "Test User" } }),
            json!({ "type": "NAVIGATE", "route": "/dashboard" }),
            json!({ "type": "STATE_SYNC", "key": "locale", "value": "zh" }),
            json!({ "type": "EVENT", "name": "saved", "payload": { "id": 3 } }),
        ];
        for (data, kind) in cases.iter().zip(MessageType::ALL) {
            assert_eq!(Message::parse(data).map(|m| m.kind()), Ok(kind), "{data}");
        }
    }

    #[test]
    fn rejects_non_objects() {
        for data in [
            Value::Null,
            json!("READY"),
            json!(42),
            json!(true),
            json!([{ "type": "READY" }]),
        ] {
            assert_eq!(Message::parse(&data), Err(InvalidMessage::NotAnObject));
            assert!(!is_valid_message(&data));
        }
    }

    #[test]
    fn rejects_missing_or_non_string_tag() {
        for data in [json!({}), json!({ "type": 1 }), json!({ "type": null })] {
            assert_eq!(Message::parse(&data), Err(InvalidMessage::MissingTag));
        }
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in ["ROUTE_CHANGE", "ready", "PING", ""] {
            let data = json!({ "type": tag, "name": "x", "route": "/" });
            assert_eq!(
                Message::parse(&data),
                Err(InvalidMessage::UnknownTag(tag.to_owned()))
            );
        }
    }

    #[test]
    fn auth_ready_needs_object_user() {
        for user in [Value::Null, json!("ada"), json!([1, 2])] {
            let data = json!({ "type": "AUTH_READY", "user": user });
            assert!(!is_valid_message(&data));
        }
        assert!(!is_valid_message(&json!({ "type": "AUTH_READY" })));
        // The user record itself is not inspected.
        assert!(is_valid_message(&json!({ "type": "AUTH_READY", "user": {} })));
    }

    #[test]
    fn navigate_accepts_any_string_route() {
        for route in ["", "/", "/a/b?c=d#e", "not a path"] {
            let msg = Message::parse(&json!({ "type": "NAVIGATE", "route": route }));
            assert_eq!(msg, Ok(Message::navigate(route)));
        }
        assert!(!is_valid_message(&json!({ "type": "NAVIGATE", "route": 5 })));
    }

    #[test]
    fn state_sync_value_is_optional() {
        let msg = Message::parse(&json!({ "type": "STATE_SYNC", "key": "cart" }));
        assert_eq!(msg, Ok(Message::state_sync("cart", Value::Null)));
        assert!(!is_valid_message(&json!({ "type": "STATE_SYNC", "value": 1 })));
    }

    #[test]
    fn event_payload_passes_through() {
        let data = json!({ "type": "EVENT", "name": "n", "payload": null });
        assert_eq!(
            Message::parse(&data),
            Ok(Message::event("n", Some(Value::Null)))
        );
        let bare = Message::parse(&json!({ "type": "EVENT", "name": "n" }));
        assert_eq!(bare, Ok(Message::event("n", None)));
        assert!(!is_valid_message(&json!({ "type": "EVENT" })));
    }

    #[test]
    fn wire_shape_omits_absent_payload() {
        assert_eq!(Message::Ready.to_value(), json!({ "type": "READY" }));
        assert_eq!(
            Message::event("ping", None).to_value(),
            json!({ "type": "EVENT", "name": "ping" })
        );
        assert_eq!(
            serde_json::to_value(Message::state_sync("k", 7)).ok(),
            Some(json!({ "type": "STATE_SYNC", "key": "k", "value": 7 }))
        );
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let ok: Result<Message, _> = serde_json::from_str(r#"{"type":"NAVIGATE","route":"/x"}"#);
        assert_eq!(ok.ok(), Some(Message::navigate("/x")));
        let bad: Result<Message, _> = serde_json::from_str(r#"{"type":"NAVIGATE"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn route_change_event() {
        let change = RouteChange::new("/orders", Some("orders".to_owned()));
        let msg = Message::route_change(&change);
        assert_eq!(msg.kind(), MessageType::Event);
        assert_eq!(msg.as_route_change(), Some(change));

        let unnamed = Message::event(ROUTE_CHANGE, Some(json!({ "path": "/", "name": null })));
        assert_eq!(unnamed.as_route_change(), Some(RouteChange::new("/", None)));

        assert_eq!(Message::event(ROUTE_CHANGE, None).as_route_change(), None);
        assert_eq!(Message::event("other", Some(json!({ "path": "/" }))).as_route_change(), None);
    }

    #[test]
    fn tag_round_trips_through_str() {
        for kind in MessageType::ALL {
            assert_eq!(kind.as_str().parse::<MessageType>(), Ok(kind));
        }
        assert!("EVENTS".parse::<MessageType>().is_err());
    }
}
