//! Opaque user record carried by `AUTH_READY`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User identifier: either a string or a number on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum UserId {
    /// Numeric identifier.
    Number(serde_json::Number),
    /// String identifier.
    Text(String),
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::Number(id.into())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<UserId> for Value {
    fn from(id: UserId) -> Self {
        match id {
            UserId::Number(n) => Self::Number(n),
            UserId::Text(s) => Self::String(s),
        }
    }
}

/// A user as reported by the guest application.
///
/// The bridge never interprets this record: any JSON object is accepted
/// and forwarded field-for-field. `id`, `name` and `email` are the
/// conventional fields and have typed accessors; everything else is
/// reachable through [`User::get`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(Map<String, Value>);

impl User {
    /// Creates a user with the conventional `id` and `name` fields.
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        let id: UserId = id.into();
        let mut fields = Map::new();
        fields.insert("id".to_owned(), Value::from(id));
        fields.insert("name".to_owned(), Value::String(name.into()));
        Self(fields)
    }

    /// Sets the `email` field.
    #[must_use]
    pub fn with_email(self, email: impl Into<String>) -> Self {
        self.with_field("email", Value::String(email.into()))
    }

    /// Sets an arbitrary extra field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The `id` field, if it is a string or a number.
    pub fn id(&self) -> Option<UserId> {
        match self.0.get("id")? {
            Value::Number(n) => Some(UserId::Number(n.clone())),
            Value::String(s) => Some(UserId::Text(s.clone())),
            _ => None,
        }
    }

    /// The `name` field, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The `email` field, if it is a string.
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// Looks up any field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields, in wire order.
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for User {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<User> for Value {
    fn from(user: User) -> Self {
        Self::Object(user.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accessors_read_conventional_fields() {
        let user = User::new(1_u64, "Test User").with_email("test@example.com");
        assert_eq!(user.id(), Some(UserId::from(1_u64)));
        assert_eq!(user.name(), Some("Test User"));
        assert_eq!(user.email(), Some("test@example.com"));
    }

    #[test]
    fn extra_fields_pass_through() {
        let raw = json!({ "id": "u-7", "name": "Ada", "token": "abc", "roles": ["admin"] });
        let Value::Object(map) = raw.clone() else {
            unreachable!()
        };
        let user = User::from(map);
        assert_eq!(user.id(), Some(UserId::from("u-7")));
        assert_eq!(user.get("token"), Some(&json!("abc")));
        assert_eq!(Value::from(user), raw);
    }

    #[test]
    fn odd_shapes_are_tolerated() {
        let Value::Object(map) = json!({ "id": true }) else {
            unreachable!()
        };
        let user = User::from(map);
        assert_eq!(user.id(), None);
        assert_eq!(user.name(), None);
    }
}
