//! Per-endpoint configuration: target origin, receive allow-list, debug.

use std::path::Path;
use std::{fs, io};

use serde::{Deserialize, Serialize};

/// Target origin meaning "no restriction" when sending.
pub const WILDCARD_ORIGIN: &str = "*";

/// Environment variable holding the target origin.
pub const ENV_TARGET_ORIGIN: &str = "FRAMEBRIDGE_TARGET_ORIGIN";

/// Environment variable holding a comma-separated origin allow-list.
pub const ENV_ALLOWED_ORIGINS: &str = "FRAMEBRIDGE_ALLOWED_ORIGINS";

/// Environment variable toggling verbose bridge logging.
pub const ENV_DEBUG: &str = "FRAMEBRIDGE_DEBUG";

/// Errors from loading an [`EndpointConfig`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The config file is not valid JSON for this schema.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    /// A debug flag value is not a recognised boolean.
    #[error("invalid FRAMEBRIDGE_DEBUG value `{0}`")]
    InvalidDebug(String),
}

/// Configuration of one bridge endpoint.
///
/// Immutable once built. The receive allow-list defaults to the target
/// origin when that is concrete; with the `"*"` default it is empty, and an
/// empty allow-list rejects every inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Origin the transport restricts delivery to when sending.
    target_origin: String,
    /// Origins inbound messages are accepted from.
    allowed_origins: Vec<String>,
    /// Emit verbose traces.
    debug: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EndpointConfig {
    /// Returns a builder with every field at its default.
    pub fn builder() -> EndpointConfigBuilder {
        EndpointConfigBuilder::default()
    }

    /// Origin used when sending.
    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    /// Receive allow-list, first occurrence order.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Whether verbose traces are on.
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Returns `true` iff the allow-list is non-empty and contains `origin`
    /// exactly.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        !self.allowed_origins.is_empty() && self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Reads the configuration from `FRAMEBRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup.
    ///
    /// Unset variables keep their defaults. The allow-list is split on
    /// commas, trimmed, and empty entries are dropped.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Some(origin) = lookup(ENV_TARGET_ORIGIN).filter(|o| !o.trim().is_empty()) {
            builder = builder.target_origin(origin.trim());
        }
        if let Some(list) = lookup(ENV_ALLOWED_ORIGINS) {
            builder = builder.allowed_origins(
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty()),
            );
        }
        if let Some(flag) = lookup(ENV_DEBUG) {
            builder = builder.debug(parse_flag(&flag)?);
        }
        Ok(builder.build())
    }

    /// Loads a configuration from a JSON file.
    ///
    /// ```json
    /// { "targetOrigin": "https://app.test", "allowedOrigins": ["https://app.test"], "debug": true }
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl<'de> Deserialize<'de> for EndpointConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// On-disk shape; every field optional so defaults derive as usual.
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase", deny_unknown_fields)]
        struct Raw {
            /// See [`EndpointConfig::target_origin`].
            target_origin: Option<String>,
            /// See [`EndpointConfig::allowed_origins`].
            allowed_origins: Option<Vec<String>>,
            /// See [`EndpointConfig::debug`].
            debug: Option<bool>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut builder = Self::builder();
        if let Some(origin) = raw.target_origin {
            builder = builder.target_origin(origin);
        }
        if let Some(list) = raw.allowed_origins {
            builder = builder.allowed_origins(list);
        }
        if let Some(debug) = raw.debug {
            builder = builder.debug(debug);
        }
        Ok(builder.build())
    }
}

/// Builder for [`EndpointConfig`].
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct EndpointConfigBuilder {
    /// Explicit target origin.
    target_origin: Option<String>,
    /// Explicit allow-list; `None` derives it from the target origin.
    allowed_origins: Option<Vec<String>>,
    /// Verbose traces.
    debug: bool,
}

impl EndpointConfigBuilder {
    /// Sets the target origin (default `"*"`).
    pub fn target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = Some(origin.into());
        self
    }

    /// Sets the receive allow-list explicitly, overriding the derived one.
    ///
    /// An explicitly empty list rejects everything.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = Some(origins.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one origin to the allow-list.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins
            .get_or_insert_with(Vec::new)
            .push(origin.into());
        self
    }

    /// Enables verbose traces.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Finalizes the configuration.
    pub fn build(self) -> EndpointConfig {
        let target_origin = self
            .target_origin
            .unwrap_or_else(|| WILDCARD_ORIGIN.to_owned());
        let listed = self.allowed_origins.unwrap_or_else(|| {
            if target_origin == WILDCARD_ORIGIN {
                Vec::new()
            } else {
                vec![target_origin.clone()]
            }
        });

        let mut allowed_origins: Vec<String> = Vec::with_capacity(listed.len());
        for origin in listed {
            if !allowed_origins.contains(&origin) {
                allowed_origins.push(origin);
            }
        }

        EndpointConfig {
            target_origin,
            allowed_origins,
            debug: self.debug,
        }
    }
}

/// Parses a boolean-ish flag value.
fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidDebug(value.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_reject_everything() {
        let cfg = EndpointConfig::default();
        assert_eq!(cfg.target_origin(), "*");
        assert!(cfg.allowed_origins().is_empty());
        assert!(!cfg.debug());
        assert!(!cfg.is_origin_allowed("*"));
        assert!(!cfg.is_origin_allowed("https://a.test"));
    }

    #[test]
    fn concrete_target_seeds_allow_list() {
        let cfg = EndpointConfig::builder()
            .target_origin("https://a.test")
            .build();
        assert_eq!(cfg.allowed_origins(), ["https://a.test"]);
        assert!(cfg.is_origin_allowed("https://a.test"));
        assert!(!cfg.is_origin_allowed("https://a.test/"));
        assert!(!cfg.is_origin_allowed("https://evil.test"));
    }

    #[test]
    fn explicit_allow_list_wins_and_dedups() {
        let cfg = EndpointConfig::builder()
            .target_origin("https://a.test")
            .allowed_origins(["https://b.test", "https://c.test", "https://b.test"])
            .build();
        assert_eq!(cfg.allowed_origins(), ["https://b.test", "https://c.test"]);
        assert!(!cfg.is_origin_allowed("https://a.test"));

        let closed = EndpointConfig::builder()
            .target_origin("https://a.test")
            .allowed_origins(Vec::<String>::new())
            .build();
        assert!(!closed.is_origin_allowed("https://a.test"));
    }

    #[test]
    fn wildcard_target_with_explicit_list() {
        let cfg = EndpointConfig::builder()
            .allow_origin("http://localhost:8080")
            .build();
        assert_eq!(cfg.target_origin(), "*");
        assert!(cfg.is_origin_allowed("http://localhost:8080"));
    }

    #[test]
    fn env_lookup() {
        let cfg = EndpointConfig::from_vars(vars(&[
            (ENV_TARGET_ORIGIN, "https://legacy.test"),
            (ENV_ALLOWED_ORIGINS, " https://legacy.test, ,https://cdn.test "),
            (ENV_DEBUG, "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.target_origin(), "https://legacy.test");
        assert_eq!(
            cfg.allowed_origins(),
            ["https://legacy.test", "https://cdn.test"]
        );
        assert!(cfg.debug());

        let derived = EndpointConfig::from_vars(vars(&[(ENV_TARGET_ORIGIN, "https://x.test")])).unwrap();
        assert_eq!(derived.allowed_origins(), ["https://x.test"]);

        let empty = EndpointConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(empty, EndpointConfig::default());
    }

    #[test]
    fn env_rejects_bad_debug_flag() {
        let err = EndpointConfig::from_vars(vars(&[(ENV_DEBUG, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDebug(v) if v == "maybe"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "targetOrigin": "https://a.test", "debug": true }}"#
        )
        .unwrap();

        let cfg = EndpointConfig::load(file.path()).unwrap();
        assert_eq!(cfg.target_origin(), "https://a.test");
        assert_eq!(cfg.allowed_origins(), ["https://a.test"]);
        assert!(cfg.debug());
    }

    #[test]
    fn load_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "origin": "https://a.test" }}"#).unwrap();
        assert!(matches!(
            EndpointConfig::load(file.path()),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            EndpointConfig::load("/nonexistent/framebridge.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let cfg = EndpointConfig::builder()
            .target_origin("https://a.test")
            .build();
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "targetOrigin": "https://a.test",
                "allowedOrigins": ["https://a.test"],
                "debug": false
            })
        );
    }
}
