//! Error types for framebridge operations.

use framebridge_proto::ConfigError;

/// Alias for `Result<T, framebridge::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error a message handler may return; logged, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned when setting up an endpoint.
///
/// Once constructed, an endpoint never returns errors: rejected traffic,
/// unreachable counterparts and failing handlers are logged and dropped.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The endpoint configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
