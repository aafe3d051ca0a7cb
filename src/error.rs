//! Error types for redis-admin
//!
//! Centralized error handling using snafu for ergonomic error definitions.

use snafu::Snafu;

/// Main error type for the crate
#[derive(Debug, Snafu)]
pub enum Error {
    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// IO error (file operations, etc.)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },

    /// TOML serialization error
    #[snafu(display("TOML serialize error: {source}"))]
    TomlSe { source: toml::ser::Error },

    /// Local store error
    #[snafu(display("SQLite error: {source}"))]
    Sqlite { source: rusqlite::Error },

    /// Transport or connection level Redis fault
    #[snafu(display("{source}"))]
    Redis { source: fred::error::Error },

    /// A single command was rejected by the server
    #[snafu(display("{message}"))]
    Reply { command: String, message: String },

    /// The connected user lacks the ACL permission for a command
    #[snafu(display("{message}"))]
    NoPermission { command: String, message: String },

    /// Requested entity does not exist
    #[snafu(display("{entity} not found: {id}"))]
    NotFound { entity: &'static str, id: String },

    /// Entity already exists
    #[snafu(display("Conflict: {message}"))]
    Conflict { message: String },

    /// Encryption or decryption failed
    #[snafu(display("Encryption error: {message}"))]
    Encryption { message: String },

    /// Stored scheme tag has no matching strategy
    #[snafu(display("Unsupported encryption strategy: {tag}"))]
    UnsupportedEncryption { tag: String },

    /// TLS material could not be turned into a connector
    #[snafu(display("TLS error: {message}"))]
    Tls { message: String },

    /// Blocking task failed to complete
    #[snafu(display("Task error: {message}"))]
    Task { message: String },
}

impl Error {
    /// Whether this error is an ACL authorization fault
    pub fn is_no_permission(&self) -> bool {
        matches!(self, Error::NoPermission { .. })
    }

    /// Whether this error means the target does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(source: toml::ser::Error) -> Self {
        Error::TomlSe { source }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(source: rusqlite::Error) -> Self {
        Error::Sqlite { source }
    }
}

impl From<fred::error::Error> for Error {
    fn from(source: fred::error::Error) -> Self {
        Error::Redis { source }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task {
            message: e.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
