//! Constants
//!
//! File names, table names and protocol literals shared across the crate.

/// Directory qualifier used with `directories::ProjectDirs`
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "redis-admin";
pub const APP_NAME: &str = "redis-admin";

/// Settings file inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Default SQLite file inside the config directory
pub const DATABASE_FILE: &str = "redis-admin.db";

/// Default AES key file inside the config directory
pub const ENCRYPTION_KEY_FILE: &str = "encryption.key";

/// Persisted browser view state
pub const VIEW_STATE_FILE: &str = "view-state.json";

/// Rolling log file prefix
pub const LOG_FILE_PREFIX: &str = "redis-admin.log";

/// Default tree view delimiter for key namespaces
pub const DEFAULT_DELIMITER: &str = ":";

/// Smallest explicit stream entry id accepted by XADD
pub const MIN_STREAM_ENTRY_ID: &str = "0-1";

/// Marker the server uses when an ACL rule denies a command
pub const NO_PERMISSION_MARKER: &str = "NOPERM";
