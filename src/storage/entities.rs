//! Stored Rows
//!
//! Row shapes of the local store. Secret columns hold ciphertext tagged with the
//! scheme recorded in `encryption`.

use crate::domain::{AdditionalModule, ConnectionType, Endpoint};
use chrono::{DateTime, Utc};

/// Row of the `databases` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseEntity {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub db: Option<u32>,
    pub connection_type: ConnectionType,
    pub username: Option<String>,
    /// Ciphertext
    pub password: Option<String>,
    pub nodes: Vec<Endpoint>,
    pub sentinel_master_name: Option<String>,
    pub sentinel_master_username: Option<String>,
    /// Ciphertext
    pub sentinel_master_password: Option<String>,
    pub tls: bool,
    pub verify_server_cert: bool,
    pub tls_servername: Option<String>,
    pub ca_cert_id: Option<String>,
    pub client_cert_id: Option<String>,
    pub modules: Vec<AdditionalModule>,
    /// Scheme tag of the secret columns, `None` for legacy plaintext rows
    pub encryption: Option<String>,
    pub last_connection: Option<DateTime<Utc>>,
}

/// Row of the `ca_certificates` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaCertificateEntity {
    pub id: String,
    pub name: String,
    /// Ciphertext
    pub certificate: String,
    pub encryption: Option<String>,
}

/// Row of the `client_certificates` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificateEntity {
    pub id: String,
    pub name: String,
    /// Ciphertext
    pub certificate: String,
    /// Ciphertext
    pub key: String,
    pub encryption: Option<String>,
}
