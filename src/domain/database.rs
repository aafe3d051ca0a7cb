//! Connection Profiles
//!
//! A stored description of how to reach one Redis deployment. Secrets in these
//! types are always plaintext; encryption happens in the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    #[default]
    Standalone,
    Cluster,
    Sentinel,
    NotConnected,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Standalone => "STANDALONE",
            ConnectionType::Cluster => "CLUSTER",
            ConnectionType::Sentinel => "SENTINEL",
            ConnectionType::NotConnected => "NOT_CONNECTED",
        }
    }

    /// Parse a stored tag; unknown tags fall back to `NotConnected`
    pub fn from_tag(s: &str) -> Self {
        match s {
            "STANDALONE" => ConnectionType::Standalone,
            "CLUSTER" => ConnectionType::Cluster,
            "SENTINEL" => ConnectionType::Sentinel,
            _ => ConnectionType::NotConnected,
        }
    }
}

/// Host and port of one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Master group monitored by sentinels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelMaster {
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// CA certificate record, shared by reference across profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaCertificate {
    /// `None` for an inline payload that has not been stored yet
    pub id: Option<String>,
    pub name: String,
    pub certificate: String,
}

/// Client certificate and private key, shared by reference across profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertificate {
    /// `None` for an inline payload that has not been stored yet
    pub id: Option<String>,
    pub name: String,
    pub certificate: String,
    pub key: String,
}

/// Certificates attached to a TLS connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TlsMaterial {
    /// System trust store, no client identity
    #[default]
    None,
    /// Custom CA only
    CaOnly { ca_cert: CaCertificate },
    /// Client identity, optionally with a custom CA
    MutualTls {
        ca_cert: Option<CaCertificate>,
        client_cert: ClientCertificate,
    },
}

impl TlsMaterial {
    pub fn ca_cert(&self) -> Option<&CaCertificate> {
        match self {
            TlsMaterial::None => None,
            TlsMaterial::CaOnly { ca_cert } => Some(ca_cert),
            TlsMaterial::MutualTls { ca_cert, .. } => ca_cert.as_ref(),
        }
    }

    pub fn client_cert(&self) -> Option<&ClientCertificate> {
        match self {
            TlsMaterial::MutualTls { client_cert, .. } => Some(client_cert),
            _ => None,
        }
    }

    /// Rebuild from the optional halves
    pub fn from_parts(ca_cert: Option<CaCertificate>, client_cert: Option<ClientCertificate>) -> Self {
        match (ca_cert, client_cert) {
            (ca_cert, Some(client_cert)) => TlsMaterial::MutualTls {
                ca_cert,
                client_cert,
            },
            (Some(ca_cert), None) => TlsMaterial::CaOnly { ca_cert },
            (None, None) => TlsMaterial::None,
        }
    }
}

/// TLS settings of a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum TlsConfig {
    #[default]
    Disabled,
    Enabled {
        verify_server_cert: bool,
        servername: Option<String>,
        material: TlsMaterial,
    },
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        matches!(self, TlsConfig::Enabled { .. })
    }

    pub fn material(&self) -> Option<&TlsMaterial> {
        match self {
            TlsConfig::Disabled => None,
            TlsConfig::Enabled { material, .. } => Some(material),
        }
    }
}

/// Redis module detected on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalModule {
    pub name: String,
    pub version: Option<i64>,
    pub semantic_version: Option<String>,
}

/// Full connection profile with decrypted secrets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Assigned on create when empty
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub db: Option<u32>,
    pub connection_type: ConnectionType,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Cluster seed nodes
    pub nodes: Vec<Endpoint>,
    pub sentinel_master: Option<SentinelMaster>,
    pub tls: TlsConfig,
    pub modules: Vec<AdditionalModule>,
    pub last_connection: Option<DateTime<Utc>>,
}

impl Database {
    /// Standalone profile without credentials
    pub fn standalone(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Restricted projection used by listings
    pub fn list_item(&self) -> DatabaseListItem {
        DatabaseListItem {
            id: self.id.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            db: self.db,
            connection_type: self.connection_type,
            modules: self.modules.clone(),
            last_connection: self.last_connection,
        }
    }

    /// Generate display name (e.g., "Local (127.0.0.1:6379)")
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("{} ({}:{})", self.name, self.host, self.port)
        }
    }
}

/// Listing view without credentials or TLS material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseListItem {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub db: Option<u32>,
    pub connection_type: ConnectionType,
    pub modules: Vec<AdditionalModule>,
    pub last_connection: Option<DateTime<Utc>>,
}

/// Partial sentinel master update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelMasterPatch {
    pub name: Option<String>,
    pub username: Option<Option<String>>,
    pub password: Option<Option<String>>,
}

/// Partial profile update; `None` keeps the stored value
///
/// Nullable columns use `Option<Option<T>>` so a field can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePatch {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db: Option<Option<u32>>,
    pub connection_type: Option<ConnectionType>,
    pub username: Option<Option<String>>,
    pub password: Option<Option<String>>,
    pub nodes: Option<Vec<Endpoint>>,
    pub sentinel_master: Option<SentinelMasterPatch>,
    pub tls: Option<TlsConfig>,
    pub modules: Option<Vec<AdditionalModule>>,
    pub last_connection: Option<DateTime<Utc>>,
}

impl From<Database> for DatabasePatch {
    /// Patch that overwrites every field with the values of `database`
    fn from(database: Database) -> Self {
        Self {
            name: Some(database.name),
            host: Some(database.host),
            port: Some(database.port),
            db: Some(database.db),
            connection_type: Some(database.connection_type),
            username: Some(database.username),
            password: Some(database.password),
            nodes: Some(database.nodes),
            sentinel_master: database.sentinel_master.map(|master| SentinelMasterPatch {
                name: Some(master.name),
                username: Some(master.username),
                password: Some(master.password),
            }),
            tls: Some(database.tls),
            modules: Some(database.modules),
            last_connection: database.last_connection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ca() -> CaCertificate {
        CaCertificate {
            id: Some("ca".to_string()),
            name: "ca".to_string(),
            certificate: "-----BEGIN CERTIFICATE-----".to_string(),
        }
    }

    fn client() -> ClientCertificate {
        ClientCertificate {
            id: None,
            name: "client".to_string(),
            certificate: "cert".to_string(),
            key: "key".to_string(),
        }
    }

    #[test]
    fn test_tls_material_from_parts() {
        assert_eq!(TlsMaterial::from_parts(None, None), TlsMaterial::None);
        assert_eq!(
            TlsMaterial::from_parts(Some(ca()), None),
            TlsMaterial::CaOnly { ca_cert: ca() }
        );

        let mutual = TlsMaterial::from_parts(None, Some(client()));
        assert!(mutual.ca_cert().is_none());
        assert_eq!(mutual.client_cert(), Some(&client()));
    }

    #[test]
    fn test_list_item_omits_secrets() {
        let mut db = Database::standalone("local", "127.0.0.1", 6379);
        db.id = "1".to_string();
        db.password = Some("secret".to_string());

        let json = serde_json::to_value(db.list_item()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["connectionType"], "STANDALONE");
    }

    #[test]
    fn test_display_name() {
        let db = Database::standalone("", "localhost", 6379);
        assert_eq!(db.display_name(), "localhost:6379");

        let db = Database::standalone("Local", "localhost", 6379);
        assert_eq!(db.display_name(), "Local (localhost:6379)");
    }

    #[test]
    fn test_tls_config_serialization() {
        let tls = TlsConfig::Enabled {
            verify_server_cert: true,
            servername: None,
            material: TlsMaterial::CaOnly { ca_cert: ca() },
        };
        let json = serde_json::to_string(&tls).unwrap();
        let back: TlsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tls);
    }
}
