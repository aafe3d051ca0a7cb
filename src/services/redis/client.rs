//! Redis Client Provider
//!
//! Builds `fred` clients from stored connection profiles and keeps one
//! connected client per profile. Topology (standalone, cluster, sentinel) is
//! hidden behind [`RedisConnection`].

use super::command::{CommandReply, RedisCommand, ReplyError};
use super::executor::{CommandExecutor, ConnectionResolver};
use crate::domain::{ConnectionType, Database, TlsConfig};
use crate::error::{Error, Result};
use crate::storage::DatabaseService;
use fred::clients::Client;
use fred::error::{Error as FredError, ErrorKind};
use fred::interfaces::{ClientLike, ClusterInterface};
use fred::types::config::{Config, Server, ServerConfig, TlsConnector};
use fred::types::{Builder, ClusterHash, CustomCommand, Value};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Whether a client error means the connection itself failed
fn is_transport_fault(error: &FredError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::IO
            | ErrorKind::Canceled
            | ErrorKind::Timeout
            | ErrorKind::Tls
            | ErrorKind::Routing
            | ErrorKind::Cluster
            | ErrorKind::Sentinel
            | ErrorKind::Config
            | ErrorKind::Url
    )
}

fn to_reply_error(command: &RedisCommand, error: &FredError) -> ReplyError {
    ReplyError::new(command.display_name(), error.details())
}

fn to_error(command: &RedisCommand, error: FredError) -> Error {
    if is_transport_fault(&error) {
        Error::Redis { source: error }
    } else {
        to_reply_error(command, &error).into()
    }
}

/// Pair pipeline results with their commands
///
/// A dropped connection fails every queued command the same way, so a batch
/// where every result is a transport fault fails as a whole.
fn collect_pipeline(
    commands: &[RedisCommand],
    results: Vec<std::result::Result<Value, FredError>>,
) -> Result<Vec<CommandReply>> {
    if results
        .iter()
        .all(|r| r.as_ref().is_err_and(is_transport_fault))
    {
        if let Some(Err(error)) = results.into_iter().next() {
            return Err(Error::Redis { source: error });
        }
        return Ok(Vec::new());
    }

    Ok(commands
        .iter()
        .zip(results)
        .map(|(command, result)| result.map_err(|e| to_reply_error(command, &e)))
        .collect())
}

fn custom_parts(command: &RedisCommand) -> (CustomCommand, Vec<Value>) {
    let hash = match command.key_index {
        Some(index) => ClusterHash::Offset(index),
        None => ClusterHash::Random,
    };
    let args = command.args.iter().cloned().map(Value::Bytes).collect();
    (CustomCommand::new_static(command.name, hash, false), args)
}

/// Connected client for one profile
#[derive(Clone)]
pub struct RedisConnection {
    client: Client,
    connection_type: ConnectionType,
}

impl RedisConnection {
    pub fn new(client: Client, connection_type: ConnectionType) -> Self {
        Self {
            client,
            connection_type,
        }
    }
}

impl CommandExecutor for RedisConnection {
    fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    async fn send_command(&self, command: RedisCommand) -> Result<Value> {
        let (cmd, args) = custom_parts(&command);
        self.client
            .custom::<Value, _>(cmd, args)
            .await
            .map_err(|e| to_error(&command, e))
    }

    async fn exec_pipeline(&self, commands: Vec<RedisCommand>) -> Result<Vec<CommandReply>> {
        let pipeline = self.client.pipeline();
        for command in &commands {
            let (cmd, args) = custom_parts(command);
            let _: () = pipeline.custom(cmd, args).await?;
        }

        let results = pipeline.try_all::<Value>().await;
        collect_pipeline(&commands, results)
    }

    async fn send_to_primaries(&self, command: RedisCommand) -> Result<Vec<CommandReply>> {
        if self.connection_type != ConnectionType::Cluster {
            let reply = match self.send_command(command.clone()).await {
                Ok(value) => Ok(value),
                Err(Error::Reply { command, message })
                | Err(Error::NoPermission { command, message }) => {
                    Err(ReplyError { command, message })
                }
                Err(e) => return Err(e),
            };
            return Ok(vec![reply]);
        }

        let nodes = self
            .client
            .cached_cluster_state()
            .map(|state| state.unique_primary_nodes())
            .ok_or_else(|| Error::Redis {
                source: FredError::new(ErrorKind::Cluster, "Cluster state is not available"),
            })?;
        debug!("Sending {} to {} primary nodes", command, nodes.len());

        let requests = nodes.into_iter().map(|node| {
            let (cmd, args) = custom_parts(&command);
            let client = self.client.with_cluster_node(node);
            async move { client.custom::<Value, _>(cmd, args).await }
        });

        Ok(join_all(requests)
            .await
            .into_iter()
            .map(|result| result.map_err(|e| to_reply_error(&command, &e)))
            .collect())
    }
}

/// Build the `fred` configuration for a profile
pub fn build_config(database: &Database) -> Result<Config> {
    let server = match database.connection_type {
        ConnectionType::Cluster => {
            let mut hosts: Vec<(String, u16)> = database
                .nodes
                .iter()
                .map(|node| (node.host.clone(), node.port))
                .collect();
            if hosts.is_empty() {
                hosts.push((database.host.clone(), database.port));
            }
            ServerConfig::new_clustered(hosts)
        }
        ConnectionType::Sentinel => {
            let master = database.sentinel_master.as_ref().ok_or_else(|| Error::Invalid {
                message: format!("Sentinel profile {} has no master group", database.id),
            })?;
            ServerConfig::Sentinel {
                hosts: vec![Server::new(database.host.clone(), database.port)],
                service_name: master.name.clone(),
                username: database.username.clone(),
                password: database.password.clone(),
            }
        }
        ConnectionType::Standalone | ConnectionType::NotConnected => {
            ServerConfig::new_centralized(database.host.clone(), database.port)
        }
    };

    // with sentinels the profile credentials authenticate against the sentinel
    // nodes and the master group carries its own
    let (username, password) = match (&database.connection_type, &database.sentinel_master) {
        (ConnectionType::Sentinel, Some(master)) => (master.username.clone(), master.password.clone()),
        _ => (database.username.clone(), database.password.clone()),
    };

    let database_index = match database.db {
        Some(db) => Some(u8::try_from(db).map_err(|_| Error::Invalid {
            message: format!("Logical database index out of range: {db}"),
        })?),
        None => None,
    };

    let mut config = Config {
        server,
        username,
        password,
        database: database_index,
        ..Config::default()
    };

    if let Some(connector) = build_tls_connector(&database.tls)? {
        config.tls = Some(connector.into());
    }

    Ok(config)
}

/// Turn stored TLS material into a native-tls connector
fn build_tls_connector(tls: &TlsConfig) -> Result<Option<TlsConnector>> {
    let TlsConfig::Enabled {
        verify_server_cert,
        servername,
        material,
    } = tls
    else {
        return Ok(None);
    };

    let tls_error = |e: native_tls::Error| Error::Tls {
        message: e.to_string(),
    };

    let mut builder = native_tls::TlsConnector::builder();
    if !verify_server_cert {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    if let Some(ca) = material.ca_cert() {
        builder.add_root_certificate(
            native_tls::Certificate::from_pem(ca.certificate.as_bytes()).map_err(tls_error)?,
        );
    }
    if let Some(client) = material.client_cert() {
        builder.identity(
            native_tls::Identity::from_pkcs8(client.certificate.as_bytes(), client.key.as_bytes())
                .map_err(tls_error)?,
        );
    }
    if let Some(servername) = servername {
        debug!("SNI override {} is resolved by the TLS backend", servername);
    }

    let connector = builder.build().map_err(tls_error)?;
    Ok(Some(TlsConnector::from(connector)))
}

/// Connection resolver backed by the local profile store
pub struct RedisClientProvider {
    databases: DatabaseService,
    clients: Mutex<HashMap<String, Arc<OnceCell<RedisConnection>>>>,
}

impl RedisClientProvider {
    pub fn new(databases: DatabaseService) -> Self {
        Self {
            databases,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Build and connect a client for `database`
    pub async fn connect(&self, database: &Database) -> Result<RedisConnection> {
        let config = build_config(database)?;
        let client = Builder::from_config(config).build()?;

        info!(
            "Connecting to {} ({})",
            database.display_name(),
            database.connection_type.as_str()
        );
        client.init().await?;

        Ok(RedisConnection::new(client, database.connection_type))
    }

    /// Drop and disconnect the cached client of a profile
    pub async fn remove(&self, database_id: &str) -> Result<()> {
        let removed = self.clients.lock().remove(database_id);
        if let Some(connection) = removed.as_deref().and_then(OnceCell::get) {
            connection.client.quit().await?;
            info!("Disconnected from {}", database_id);
        }
        Ok(())
    }

    /// Connection slot of a profile, shared by concurrent resolves
    fn slot(&self, database_id: &str) -> Arc<OnceCell<RedisConnection>> {
        self.clients
            .lock()
            .entry(database_id.to_string())
            .or_default()
            .clone()
    }

    async fn open(&self, database_id: &str) -> Result<RedisConnection> {
        let database = self
            .databases
            .get(database_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "Database",
                id: database_id.to_string(),
            })?;

        let connection = self.connect(&database).await?;

        if let Err(e) = self.databases.touch_last_connection(database_id).await {
            warn!("Failed to record last connection for {}: {}", database_id, e);
        }
        Ok(connection)
    }
}

impl ConnectionResolver for RedisClientProvider {
    type Connection = RedisConnection;

    async fn resolve(&self, database_id: &str) -> Result<RedisConnection> {
        // one connect per profile; later callers wait on the same slot
        let slot = self.slot(database_id);
        let connection = slot.get_or_try_init(|| self.open(database_id)).await?;
        Ok(connection.clone())
    }
}
