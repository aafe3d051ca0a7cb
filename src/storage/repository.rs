//! Local Database Repository
//!
//! Maps connection profiles to stored rows. Secrets pass through the
//! [`EncryptionService`] on the way in and out, and inline certificates are
//! turned into shared certificate records before the profile is written.

use super::certificate::{CaCertificateRepository, ClientCertificateRepository};
use super::entities::DatabaseEntity;
use super::store::DatabaseStore;
use crate::domain::{
    CaCertificate, ClientCertificate, Database, DatabaseListItem, DatabasePatch, SentinelMaster,
    TlsConfig, TlsMaterial,
};
use crate::encryption::EncryptionService;
use crate::error::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Profile repository over a row store, certificate stores and a cipher
pub struct LocalDatabaseRepository {
    store: Arc<dyn DatabaseStore>,
    ca_certificates: Arc<dyn CaCertificateRepository>,
    client_certificates: Arc<dyn ClientCertificateRepository>,
    encryption: Arc<dyn EncryptionService>,
}

/// Certificate rows written for inline material during one create/update
#[derive(Default)]
struct CreatedCertificates {
    ca: Option<String>,
    client: Option<String>,
}

fn not_found(id: &str) -> Error {
    Error::NotFound {
        entity: "Database",
        id: id.to_string(),
    }
}

impl LocalDatabaseRepository {
    pub fn new(
        store: Arc<dyn DatabaseStore>,
        ca_certificates: Arc<dyn CaCertificateRepository>,
        client_certificates: Arc<dyn ClientCertificateRepository>,
        encryption: Arc<dyn EncryptionService>,
    ) -> Self {
        Self {
            store,
            ca_certificates,
            client_certificates,
            encryption,
        }
    }

    /// Whether a profile row exists; never decrypts
    pub fn exists(&self, id: &str) -> Result<bool> {
        self.store.exists(id)
    }

    /// Full decrypted profile, `None` when the id is unknown
    pub fn get(&self, id: &str) -> Result<Option<Database>> {
        match self.store.find_by_id(id)? {
            Some(entity) => self.hydrate(entity).map(Some),
            None => Ok(None),
        }
    }

    /// Listing without credentials or TLS material
    pub fn list(&self) -> Result<Vec<DatabaseListItem>> {
        self.store.list()
    }

    /// Store a new profile and return what was written
    pub fn create(&self, database: Database) -> Result<Database> {
        let id = if database.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            database.id
        };

        let mut tag = None;
        let password = self.encrypt_secret(database.password.as_deref(), &mut tag)?;
        let (sentinel_master_name, sentinel_master_username, sentinel_master_password) =
            match database.sentinel_master {
                Some(master) => (
                    Some(master.name),
                    master.username,
                    self.encrypt_secret(master.password.as_deref(), &mut tag)?,
                ),
                None => (None, None, None),
            };

        let mut entity = DatabaseEntity {
            id,
            name: database.name,
            host: database.host,
            port: database.port,
            db: database.db,
            connection_type: database.connection_type,
            username: database.username,
            password,
            nodes: database.nodes,
            sentinel_master_name,
            sentinel_master_username,
            sentinel_master_password,
            modules: database.modules,
            encryption: tag,
            last_connection: database.last_connection,
            ..DatabaseEntity::default()
        };
        let created = self.apply_tls(&mut entity, database.tls)?;

        if let Err(e) = self.store.save(&entity) {
            self.discard(created);
            return Err(e);
        }
        info!("Created database {}", entity.id);

        self.get(&entity.id)?.ok_or_else(|| not_found(&entity.id))
    }

    /// Merge `patch` into the stored profile and return the result
    pub fn update(&self, id: &str, patch: DatabasePatch) -> Result<Database> {
        let mut entity = self.store.find_by_id(id)?.ok_or_else(|| not_found(id))?;
        let previous_tag = entity.encryption.clone();
        let mut new_tag = None;
        let mut password_changed = false;
        let mut sentinel_password_changed = false;

        if let Some(name) = patch.name {
            entity.name = name;
        }
        if let Some(host) = patch.host {
            entity.host = host;
        }
        if let Some(port) = patch.port {
            entity.port = port;
        }
        if let Some(db) = patch.db {
            entity.db = db;
        }
        if let Some(connection_type) = patch.connection_type {
            entity.connection_type = connection_type;
        }
        if let Some(username) = patch.username {
            entity.username = username;
        }
        if let Some(password) = patch.password {
            entity.password = self.encrypt_secret(password.as_deref(), &mut new_tag)?;
            password_changed = true;
        }
        if let Some(nodes) = patch.nodes {
            entity.nodes = nodes;
        }
        if let Some(master) = patch.sentinel_master {
            if let Some(name) = master.name {
                entity.sentinel_master_name = Some(name);
            }
            if let Some(username) = master.username {
                entity.sentinel_master_username = username;
            }
            if let Some(password) = master.password {
                entity.sentinel_master_password =
                    self.encrypt_secret(password.as_deref(), &mut new_tag)?;
                sentinel_password_changed = true;
            }
        }
        let created = match patch.tls {
            Some(tls) => self.apply_tls(&mut entity, tls)?,
            None => CreatedCertificates::default(),
        };
        if let Some(modules) = patch.modules {
            entity.modules = modules;
        }
        if let Some(last_connection) = patch.last_connection {
            entity.last_connection = Some(last_connection);
        }

        // a row carries one scheme tag for all of its secrets
        let saved = self
            .rescheme(&mut entity, previous_tag, new_tag, password_changed, sentinel_password_changed)
            .and_then(|()| self.store.save(&entity));
        if let Err(e) = saved {
            self.discard(created);
            return Err(e);
        }
        info!("Updated database {}", id);

        self.get(id)?.ok_or_else(|| not_found(id))
    }

    /// Remove the profile row; shared certificates are kept
    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)?;
        info!("Deleted database {}", id);
        Ok(())
    }

    /// Record a successful connection without touching secrets
    pub fn touch_last_connection(&self, id: &str) -> Result<()> {
        let mut entity = self.store.find_by_id(id)?.ok_or_else(|| not_found(id))?;
        entity.last_connection = Some(Utc::now());
        self.store.save(&entity)
    }

    // ===== Mapping =====

    /// Move untouched secrets to the scheme of the changed ones
    fn rescheme(
        &self,
        entity: &mut DatabaseEntity,
        previous_tag: Option<String>,
        new_tag: Option<String>,
        password_changed: bool,
        sentinel_password_changed: bool,
    ) -> Result<()> {
        let Some(tag) = new_tag else {
            return Ok(());
        };
        if previous_tag.as_deref() != Some(tag.as_str()) {
            debug!("Re-encrypting secrets of {} from {:?} to {}", entity.id, previous_tag, tag);
            if !password_changed {
                entity.password = self.reencrypt(entity.password.take(), previous_tag.as_deref())?;
            }
            if !sentinel_password_changed {
                entity.sentinel_master_password = self.reencrypt(
                    entity.sentinel_master_password.take(),
                    previous_tag.as_deref(),
                )?;
            }
        }
        entity.encryption = Some(tag);
        Ok(())
    }

    fn encrypt_secret(&self, plain: Option<&str>, tag: &mut Option<String>) -> Result<Option<String>> {
        let Some(plain) = plain else {
            return Ok(None);
        };
        let encrypted = self.encryption.encrypt(plain)?;
        *tag = Some(encrypted.encryption.as_str().to_string());
        Ok(Some(encrypted.data))
    }

    fn decrypt_secret(&self, cipher: Option<&str>, tag: Option<&str>) -> Result<Option<String>> {
        cipher
            .map(|cipher| self.encryption.decrypt(cipher, tag))
            .transpose()
    }

    fn reencrypt(&self, cipher: Option<String>, previous_tag: Option<&str>) -> Result<Option<String>> {
        let plain = self.decrypt_secret(cipher.as_deref(), previous_tag)?;
        let mut ignored = None;
        self.encrypt_secret(plain.as_deref(), &mut ignored)
    }

    /// Write TLS columns, storing inline certificates first
    fn apply_tls(&self, entity: &mut DatabaseEntity, tls: TlsConfig) -> Result<CreatedCertificates> {
        let mut created = CreatedCertificates::default();
        match tls {
            TlsConfig::Disabled => {
                entity.tls = false;
                entity.verify_server_cert = false;
                entity.tls_servername = None;
                entity.ca_cert_id = None;
                entity.client_cert_id = None;
            }
            TlsConfig::Enabled {
                verify_server_cert,
                servername,
                material,
            } => {
                let ca_cert_id = material
                    .ca_cert()
                    .map(|cert| self.ca_reference(cert, &mut created))
                    .transpose()?;
                let client_cert_id = match material
                    .client_cert()
                    .map(|cert| self.client_reference(cert, &mut created))
                    .transpose()
                {
                    Ok(id) => id,
                    Err(e) => {
                        self.discard(created);
                        return Err(e);
                    }
                };

                entity.tls = true;
                entity.verify_server_cert = verify_server_cert;
                entity.tls_servername = servername;
                entity.ca_cert_id = ca_cert_id;
                entity.client_cert_id = client_cert_id;
            }
        }
        Ok(created)
    }

    fn ca_reference(&self, certificate: &CaCertificate, created: &mut CreatedCertificates) -> Result<String> {
        if let Some(id) = &certificate.id {
            return Ok(id.clone());
        }
        let id = self
            .ca_certificates
            .create(certificate)?
            .id
            .ok_or_else(|| Error::Invalid {
                message: "Stored CA certificate has no id".to_string(),
            })?;
        created.ca = Some(id.clone());
        Ok(id)
    }

    fn client_reference(
        &self,
        certificate: &ClientCertificate,
        created: &mut CreatedCertificates,
    ) -> Result<String> {
        if let Some(id) = &certificate.id {
            return Ok(id.clone());
        }
        let id = self
            .client_certificates
            .create(certificate)?
            .id
            .ok_or_else(|| Error::Invalid {
                message: "Stored client certificate has no id".to_string(),
            })?;
        created.client = Some(id.clone());
        Ok(id)
    }

    /// Remove certificates stored for a profile write that did not complete
    fn discard(&self, created: CreatedCertificates) {
        if let Some(id) = created.ca
            && let Err(e) = self.ca_certificates.delete(&id)
        {
            warn!("Failed to remove CA certificate {}: {}", id, e);
        }
        if let Some(id) = created.client
            && let Err(e) = self.client_certificates.delete(&id)
        {
            warn!("Failed to remove client certificate {}: {}", id, e);
        }
    }

    /// Decrypt a row and attach its certificates
    fn hydrate(&self, entity: DatabaseEntity) -> Result<Database> {
        let tag = entity.encryption.as_deref();
        let password = self.decrypt_secret(entity.password.as_deref(), tag)?;

        let sentinel_master = match entity.sentinel_master_name {
            Some(name) => Some(SentinelMaster {
                name,
                username: entity.sentinel_master_username,
                password: self.decrypt_secret(entity.sentinel_master_password.as_deref(), tag)?,
            }),
            None => None,
        };

        let tls = if entity.tls {
            let ca_cert = entity
                .ca_cert_id
                .as_deref()
                .map(|id| self.ca_certificates.get(id))
                .transpose()?;
            let client_cert = entity
                .client_cert_id
                .as_deref()
                .map(|id| self.client_certificates.get(id))
                .transpose()?;
            TlsConfig::Enabled {
                verify_server_cert: entity.verify_server_cert,
                servername: entity.tls_servername,
                material: TlsMaterial::from_parts(ca_cert, client_cert),
            }
        } else {
            TlsConfig::Disabled
        };

        Ok(Database {
            id: entity.id,
            name: entity.name,
            host: entity.host,
            port: entity.port,
            db: entity.db,
            connection_type: entity.connection_type,
            username: entity.username,
            password,
            nodes: entity.nodes,
            sentinel_master,
            tls,
            modules: entity.modules,
            last_connection: entity.last_connection,
        })
    }
}
