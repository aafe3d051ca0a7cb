//! Profile Store
//!
//! Raw row access for connection profiles. Nothing here encrypts or decrypts.

use super::connection::DatabaseConnection;
use super::entities::DatabaseEntity;
use crate::domain::{ConnectionType, DatabaseListItem};
use crate::error::Result;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use serde::de::DeserializeOwned;

/// Row-level access to the `databases` table
pub trait DatabaseStore: Send + Sync {
    /// Presence check without loading the row
    fn exists(&self, id: &str) -> Result<bool>;

    fn find_by_id(&self, id: &str) -> Result<Option<DatabaseEntity>>;

    /// Listing projection, ordered by name
    fn list(&self) -> Result<Vec<DatabaseListItem>>;

    /// Insert or replace the whole row
    fn save(&self, entity: &DatabaseEntity) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}

/// SQLite implementation of [`DatabaseStore`]
pub struct SqliteDatabaseStore {
    db: DatabaseConnection,
}

impl SqliteDatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

const ENTITY_COLUMNS: &str = "id, name, host, port, db, connection_type, username, password, \
     nodes, sentinel_master_name, sentinel_master_username, sentinel_master_password, \
     tls, verify_server_cert, tls_servername, ca_cert_id, client_cert_id, modules, \
     encryption, last_connection";

fn json_column<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn row_to_entity(row: &Row) -> rusqlite::Result<DatabaseEntity> {
    let connection_type: String = row.get(5)?;
    Ok(DatabaseEntity {
        id: row.get(0)?,
        name: row.get(1)?,
        host: row.get(2)?,
        port: row.get(3)?,
        db: row.get(4)?,
        connection_type: ConnectionType::from_tag(&connection_type),
        username: row.get(6)?,
        password: row.get(7)?,
        nodes: json_column(row, 8)?,
        sentinel_master_name: row.get(9)?,
        sentinel_master_username: row.get(10)?,
        sentinel_master_password: row.get(11)?,
        tls: row.get(12)?,
        verify_server_cert: row.get(13)?,
        tls_servername: row.get(14)?,
        ca_cert_id: row.get(15)?,
        client_cert_id: row.get(16)?,
        modules: json_column(row, 17)?,
        encryption: row.get(18)?,
        last_connection: row.get(19)?,
    })
}

fn row_to_list_item(row: &Row) -> rusqlite::Result<DatabaseListItem> {
    let connection_type: String = row.get(5)?;
    Ok(DatabaseListItem {
        id: row.get(0)?,
        name: row.get(1)?,
        host: row.get(2)?,
        port: row.get(3)?,
        db: row.get(4)?,
        connection_type: ConnectionType::from_tag(&connection_type),
        modules: json_column(row, 6)?,
        last_connection: row.get(7)?,
    })
}

impl DatabaseStore for SqliteDatabaseStore {
    fn exists(&self, id: &str) -> Result<bool> {
        self.db.with(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM databases WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn find_by_id(&self, id: &str) -> Result<Option<DatabaseEntity>> {
        self.db.with(|conn| {
            let sql = format!("SELECT {ENTITY_COLUMNS} FROM databases WHERE id = ?1");
            Ok(conn.query_row(&sql, params![id], row_to_entity).optional()?)
        })
    }

    fn list(&self) -> Result<Vec<DatabaseListItem>> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, host, port, db, connection_type, modules, last_connection \
                 FROM databases ORDER BY name, id",
            )?;
            let items = stmt
                .query_map([], row_to_list_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    fn save(&self, entity: &DatabaseEntity) -> Result<()> {
        let nodes = serde_json::to_string(&entity.nodes)?;
        let modules = serde_json::to_string(&entity.modules)?;

        self.db.with(|conn| {
            let sql = format!(
                "INSERT OR REPLACE INTO databases ({ENTITY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
            );
            conn.execute(
                &sql,
                params![
                    entity.id,
                    entity.name,
                    entity.host,
                    entity.port,
                    entity.db,
                    entity.connection_type.as_str(),
                    entity.username,
                    entity.password,
                    nodes,
                    entity.sentinel_master_name,
                    entity.sentinel_master_username,
                    entity.sentinel_master_password,
                    entity.tls,
                    entity.verify_server_cert,
                    entity.tls_servername,
                    entity.ca_cert_id,
                    entity.client_cert_id,
                    modules,
                    entity.encryption,
                    entity.last_connection,
                ],
            )?;
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.db.with(|conn| {
            conn.execute("DELETE FROM databases WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdditionalModule, Endpoint};
    use chrono::{TimeZone, Utc};

    fn store() -> SqliteDatabaseStore {
        SqliteDatabaseStore::new(DatabaseConnection::open_in_memory().unwrap())
    }

    fn entity(id: &str, name: &str) -> DatabaseEntity {
        DatabaseEntity {
            id: id.to_string(),
            name: name.to_string(),
            host: "localhost".to_string(),
            port: 6379,
            connection_type: ConnectionType::Cluster,
            password: Some("cipher".to_string()),
            nodes: vec![Endpoint::new("10.0.0.1", 7000)],
            modules: vec![AdditionalModule {
                name: "search".to_string(),
                version: Some(20811),
                semantic_version: Some("2.8.11".to_string()),
            }],
            encryption: Some("AES256GCM".to_string()),
            last_connection: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            ..DatabaseEntity::default()
        }
    }

    #[test]
    fn test_save_and_find() {
        let store = store();
        let row = entity("a", "alpha");
        store.save(&row).unwrap();

        assert!(store.exists("a").unwrap());
        assert!(!store.exists("b").unwrap());
        assert_eq!(store.find_by_id("a").unwrap(), Some(row));
        assert_eq!(store.find_by_id("b").unwrap(), None);
    }

    #[test]
    fn test_save_replaces_row() {
        let store = store();
        store.save(&entity("a", "alpha")).unwrap();

        let mut row = entity("a", "renamed");
        row.password = None;
        store.save(&row).unwrap();

        let stored = store.find_by_id("a").unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.password, None);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_projection_sorted() {
        let store = store();
        store.save(&entity("2", "beta")).unwrap();
        store.save(&entity("1", "alpha")).unwrap();

        let items = store.list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "alpha");
        assert_eq!(items[0].connection_type, ConnectionType::Cluster);
        assert_eq!(items[0].modules[0].name, "search");
    }

    #[test]
    fn test_delete() {
        let store = store();
        store.save(&entity("a", "alpha")).unwrap();
        store.delete("a").unwrap();
        store.delete("a").unwrap();

        assert!(!store.exists("a").unwrap());
    }
}
