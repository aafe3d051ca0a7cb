//! Database Service
//!
//! Async facade over [`LocalDatabaseRepository`]. Every call runs on the
//! blocking pool because SQLite access is synchronous.

use super::certificate::{SqliteCaCertificateRepository, SqliteClientCertificateRepository};
use super::connection::DatabaseConnection;
use super::repository::LocalDatabaseRepository;
use super::store::SqliteDatabaseStore;
use crate::config::AppSettings;
use crate::domain::{Database, DatabaseListItem, DatabasePatch};
use crate::encryption::{EncryptionManager, EncryptionService};
use crate::error::Result;
use std::sync::Arc;

/// Cloneable handle to the profile repository
#[derive(Clone)]
pub struct DatabaseService {
    repository: Arc<LocalDatabaseRepository>,
}

impl DatabaseService {
    pub fn new(repository: LocalDatabaseRepository) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Wire SQLite repositories over one connection
    pub fn with_connection(db: DatabaseConnection, encryption: Arc<dyn EncryptionService>) -> Self {
        Self::new(LocalDatabaseRepository::new(
            Arc::new(SqliteDatabaseStore::new(db.clone())),
            Arc::new(SqliteCaCertificateRepository::new(db.clone(), encryption.clone())),
            Arc::new(SqliteClientCertificateRepository::new(db, encryption.clone())),
            encryption,
        ))
    }

    /// Open the configured store file with the configured encryption
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let encryption =
            EncryptionManager::from_settings(&settings.encryption, &settings.key_file_path()?)?;
        let db = DatabaseConnection::open(&settings.database_path()?)?;
        Ok(Self::with_connection(db, Arc::new(encryption)))
    }

    async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&LocalDatabaseRepository) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let repository = self.repository.clone();
        tokio::task::spawn_blocking(move || f(&repository)).await?
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run(move |repo| repo.exists(&id)).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Database>> {
        let id = id.to_string();
        self.run(move |repo| repo.get(&id)).await
    }

    pub async fn list(&self) -> Result<Vec<DatabaseListItem>> {
        self.run(|repo| repo.list()).await
    }

    pub async fn create(&self, database: Database) -> Result<Database> {
        self.run(move |repo| repo.create(database)).await
    }

    pub async fn update(&self, id: &str, patch: DatabasePatch) -> Result<Database> {
        let id = id.to_string();
        self.run(move |repo| repo.update(&id, patch)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |repo| repo.delete(&id)).await
    }

    pub async fn touch_last_connection(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |repo| repo.touch_last_connection(&id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockEncryption;

    fn service() -> DatabaseService {
        DatabaseService::with_connection(
            DatabaseConnection::open_in_memory().unwrap(),
            Arc::new(MockEncryption::new()),
        )
    }

    #[tokio::test]
    async fn test_crud_through_service() {
        let service = service();
        let created = service
            .create(Database::standalone("local", "127.0.0.1", 6379))
            .await
            .unwrap();

        assert!(service.exists(&created.id).await.unwrap());
        assert_eq!(service.get(&created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(service.list().await.unwrap().len(), 1);

        let updated = service
            .update(
                &created.id,
                DatabasePatch {
                    port: Some(6380),
                    ..DatabasePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.port, 6380);

        service.delete(&created.id).await.unwrap();
        assert_eq!(service.get(&created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_touch_last_connection() {
        let service = service();
        let created = service
            .create(Database::standalone("local", "127.0.0.1", 6379))
            .await
            .unwrap();
        assert!(created.last_connection.is_none());

        service.touch_last_connection(&created.id).await.unwrap();

        let items = service.list().await.unwrap();
        assert!(items[0].last_connection.is_some());
    }

    #[tokio::test]
    async fn test_from_settings_opens_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = AppSettings::default();
        settings.database.path = Some(dir.path().join("store.db"));
        settings.encryption.key_file = Some(dir.path().join("encryption.key"));

        let service = DatabaseService::from_settings(&settings).unwrap();
        let created = service
            .create(Database {
                password: Some("secret".to_string()),
                ..Database::standalone("local", "127.0.0.1", 6379)
            })
            .await
            .unwrap();

        assert_eq!(created.password.as_deref(), Some("secret"));
        assert!(dir.path().join("encryption.key").exists());
    }
}
