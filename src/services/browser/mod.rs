//! Key Browser
//!
//! Read and write operations on keys of a connected database. Each call
//! resolves the profile's connection first.

mod key_info;
mod redisearch;
mod stream;

pub use key_info::*;
pub use redisearch::*;
pub use stream::*;

use crate::config::BrowserSettings;
use crate::domain::{KeyInfo, RedisDataType};
use crate::error::Result;
use crate::services::redis::ConnectionResolver;
use std::sync::Arc;

/// Browser operations over any connection resolver
pub struct BrowserService<R: ConnectionResolver> {
    resolver: Arc<R>,
    key_info: KeyInfoManager,
}

impl<R: ConnectionResolver> Clone for BrowserService<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            key_info: self.key_info.clone(),
        }
    }
}

impl<R: ConnectionResolver> BrowserService<R> {
    pub fn new(resolver: Arc<R>, settings: &BrowserSettings) -> Self {
        Self {
            resolver,
            key_info: KeyInfoManager::from_settings(settings),
        }
    }

    pub fn resolver(&self) -> &Arc<R> {
        &self.resolver
    }

    // ===== Keys =====

    pub async fn get_key_info(
        &self,
        database_id: &str,
        key: &[u8],
        key_type: RedisDataType,
    ) -> Result<KeyInfo> {
        let connection = self.resolver.resolve(database_id).await?;
        self.key_info.get_info(&connection, key, key_type).await
    }

    pub async fn get_key_info_auto(&self, database_id: &str, key: &[u8]) -> Result<KeyInfo> {
        let connection = self.resolver.resolve(database_id).await?;
        self.key_info.get_info_auto(&connection, key).await
    }

    // ===== RediSearch =====

    pub async fn list_indexes(&self, database_id: &str) -> Result<RedisearchIndexList> {
        let connection = self.resolver.resolve(database_id).await?;
        list_indexes(&connection).await
    }

    pub async fn create_index(&self, database_id: &str, dto: &CreateRedisearchIndex) -> Result<()> {
        let connection = self.resolver.resolve(database_id).await?;
        create_index(&connection, dto).await
    }

    pub async fn search(
        &self,
        database_id: &str,
        dto: &SearchRedisearch,
    ) -> Result<RedisearchSearchResult> {
        let connection = self.resolver.resolve(database_id).await?;
        search(&connection, dto).await
    }

    // ===== Streams =====

    pub async fn add_stream_key(&self, database_id: &str, dto: CreateStreamKey) -> Result<()> {
        let connection = self.resolver.resolve(database_id).await?;
        add_stream_key(&connection, dto).await
    }

    pub async fn add_stream_entries(
        &self,
        database_id: &str,
        key: &[u8],
        entries: Vec<StreamEntry>,
    ) -> Result<Vec<String>> {
        let connection = self.resolver.resolve(database_id).await?;
        add_entries(&connection, key, entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockExecutor, MockResolver};
    use fred::types::Value;

    fn service(executor: MockExecutor) -> BrowserService<MockResolver> {
        BrowserService::new(
            Arc::new(MockResolver::new(executor)),
            &BrowserSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_key_info_resolves_profile() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![
            Ok(Value::Integer(-1)),
            Ok(Value::Integer(50)),
            Ok(Value::Integer(10)),
        ]);
        let browser = service(executor);

        let info = browser
            .get_key_info("db-1", b"testHash", RedisDataType::Hash)
            .await
            .unwrap();

        assert_eq!(info.length, Some(10));
        assert_eq!(*browser.resolver().resolved.lock(), vec!["db-1".to_string()]);
    }

    #[tokio::test]
    async fn test_each_call_resolves_again() {
        let executor = MockExecutor::new();
        executor.ok("FT._LIST", Value::Array(vec![]));
        executor.ok("FT._LIST", Value::Array(vec![]));
        let browser = service(executor);

        browser.list_indexes("db-1").await.unwrap();
        browser.list_indexes("db-2").await.unwrap();

        assert_eq!(browser.resolver().resolved.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_entries_through_service() {
        let executor = MockExecutor::new();
        executor.ok("EXISTS", Value::Integer(1));
        executor.pipeline(vec![Ok(Value::String("5-0".into()))]);
        let browser = service(executor);

        let ids = browser
            .add_stream_entries(
                "db-1",
                b"events",
                vec![StreamEntry::auto(vec![StreamEntryField::new("a", "1")])],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["5-0"]);
    }
}
