//! Key Info Aggregation
//!
//! Pipelines `TTL`, `MEMORY USAGE` and a type-specific length command for one
//! key and folds the replies into a [`KeyInfo`].

use crate::config::BrowserSettings;
use crate::domain::{KeyInfo, RedisDataType};
use crate::error::{Error, Result};
use crate::services::redis::{
    CommandExecutor, CommandReply, RedisCommand, value_as_i64, value_as_string,
};
use bytes::Bytes;
use tracing::{debug, warn};

/// What to do when `MEMORY USAGE` is denied by ACL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUsageAclPolicy {
    /// Fail the whole lookup with `NoPermission`
    Abort,
    /// Report `size = None`, same as an unsupported command
    Ignore,
}

/// Builds and reduces key info batches
#[derive(Debug, Clone)]
pub struct KeyInfoManager {
    memory_usage_samples: u32,
    acl_policy: MemoryUsageAclPolicy,
}

impl Default for KeyInfoManager {
    fn default() -> Self {
        Self::from_settings(&BrowserSettings::default())
    }
}

impl KeyInfoManager {
    pub fn new(memory_usage_samples: u32, acl_policy: MemoryUsageAclPolicy) -> Self {
        Self {
            memory_usage_samples,
            acl_policy,
        }
    }

    pub fn from_settings(settings: &BrowserSettings) -> Self {
        let acl_policy = if settings.abort_on_memory_usage_no_permission {
            MemoryUsageAclPolicy::Abort
        } else {
            MemoryUsageAclPolicy::Ignore
        };
        Self::new(settings.memory_usage_samples, acl_policy)
    }

    /// Ordered batch: TTL, MEMORY USAGE, then the length command when the type has one
    pub fn build_commands(&self, key: &[u8], key_type: RedisDataType) -> Vec<RedisCommand> {
        let mut commands = vec![
            RedisCommand::new("TTL").key(key),
            RedisCommand::new("MEMORY")
                .arg("USAGE")
                .key(key)
                .arg("samples")
                .arg(self.memory_usage_samples.to_string()),
        ];
        if let Some(length_command) = key_type.length_command() {
            commands.push(RedisCommand::new(length_command).key(key));
        }
        commands
    }

    /// Fold positional replies into a record
    pub fn reduce(
        &self,
        key: &[u8],
        key_type: RedisDataType,
        replies: Vec<CommandReply>,
    ) -> Result<KeyInfo> {
        let mut replies = replies.into_iter();

        let ttl = match replies.next() {
            Some(Ok(value)) => value_as_i64(&value).ok_or_else(|| Error::Invalid {
                message: "Unexpected TTL reply".to_string(),
            })?,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(missing_reply("TTL")),
        };

        let size = match replies.next() {
            Some(Ok(value)) => value_as_i64(&value),
            Some(Err(e)) if e.is_no_permission() && self.acl_policy == MemoryUsageAclPolicy::Abort => {
                return Err(e.into());
            }
            Some(Err(e)) => {
                warn!("Key size unavailable: {}", e.message);
                None
            }
            None => return Err(missing_reply("MEMORY USAGE")),
        };

        let length = match key_type.length_command() {
            Some(command) => match replies.next() {
                Some(Ok(value)) => value_as_i64(&value),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(missing_reply(command)),
            },
            None => None,
        };

        Ok(KeyInfo {
            name: Bytes::copy_from_slice(key),
            key_type,
            ttl,
            size,
            length,
        })
    }

    /// Aggregate info for a key of a known type
    pub async fn get_info<E: CommandExecutor>(
        &self,
        executor: &E,
        key: &[u8],
        key_type: RedisDataType,
    ) -> Result<KeyInfo> {
        debug!(
            "Getting {} key info for {}",
            key_type,
            String::from_utf8_lossy(key)
        );
        let replies = executor
            .exec_pipeline(self.build_commands(key, key_type))
            .await?;
        self.reduce(key, key_type, replies)
    }

    /// Look up the type with `TYPE` first, then aggregate
    pub async fn get_info_auto<E: CommandExecutor>(&self, executor: &E, key: &[u8]) -> Result<KeyInfo> {
        let reply = executor
            .send_command(RedisCommand::new("TYPE").key(key))
            .await?;
        let type_name = value_as_string(&reply).unwrap_or_default();

        if type_name == "none" {
            return Err(Error::NotFound {
                entity: "Key",
                id: String::from_utf8_lossy(key).into_owned(),
            });
        }

        self.get_info(executor, key, RedisDataType::from_type_str(&type_name))
            .await
    }
}

fn missing_reply(command: &str) -> Error {
    Error::Invalid {
        message: format!("Missing {command} reply in pipeline result"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::redis::ReplyError;
    use crate::test_support::{MockExecutor, NO_PERM_MESSAGE};
    use fred::types::Value;

    const KEY: &[u8] = b"testHash";

    fn expected(size: Option<i64>) -> KeyInfo {
        KeyInfo {
            name: Bytes::from_static(KEY),
            key_type: RedisDataType::Hash,
            ttl: -1,
            size,
            length: Some(10),
        }
    }

    #[tokio::test]
    async fn test_returns_all_three_values() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![
            Ok(Value::Integer(-1)),
            Ok(Value::Integer(50)),
            Ok(Value::Integer(10)),
        ]);

        let info = KeyInfoManager::default()
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap();

        assert_eq!(info, expected(Some(50)));

        let batch = &executor.pipelines()[0];
        let names: Vec<String> = batch.iter().map(|c| c.display_name()).collect();
        assert_eq!(names, vec!["TTL", "MEMORY USAGE", "HLEN"]);
        assert_eq!(
            batch[1],
            RedisCommand::new("MEMORY")
                .arg("USAGE")
                .key(KEY)
                .args(["samples", "0"])
        );
    }

    #[tokio::test]
    async fn test_ttl_fault_aborts_with_its_message() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![
            Err(ReplyError::new("TTL", NO_PERM_MESSAGE)),
            Ok(Value::Integer(50)),
            Ok(Value::Integer(10)),
        ]);

        let err = KeyInfoManager::default()
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), NO_PERM_MESSAGE);
        assert!(err.is_no_permission());
    }

    #[tokio::test]
    async fn test_unknown_memory_command_gives_null_size() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![
            Ok(Value::Integer(-1)),
            Err(ReplyError::new("MEMORY USAGE", "ERR unknown command 'memory'")),
            Ok(Value::Integer(10)),
        ]);

        let info = KeyInfoManager::default()
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap();

        assert_eq!(info, expected(None));
    }

    #[tokio::test]
    async fn test_memory_no_permission_follows_policy() {
        let replies = || {
            vec![
                Ok(Value::Integer(-1)),
                Err(ReplyError::new("MEMORY USAGE", NO_PERM_MESSAGE)),
                Ok(Value::Integer(10)),
            ]
        };

        let executor = MockExecutor::new();
        executor.pipeline(replies());
        let err = KeyInfoManager::new(0, MemoryUsageAclPolicy::Abort)
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap_err();
        assert!(err.is_no_permission());

        executor.pipeline(replies());
        let info = KeyInfoManager::new(0, MemoryUsageAclPolicy::Ignore)
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap();
        assert_eq!(info, expected(None));
    }

    #[tokio::test]
    async fn test_length_fault_aborts() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![
            Ok(Value::Integer(-1)),
            Ok(Value::Integer(50)),
            Err(ReplyError::new(
                "HLEN",
                "WRONGTYPE Operation against a key holding the wrong kind of value",
            )),
        ]);

        let err = KeyInfoManager::default()
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("WRONGTYPE"));
    }

    #[tokio::test]
    async fn test_transport_fault_propagates() {
        let executor = MockExecutor::new();
        executor.pipeline_transport_error("connection reset");

        let err = KeyInfoManager::default()
            .get_info(&executor, KEY, RedisDataType::Hash)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Redis { .. }));
    }

    #[tokio::test]
    async fn test_type_without_length_command() {
        let executor = MockExecutor::new();
        executor.pipeline(vec![Ok(Value::Integer(100)), Ok(Value::Integer(72))]);

        let info = KeyInfoManager::default()
            .get_info(&executor, b"doc", RedisDataType::Json)
            .await
            .unwrap();

        assert_eq!(info.ttl, 100);
        assert_eq!(info.size, Some(72));
        assert_eq!(info.length, None);
        assert_eq!(executor.pipelines()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_length_commands_per_type() {
        let manager = KeyInfoManager::new(5, MemoryUsageAclPolicy::Abort);
        for (key_type, command) in [
            (RedisDataType::String, "STRLEN"),
            (RedisDataType::List, "LLEN"),
            (RedisDataType::Set, "SCARD"),
            (RedisDataType::ZSet, "ZCARD"),
            (RedisDataType::Stream, "XLEN"),
        ] {
            let commands = manager.build_commands(b"k", key_type);
            assert_eq!(commands.len(), 3);
            assert_eq!(commands[2].name, command);
            assert_eq!(commands[1].args[3].as_ref(), b"5");
        }
    }

    #[tokio::test]
    async fn test_get_info_auto_resolves_type() {
        let executor = MockExecutor::new();
        executor.ok("TYPE", Value::String("list".into()));
        executor.pipeline(vec![
            Ok(Value::Integer(-1)),
            Ok(Value::Integer(120)),
            Ok(Value::Integer(3)),
        ]);

        let info = KeyInfoManager::default()
            .get_info_auto(&executor, b"queue")
            .await
            .unwrap();

        assert_eq!(info.key_type, RedisDataType::List);
        assert_eq!(info.length, Some(3));
        assert_eq!(executor.pipelines()[0][2].name, "LLEN");
    }

    #[tokio::test]
    async fn test_get_info_auto_missing_key() {
        let executor = MockExecutor::new();
        executor.ok("TYPE", Value::String("none".into()));

        let err = KeyInfoManager::default()
            .get_info_auto(&executor, b"gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(executor.pipelines().is_empty());
    }
}
