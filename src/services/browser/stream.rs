//! Stream Entries
//!
//! Validation of entry ids and field lists, plus creation of stream keys and
//! appending of entries with `XADD`.

use crate::constants::MIN_STREAM_ENTRY_ID;
use crate::error::{Error, Result};
use crate::services::redis::{CommandExecutor, RedisCommand, value_as_i64, value_as_string};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Auto-generated entry id
pub const AUTO_ENTRY_ID: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntryField {
    pub name: Bytes,
    pub value: Bytes,
}

impl StreamEntryField {
    pub fn new(name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self {
            name: Bytes::copy_from_slice(name.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
        }
    }
}

/// One entry to append
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<StreamEntryField>,
}

impl StreamEntry {
    /// Entry with a server-assigned id
    pub fn auto(fields: Vec<StreamEntryField>) -> Self {
        Self {
            id: AUTO_ENTRY_ID.to_string(),
            fields,
        }
    }
}

/// Request to create a new stream key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamKey {
    pub key_name: Bytes,
    pub entries: Vec<StreamEntry>,
    /// Seconds until the key expires
    pub expire: Option<u64>,
}

/// Validate an entry id: `*`, `<ms>-*` or `<ms>-<seq>`
///
/// `0-0` is never accepted by `XADD` and is raised to the smallest valid id.
pub fn normalize_entry_id(id: &str) -> Result<String> {
    let id = id.trim();
    if id == AUTO_ENTRY_ID {
        return Ok(id.to_string());
    }

    let invalid = || Error::Invalid {
        message: format!("Entry ID format is incorrect: {id}"),
    };

    let (ms, seq) = id.split_once('-').ok_or_else(invalid)?;
    let ms: u64 = ms.parse().map_err(|_| invalid())?;
    if seq == AUTO_ENTRY_ID {
        return Ok(id.to_string());
    }
    let seq: u64 = seq.parse().map_err(|_| invalid())?;

    if ms == 0 && seq == 0 {
        return Ok(MIN_STREAM_ENTRY_ID.to_string());
    }
    Ok(format!("{ms}-{seq}"))
}

/// Collapse duplicate field names and reject empty names or values
///
/// The last value of a repeated name wins; it keeps the position of the first.
pub fn normalize_fields(fields: Vec<StreamEntryField>) -> Result<Vec<StreamEntryField>> {
    if fields.is_empty() {
        return Err(Error::Invalid {
            message: "Stream entry needs at least one field".to_string(),
        });
    }

    let mut normalized: Vec<StreamEntryField> = Vec::with_capacity(fields.len());
    for field in fields {
        if field.name.is_empty() || field.value.is_empty() {
            return Err(Error::Invalid {
                message: "Stream entry field names and values must not be empty".to_string(),
            });
        }
        match normalized.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => existing.value = field.value,
            None => normalized.push(field),
        }
    }
    Ok(normalized)
}

fn xadd_command(key: &[u8], entry: StreamEntry) -> Result<RedisCommand> {
    let id = normalize_entry_id(&entry.id)?;
    let mut command = RedisCommand::new("XADD").key(key).arg(id);
    for field in normalize_fields(entry.fields)? {
        command = command.arg(field.name).arg(field.value);
    }
    Ok(command)
}

async fn key_exists<E: CommandExecutor>(executor: &E, key: &[u8]) -> Result<bool> {
    let reply = executor
        .send_command(RedisCommand::new("EXISTS").key(key))
        .await?;
    Ok(value_as_i64(&reply).unwrap_or(0) > 0)
}

fn key_label(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Create a stream key from its first entries
pub async fn add_stream_key<E: CommandExecutor>(executor: &E, dto: CreateStreamKey) -> Result<()> {
    if dto.key_name.is_empty() {
        return Err(Error::Invalid {
            message: "Stream key name is required".to_string(),
        });
    }
    if dto.entries.is_empty() {
        return Err(Error::Invalid {
            message: "Stream key needs at least one entry".to_string(),
        });
    }

    let mut commands = dto
        .entries
        .into_iter()
        .map(|entry| xadd_command(&dto.key_name, entry))
        .collect::<Result<Vec<_>>>()?;
    if let Some(expire) = dto.expire {
        commands.push(
            RedisCommand::new("EXPIRE")
                .key(&dto.key_name)
                .arg(expire.to_string()),
        );
    }

    if key_exists(executor, &dto.key_name).await? {
        return Err(Error::Conflict {
            message: format!("This key name is already in use: {}", key_label(&dto.key_name)),
        });
    }

    for reply in executor.exec_pipeline(commands).await? {
        reply?;
    }

    info!("Created stream key {}", key_label(&dto.key_name));
    Ok(())
}

/// Append entries to an existing stream, returning the assigned ids
pub async fn add_entries<E: CommandExecutor>(
    executor: &E,
    key: &[u8],
    entries: Vec<StreamEntry>,
) -> Result<Vec<String>> {
    let commands = entries
        .into_iter()
        .map(|entry| xadd_command(key, entry))
        .collect::<Result<Vec<_>>>()?;

    if !key_exists(executor, key).await? {
        return Err(Error::NotFound {
            entity: "Key",
            id: key_label(key),
        });
    }

    let mut ids = Vec::with_capacity(commands.len());
    for reply in executor.exec_pipeline(commands).await? {
        ids.push(value_as_string(&reply?).unwrap_or_default());
    }

    debug!("Added {} entries to {}", ids.len(), key_label(key));
    Ok(ids)
}
