//! RediSearch Indexes
//!
//! Listing, creation and paged search of `FT.*` indexes. Index commands are not
//! slot-routed, so on a cluster they are fanned out to every primary node.

use crate::error::{Error, Result};
use crate::services::redis::{
    CommandExecutor, RedisCommand, value_as_array, value_as_bytes, value_as_i64,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Key type an index is built over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisearchIndexKeyType {
    #[default]
    Hash,
    Json,
}

impl RedisearchIndexKeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisearchIndexKeyType::Hash => "hash",
            RedisearchIndexKeyType::Json => "json",
        }
    }
}

/// Schema field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisearchFieldType {
    Text,
    Tag,
    Numeric,
    Geo,
    Geoshape,
    Vector,
}

impl RedisearchFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisearchFieldType::Text => "text",
            RedisearchFieldType::Tag => "tag",
            RedisearchFieldType::Numeric => "numeric",
            RedisearchFieldType::Geo => "geo",
            RedisearchFieldType::Geoshape => "geoshape",
            RedisearchFieldType::Vector => "vector",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisearchIndexField {
    pub name: Bytes,
    #[serde(rename = "type")]
    pub field_type: RedisearchFieldType,
}

/// Request to create an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedisearchIndex {
    pub index: Bytes,
    #[serde(rename = "type")]
    pub key_type: RedisearchIndexKeyType,
    #[serde(default)]
    pub prefixes: Vec<Bytes>,
    pub fields: Vec<RedisearchIndexField>,
}

/// Paged query against an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRedisearch {
    pub index: Bytes,
    pub query: String,
    pub limit: u64,
    pub offset: u64,
}

/// Index names known to the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisearchIndexList {
    pub indexes: Vec<Bytes>,
}

/// One page of matching key names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisearchSearchResult {
    pub cursor: u64,
    pub scanned: usize,
    pub total: i64,
    pub max_results: Option<i64>,
    pub keys: Vec<Bytes>,
}

/// Reply text of `FT.INFO` for a missing index
fn is_unknown_index(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("unknown index name") || message.contains("no such index")
}

/// Build `FT.CREATE index ON type [PREFIX n ...] SCHEMA name type ...`
pub fn build_create_command(dto: &CreateRedisearchIndex) -> RedisCommand {
    let mut command = RedisCommand::new("FT.CREATE")
        .arg(&dto.index)
        .arg("ON")
        .arg(dto.key_type.as_str());

    if !dto.prefixes.is_empty() {
        command = command
            .arg("PREFIX")
            .arg(dto.prefixes.len().to_string())
            .args(&dto.prefixes);
    }

    command = command.arg("SCHEMA");
    for field in &dto.fields {
        command = command.arg(&field.name).arg(field.field_type.as_str());
    }
    command
}

/// List all indexes, merging node replies on a cluster
pub async fn list_indexes<E: CommandExecutor>(executor: &E) -> Result<RedisearchIndexList> {
    let replies = executor
        .send_to_primaries(RedisCommand::new("FT._LIST"))
        .await?;

    let mut indexes: Vec<Bytes> = Vec::new();
    for reply in replies {
        for value in value_as_array(reply?) {
            if let Some(name) = value_as_bytes(&value)
                && !indexes.contains(&name)
            {
                indexes.push(name);
            }
        }
    }

    debug!("Found {} search indexes", indexes.len());
    Ok(RedisearchIndexList { indexes })
}

/// Create an index unless one with the same name exists
pub async fn create_index<E: CommandExecutor>(
    executor: &E,
    dto: &CreateRedisearchIndex,
) -> Result<()> {
    let index_name = String::from_utf8_lossy(&dto.index).into_owned();

    match executor
        .send_command(RedisCommand::new("FT.INFO").arg(&dto.index))
        .await
    {
        Ok(_) => {
            return Err(Error::Conflict {
                message: format!("This index name is already in use: {index_name}"),
            });
        }
        Err(Error::Reply { message, .. }) if is_unknown_index(&message) => {}
        Err(e) => return Err(e),
    }

    let replies = executor.send_to_primaries(build_create_command(dto)).await?;

    let mut created = false;
    let mut last_fault = None;
    for reply in replies {
        match reply {
            Ok(_) => created = true,
            Err(e) if e.is_no_permission() => return Err(e.into()),
            Err(e) => {
                warn!("Index {} not created on a node: {}", index_name, e.message);
                last_fault = Some(e);
            }
        }
    }

    match (created, last_fault) {
        (true, _) => {
            info!("Created search index {}", index_name);
            Ok(())
        }
        (false, Some(e)) => Err(e.into()),
        (false, None) => Err(Error::Invalid {
            message: format!("No node accepted index {index_name}"),
        }),
    }
}

/// Run a `NOCONTENT` search returning one page of key names
pub async fn search<E: CommandExecutor>(
    executor: &E,
    dto: &SearchRedisearch,
) -> Result<RedisearchSearchResult> {
    let reply = executor
        .send_command(
            RedisCommand::new("FT.SEARCH")
                .arg(&dto.index)
                .arg(&dto.query)
                .arg("NOCONTENT")
                .arg("LIMIT")
                .arg(dto.offset.to_string())
                .arg(dto.limit.to_string()),
        )
        .await?;

    let mut items = value_as_array(reply).into_iter();
    let total = items.next().as_ref().and_then(value_as_i64).unwrap_or(0);
    let keys: Vec<Bytes> = items.filter_map(|v| value_as_bytes(&v)).collect();

    let max_results = max_search_results(executor).await;

    Ok(RedisearchSearchResult {
        cursor: dto.offset.saturating_add(dto.limit),
        scanned: keys.len(),
        total,
        max_results,
        keys,
    })
}

/// `FT.CONFIG GET MAXSEARCHRESULTS`, `None` when unavailable
async fn max_search_results<E: CommandExecutor>(executor: &E) -> Option<i64> {
    let reply = executor
        .send_command(RedisCommand::new("FT.CONFIG").args(["GET", "MAXSEARCHRESULTS"]))
        .await;

    match reply {
        // [[name, value]]
        Ok(value) => value_as_array(value)
            .into_iter()
            .next()
            .map(value_as_array)
            .and_then(|pair| pair.get(1).and_then(value_as_i64)),
        Err(e) => {
            debug!("MAXSEARCHRESULTS unavailable: {}", e);
            None
        }
    }
}
