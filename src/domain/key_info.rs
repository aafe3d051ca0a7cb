//! Key Info
//!
//! Redis data types and the aggregated per-key metadata record.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Redis key type as reported by `TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RedisDataType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "hash")]
    Hash,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "zset")]
    ZSet,
    #[serde(rename = "stream")]
    Stream,
    #[serde(rename = "ReJSON-RL")]
    Json,
    #[serde(rename = "graphdata")]
    Graph,
    #[serde(rename = "TSDB-TYPE")]
    TimeSeries,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RedisDataType {
    /// Name as returned by the `TYPE` command
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisDataType::String => "string",
            RedisDataType::Hash => "hash",
            RedisDataType::List => "list",
            RedisDataType::Set => "set",
            RedisDataType::ZSet => "zset",
            RedisDataType::Stream => "stream",
            RedisDataType::Json => "ReJSON-RL",
            RedisDataType::Graph => "graphdata",
            RedisDataType::TimeSeries => "TSDB-TYPE",
            RedisDataType::Unknown => "unknown",
        }
    }

    /// Parse from a `TYPE` reply; unrecognized module types map to `Unknown`
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "string" => RedisDataType::String,
            "hash" => RedisDataType::Hash,
            "list" => RedisDataType::List,
            "set" => RedisDataType::Set,
            "zset" => RedisDataType::ZSet,
            "stream" => RedisDataType::Stream,
            "ReJSON-RL" => RedisDataType::Json,
            "graphdata" => RedisDataType::Graph,
            "TSDB-TYPE" => RedisDataType::TimeSeries,
            _ => RedisDataType::Unknown,
        }
    }

    /// Element-count command for this type, if the server has one
    pub fn length_command(&self) -> Option<&'static str> {
        match self {
            RedisDataType::String => Some("STRLEN"),
            RedisDataType::Hash => Some("HLEN"),
            RedisDataType::List => Some("LLEN"),
            RedisDataType::Set => Some("SCARD"),
            RedisDataType::ZSet => Some("ZCARD"),
            RedisDataType::Stream => Some("XLEN"),
            RedisDataType::Json
            | RedisDataType::Graph
            | RedisDataType::TimeSeries
            | RedisDataType::Unknown => None,
        }
    }
}

impl fmt::Display for RedisDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated read-only view of one key
///
/// `ttl` is `-1` for keys without expiry. `size` is `None` when `MEMORY USAGE`
/// was unavailable; `length` is `None` for types without a count command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub name: Bytes,
    #[serde(rename = "type")]
    pub key_type: RedisDataType,
    pub ttl: i64,
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub length: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trip() {
        for t in [
            RedisDataType::String,
            RedisDataType::Hash,
            RedisDataType::List,
            RedisDataType::Set,
            RedisDataType::ZSet,
            RedisDataType::Stream,
            RedisDataType::Json,
            RedisDataType::Graph,
            RedisDataType::TimeSeries,
        ] {
            assert_eq!(RedisDataType::from_type_str(t.as_str()), t);
        }
        assert_eq!(RedisDataType::from_type_str("none"), RedisDataType::Unknown);
    }

    #[test]
    fn test_length_commands() {
        assert_eq!(RedisDataType::Hash.length_command(), Some("HLEN"));
        assert_eq!(RedisDataType::Stream.length_command(), Some("XLEN"));
        assert_eq!(RedisDataType::Json.length_command(), None);
    }

    #[test]
    fn test_key_info_serialization() {
        let info = KeyInfo {
            name: Bytes::from_static(b"testHash"),
            key_type: RedisDataType::Hash,
            ttl: -1,
            size: None,
            length: Some(10),
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "hash");
        assert!(value["size"].is_null());
        assert_eq!(value["length"], 10);

        let no_length = KeyInfo { length: None, ..info };
        let value = serde_json::to_value(&no_length).unwrap();
        assert!(value.get("length").is_none());
    }
}
