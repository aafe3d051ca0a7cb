//! Redis Commands
//!
//! Binary-safe command descriptions and per-command reply faults, independent
//! of the client that eventually sends them.

use crate::constants::NO_PERMISSION_MARKER;
use crate::error::Error;
use bytes::Bytes;
use fred::types::Value;
use std::fmt;

/// A command name plus binary-safe arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisCommand {
    pub name: &'static str,
    pub args: Vec<Bytes>,
    /// Position of the key argument used for cluster slot routing
    pub key_index: Option<usize>,
}

impl RedisCommand {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
            key_index: None,
        }
    }

    /// Append the routing key; the first key appended decides the slot
    pub fn key(mut self, key: impl AsRef<[u8]>) -> Self {
        if self.key_index.is_none() {
            self.key_index = Some(self.args.len());
        }
        self.arg(key)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// Append several arguments
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        self.args
            .extend(args.into_iter().map(|a| Bytes::copy_from_slice(a.as_ref())));
        self
    }

    /// Display name including the subcommand, e.g. `MEMORY USAGE`
    pub fn display_name(&self) -> String {
        match self.name {
            "MEMORY" | "CONFIG" | "FT.CONFIG" | "CLIENT" => match self.args.first() {
                Some(sub) => format!("{} {}", self.name, String::from_utf8_lossy(sub)),
                None => self.name.to_string(),
            },
            _ => self.name.to_string(),
        }
    }
}

impl fmt::Display for RedisCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Server-side rejection of a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyError {
    pub command: String,
    pub message: String,
}

impl ReplyError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }

    /// ACL denied the command
    pub fn is_no_permission(&self) -> bool {
        self.message.contains(NO_PERMISSION_MARKER)
    }
}

impl From<ReplyError> for Error {
    fn from(e: ReplyError) -> Self {
        if e.is_no_permission() {
            Error::NoPermission {
                command: e.command,
                message: e.message,
            }
        } else {
            Error::Reply {
                command: e.command,
                message: e.message,
            }
        }
    }
}

/// Reply to one command of a batch
pub type CommandReply = Result<Value, ReplyError>;

// ==================== Reply decoding ====================

/// Integer reply, accepting numeric strings
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::String(s) => s.parse().ok(),
        Value::Bytes(b) => std::str::from_utf8(b).ok()?.parse().ok(),
        _ => None,
    }
}

/// Bulk or simple string reply as raw bytes
pub fn value_as_bytes(value: &Value) -> Option<Bytes> {
    match value {
        Value::Bytes(b) => Some(b.clone()),
        Value::String(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
        Value::Integer(i) => Some(Bytes::from(i.to_string())),
        _ => None,
    }
}

/// String reply decoded lossily
pub fn value_as_string(value: &Value) -> Option<String> {
    value_as_bytes(value).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// Array reply, treating nil as empty
pub fn value_as_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
