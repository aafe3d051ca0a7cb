//! Command Execution Seams
//!
//! The browser services talk to Redis only through these traits, so the
//! aggregation logic can be exercised without a server.

use super::command::{CommandReply, RedisCommand};
use crate::domain::ConnectionType;
use crate::error::Result;
use fred::types::Value;
use std::future::Future;

/// A live, ready-to-use handle for one profile
pub trait CommandExecutor: Send + Sync {
    /// Topology behind this handle
    fn connection_type(&self) -> ConnectionType;

    /// Send one command; reply faults surface as `Reply`/`NoPermission` errors
    fn send_command(&self, command: RedisCommand) -> impl Future<Output = Result<Value>> + Send;

    /// Send a batch in one round trip.
    ///
    /// `Err` is a transport fault. `Ok` holds exactly one reply per command, in
    /// input order.
    fn exec_pipeline(
        &self,
        commands: Vec<RedisCommand>,
    ) -> impl Future<Output = Result<Vec<CommandReply>>> + Send;

    /// Send one command to every primary node (a single reply when not clustered)
    fn send_to_primaries(
        &self,
        command: RedisCommand,
    ) -> impl Future<Output = Result<Vec<CommandReply>>> + Send;
}

/// Resolves a profile id to a connected handle
pub trait ConnectionResolver: Send + Sync {
    type Connection: CommandExecutor;

    fn resolve(&self, database_id: &str) -> impl Future<Output = Result<Self::Connection>> + Send;
}
