//! Test doubles shared by the unit tests.

use crate::domain::ConnectionType;
use crate::encryption::{EncryptResult, EncryptionService, EncryptionStrategy};
use crate::error::{Error, Result};
use crate::services::redis::{
    CommandExecutor, CommandReply, ConnectionResolver, RedisCommand, ReplyError,
};
use fred::types::Value;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const NO_PERM_MESSAGE: &str =
    "NOPERM this user has no permissions to run the command";

/// Scripted reply for one command name
#[derive(Clone)]
pub enum Scripted {
    Reply(CommandReply),
    /// Transport failure of the whole call
    Transport(String),
}

/// Executor that answers from a script keyed by command display name
#[derive(Clone, Default)]
pub struct MockExecutor {
    inner: Arc<MockExecutorInner>,
}

#[derive(Default)]
struct MockExecutorInner {
    connection_type: Mutex<ConnectionType>,
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
    pipeline_replies: Mutex<Option<Result<Vec<CommandReply>, String>>>,
    primaries: Mutex<HashMap<String, Vec<CommandReply>>>,
    sent: Mutex<Vec<RedisCommand>>,
    pipelines: Mutex<Vec<Vec<RedisCommand>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster() -> Self {
        let mock = Self::default();
        *mock.inner.connection_type.lock() = ConnectionType::Cluster;
        mock
    }

    /// Queue a reply for the next `send_command` with this display name
    pub fn on(&self, name: &str, reply: Scripted) -> &Self {
        self.inner
            .replies
            .lock()
            .entry(name.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn ok(&self, name: &str, value: Value) -> &Self {
        self.on(name, Scripted::Reply(Ok(value)))
    }

    pub fn fail(&self, name: &str, message: &str) -> &Self {
        self.on(name, Scripted::Reply(Err(ReplyError::new(name, message))))
    }

    /// Replies for the next pipeline
    pub fn pipeline(&self, replies: Vec<CommandReply>) -> &Self {
        *self.inner.pipeline_replies.lock() = Some(Ok(replies));
        self
    }

    pub fn pipeline_transport_error(&self, message: &str) -> &Self {
        *self.inner.pipeline_replies.lock() = Some(Err(message.to_string()));
        self
    }

    /// Per-node replies for `send_to_primaries` on a cluster
    pub fn primaries(&self, name: &str, replies: Vec<CommandReply>) -> &Self {
        self.inner
            .primaries
            .lock()
            .insert(name.to_string(), replies);
        self
    }

    pub fn sent(&self) -> Vec<RedisCommand> {
        self.inner.sent.lock().clone()
    }

    pub fn sent_names(&self) -> Vec<String> {
        self.sent().iter().map(|c| c.display_name()).collect()
    }

    pub fn pipelines(&self) -> Vec<Vec<RedisCommand>> {
        self.inner.pipelines.lock().clone()
    }

    fn next_reply(&self, name: &str) -> Scripted {
        self.inner
            .replies
            .lock()
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Scripted::Reply(Ok(Value::Null)))
    }
}

fn transport(message: String) -> Error {
    Error::Redis {
        source: fred::error::Error::new(fred::error::ErrorKind::IO, message),
    }
}

impl CommandExecutor for MockExecutor {
    fn connection_type(&self) -> ConnectionType {
        *self.inner.connection_type.lock()
    }

    async fn send_command(&self, command: RedisCommand) -> Result<Value> {
        let name = command.display_name();
        self.inner.sent.lock().push(command);
        match self.next_reply(&name) {
            Scripted::Reply(reply) => reply.map_err(Error::from),
            Scripted::Transport(message) => Err(transport(message)),
        }
    }

    async fn exec_pipeline(&self, commands: Vec<RedisCommand>) -> Result<Vec<CommandReply>> {
        self.inner.pipelines.lock().push(commands.clone());
        match self.inner.pipeline_replies.lock().take() {
            Some(Ok(replies)) => Ok(replies),
            Some(Err(message)) => Err(transport(message)),
            None => Ok(commands.iter().map(|_| Ok(Value::Null)).collect()),
        }
    }

    async fn send_to_primaries(&self, command: RedisCommand) -> Result<Vec<CommandReply>> {
        if self.connection_type() != ConnectionType::Cluster {
            let name = command.display_name();
            self.inner.sent.lock().push(command);
            return match self.next_reply(&name) {
                Scripted::Reply(reply) => Ok(vec![reply]),
                Scripted::Transport(message) => Err(transport(message)),
            };
        }

        let name = command.display_name();
        self.inner.sent.lock().push(command);
        Ok(self
            .inner
            .primaries
            .lock()
            .get(&name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolver handing out one shared mock executor
pub struct MockResolver {
    pub executor: MockExecutor,
    pub resolved: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new(executor: MockExecutor) -> Self {
        Self {
            executor,
            resolved: Mutex::new(Vec::new()),
        }
    }
}

impl ConnectionResolver for MockResolver {
    type Connection = MockExecutor;

    async fn resolve(&self, database_id: &str) -> Result<MockExecutor> {
        self.resolved.lock().push(database_id.to_string());
        Ok(self.executor.clone())
    }
}

/// Reversible fake cipher: `enc(<plain>)` tagged with the configured strategy
pub struct MockEncryption {
    pub strategy: Mutex<EncryptionStrategy>,
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    pub encrypted: Mutex<Vec<String>>,
}

impl MockEncryption {
    pub fn new() -> Self {
        Self {
            strategy: Mutex::new(EncryptionStrategy::Aes256Gcm),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            encrypted: Mutex::new(Vec::new()),
        }
    }

    pub fn cipher(plain: &str) -> String {
        format!("enc({plain})")
    }

    pub fn encrypt_count(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_count(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.encrypt_calls.store(0, Ordering::SeqCst);
        self.decrypt_calls.store(0, Ordering::SeqCst);
        self.encrypted.lock().clear();
    }
}

impl EncryptionService for MockEncryption {
    fn encrypt(&self, plain: &str) -> Result<EncryptResult> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.encrypted.lock().push(plain.to_string());
        Ok(EncryptResult {
            data: Self::cipher(plain),
            encryption: *self.strategy.lock(),
        })
    }

    fn decrypt(&self, data: &str, encryption: Option<&str>) -> Result<String> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if encryption.is_none() {
            return Ok(data.to_string());
        }
        data.strip_prefix("enc(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(str::to_string)
            .ok_or_else(|| Error::Encryption {
                message: format!("malformed ciphertext {data}"),
            })
    }
}
