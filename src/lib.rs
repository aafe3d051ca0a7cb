//! redis-admin Library
//!
//! Backend core of a Redis administration tool: stored connection profiles
//! with encrypted credentials, a `fred` based connection provider, and key
//! browsing operations (key info, RediSearch indexes, streams).

pub mod config;
pub mod constants;
pub mod domain;
pub mod encryption;
pub mod error;
pub mod helpers;
pub mod services;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
