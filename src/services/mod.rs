//! Service Layer
//!
//! Redis-facing services: connection handling and command plumbing in
//! [`redis`], key browsing operations in [`browser`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              BrowserService<R>               │
//! │  ┌────────────┐ ┌────────────┐ ┌──────────┐  │
//! │  │  KeyInfo   │ │ RediSearch │ │ Streams  │  │
//! │  └────────────┘ └────────────┘ └──────────┘  │
//! └──────────────────────────────────────────────┘
//!                       │ resolve(profile id)
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │  RedisClientProvider ──► RedisConnection     │
//! │  (profiles from storage::DatabaseService)    │
//! └──────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod redis;

pub use browser::*;
pub use redis::*;
