//! Local Store
//!
//! SQLite persistence of connection profiles and their certificates.
//!
//! ```text
//! DatabaseService (async, spawn_blocking)
//!        │
//!        ▼
//! LocalDatabaseRepository ──► EncryptionService
//!        │
//!        ├──► DatabaseStore            (databases)
//!        ├──► CaCertificateRepository  (ca_certificates)
//!        └──► ClientCertificateRepository (client_certificates)
//! ```

mod certificate;
mod connection;
mod entities;
mod repository;
mod service;
mod store;

pub use certificate::*;
pub use connection::*;
pub use entities::*;
pub use repository::*;
pub use service::*;
pub use store::*;
