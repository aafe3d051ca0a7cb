//! Domain Models
//!
//! Plain data types shared by the storage and service layers.

pub mod database;
pub mod key_info;
pub mod view_state;

pub use database::*;
pub use key_info::*;
pub use view_state::*;
