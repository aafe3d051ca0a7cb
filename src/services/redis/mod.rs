//! Redis Access
//!
//! Command descriptions, the executor/resolver seams and the `fred` backed
//! implementation of both.

mod client;
mod command;
mod executor;

pub use client::*;
pub use command::*;
pub use executor::*;
