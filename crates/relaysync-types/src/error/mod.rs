//! Typed error definitions for relaysync.
//!
//! Errors in this module travel over the status API, so they are:
//!
//! - **Serializable** for API responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod config;
mod sync;

pub use config::ConfigError;
pub use sync::{SyncErrorKind, SyncFailure};
