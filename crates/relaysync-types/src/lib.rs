//! # relaysync Types
//!
//! Core types, models, and error definitions for relaysync.
//!
//! - **`error`** - Typed error hierarchy for sync failures and configuration
//! - **`models`** - Domain models (IpRangeSet, SyncState, MetricSample, SyncConfig)
//!
//! ## Architecture Role
//!
//! `relaysync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          relaysync-types (this crate)
//!                  │
//!                  ▼
//!           relaysync-core
//!                  │
//!                  ▼
//!          relaysync-server
//! ```
//!
//! Nothing in here performs I/O. Types are serde-serializable so they can be
//! handed straight to the HTTP API.

pub mod error;
pub mod models;

pub use error::{ConfigError, SyncErrorKind, SyncFailure};
pub use models::{
    IpRangeSet, MetricSample, MetricsConfig, NotifyConfig, RangeDiff, SyncConfig, SyncState,
    FILTER_ANY,
};
