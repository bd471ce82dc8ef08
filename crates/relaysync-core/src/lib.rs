//! # relaysync Core
//!
//! Keeps a Postfix client access file in line with an upstream's published IP
//! ranges.
//!
//! ```text
//! relaysync-core/src/
//! ├── upstream/      # HTTP fetch client + document parser
//! ├── access_file.rs # deterministic render + atomic replace
//! ├── reload.rs      # Postfix control commands
//! ├── agent.rs       # read-only Postfix status/check/queue inspection
//! ├── status.rs      # single-writer SyncState snapshots
//! ├── sync.rs        # one fetch → parse → diff → write → reload cycle
//! ├── metrics/       # push emitter, Datadog sink, Prometheus gauges
//! └── notify.rs      # optional Slack notifications
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod access_file;
pub mod agent;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod reload;
pub mod status;
pub mod sync;
pub mod upstream;

pub use access_file::{AccessFile, FileInfo};
pub use agent::{AgentReport, PostfixAgent, QueueReport};
pub use error::{CoreError, CoreResult};
pub use notify::{Severity, SlackNotifier};
pub use reload::{PostfixReloader, Reloader};
pub use status::{status_channel, StatusHandle, StatusPublisher};
pub use sync::{CycleOutcome, SyncCycle, Synchronizer};
pub use upstream::{RangeFilter, UpstreamClient};
