//! Load-balanced dispatch of intermediate files to compiler worker processes.
//!
//! # Architecture
//!
//! ```text
//!   Batch (ArtifactRegistry)
//!            │
//!            ▼
//!   partition() ── greedy LPT, ≤ max_workers groups
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │   WorkerPool    │  spawns + polls, single thread
//!   └────────┬────────┘
//!            │
//!    ┌───────┼───────────┐
//!    │       │           │
//! ┌──▼───┐ ┌─▼────┐  ┌───▼──┐
//! │Worker│ │Worker│  │Worker│   `genabc worker`, one group each,
//! │  0   │ │  1   │  │  N   │   params as one JSON line on stdin
//! └──────┘ └──────┘  └──────┘
//!            │
//!            ▼
//!   BatchOutcome, then the batch is dropped and intermediates removed
//! ```
//!
//! - **Process isolation**: each group runs in its own process
//! - **No retries**: a failed worker fails the batch, siblings keep running
//! - **Guaranteed cleanup**: dropping a [`Batch`] deletes its artifacts

mod partition;
mod pool;
mod proc;
mod protocol;
mod registry;
mod signals;
mod spawn;
mod supervisor;
pub mod worker_main;

pub use partition::{Group, Partition, partition};
pub use pool::{DEFAULT_MAX_WORKERS, WorkerHandle, WorkerPool, WorkerPoolConfig};
pub use proc::{Proc, WorkerProcess};
pub use protocol::{CompilerCommand, InvocationMode, WorkerParams};
pub use registry::{Artifact, ArtifactRegistry};
pub use signals::TerminationReason;
pub use spawn::{Launcher, WorkerLauncher};
pub use supervisor::{Batch, BatchOutcome, BatchSupervisor};
pub use worker_main::run_worker_main;
