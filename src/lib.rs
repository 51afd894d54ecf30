//! genabc - load-balanced compilation of bundled scripts to bytecode.
//!
//! The emit stage writes intermediate `*.temp.js` files and registers them on
//! a [`dispatch::Batch`]. A [`dispatch::BatchSupervisor`] partitions the batch
//! into size-balanced groups, compiles each group in its own worker process
//! and deletes the intermediates once every worker has terminated.

pub mod context;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod logging;
pub mod paths;
