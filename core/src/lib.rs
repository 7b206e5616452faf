//! Plugin execution core for the stagehand pipeline worker.
//!
//! A pipeline job is a sequence of steps, each delegated to an out-of-process
//! plugin hosted by a single helper executable. This crate owns the machinery
//! around that delegation:
//!
//! - [`registry`] — the static catalog of known task and command plugins,
//!   populated once at worker startup and read-only afterwards.
//! - [`resolver`] — the compile-time factory table that turns a type
//!   reference string into a plugin descriptor, with support-module lookup
//!   confined to an explicit [`resolver::ResolveContext`].
//! - [`runner`] — the process execution bridge: spawns the helper, feeds it
//!   the serialized execution context on stdin, streams its output line by
//!   line, and classifies the outcome per invocation mode.
//! - [`dispatch`] — the command dispatcher: reacts to `##cue[...]` markers
//!   embedded in the log stream, launches command plugins in the background,
//!   and tracks them in the job's async-command ledger.
//!
//! Registry population is strictly single-threaded and completes before any
//! invocation; afterwards the registry is shared behind an `Arc`. Every
//! dispatched command produces exactly one ledger entry, and
//! [`dispatch::JobContext::finish`] consumes the job to force the join.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod runner;

pub use config::WorkerConfig;
pub use context::{CommandContext, Endpoint, Repository, TaskContext};
pub use dispatch::{
    AsyncCommandHandle, AsyncCommandLedger, CommandDispatcher, CommandMarker, CommandOutcome,
    JobContext, JobReport,
};
pub use error::{DispatchError, InvokeError, RegistryError, ResolveError, WorkerError};
pub use registry::{
    CommandPluginDescriptor, CommandPluginEntry, PluginRegistry, TaskPluginDescriptor,
};
pub use resolver::{populate, CatalogEntry, PluginSpec, ResolveContext};
pub use runner::{
    invoke, HelperConfig, HelperSession, HelperSpawner, InvokeMode, InvokeOutcome, InvokeRequest,
    LineStream, LineTap, ProcessSpawner, SpawnArgs,
};
