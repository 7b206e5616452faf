use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for worker entry points.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("unsupported task plugin '{0}'")]
    UnsupportedTask(String),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("invoke error: {0}")]
    Invoke(#[from] InvokeError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Startup population failures. All of these are fatal: the worker must not
/// run against a partially populated registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("task plugin '{id}' has an empty {field}")]
    EmptyTaskField { id: String, field: &'static str },
    #[error("command plugin '{area}.{event}' has an empty {field}")]
    EmptyCommandField {
        area: String,
        event: String,
        field: &'static str,
    },
    #[error("resolve failed for '{reference}': {source}")]
    Resolve {
        reference: String,
        #[source]
        source: ResolveError,
    },
}

/// Failures turning a type reference into a plugin descriptor.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("unknown type reference '{0}'")]
    UnknownType(String),
    #[error("support module '{name}' not found in {}", dir.display())]
    ModuleMissing { name: String, dir: PathBuf },
}

/// Failures of a single helper invocation, including the per-mode outcome
/// classification.
///
/// Task mode treats any non-zero exit code as [`InvokeError::ProcessFault`]
/// regardless of output content. Command mode classifies on both the exit
/// code and the buffered error stream: [`InvokeError::CommandFault`] for a
/// non-zero exit, [`InvokeError::LogicalFailure`] for a zero exit with a
/// non-empty error stream.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("helper executable not found: {}", .0.display())]
    HelperMissing(PathBuf),
    #[error("working directory does not exist: {}", .0.display())]
    WorkDirMissing(PathBuf),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("serialize context failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("helper exited with code {exit_code}: {program} {args:?}")]
    ProcessFault {
        exit_code: i32,
        program: String,
        args: Vec<String>,
    },
    #[error("command helper exited with code {exit_code}: {detail}")]
    CommandFault { exit_code: i32, detail: String },
    #[error("command reported failure: {detail}")]
    LogicalFailure { detail: String },
    #[error("invocation cancelled")]
    Cancelled,
    #[error("background command failed: {0}")]
    Background(String),
}

/// Failures raised at dispatch time, before any background work starts.
/// Errors inside the background invocation surface when the ledger entry is
/// joined, not here.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unsupported command: {area}.{event}")]
    UnsupportedCommand { area: String, event: String },
    #[error("serialize context failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
