//! Command dispatch and the per-job async-command ledger.
//!
//! Task plugins report back through command markers embedded in their log
//! stream: `##cue[area.event k=v;k2=v2]data`. When the worker sees a marker
//! it looks up the command plugin, snapshots the job state into a
//! command-mode context, and launches the helper invocation in the
//! background. Every dispatch appends exactly one [`AsyncCommandHandle`] to
//! the job's ledger; [`JobContext::finish`] consumes the job and joins them
//! all, so a job cannot complete with command work still in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::context::{CommandContext, Endpoint};
use crate::error::{DispatchError, InvokeError};
use crate::registry::PluginRegistry;
use crate::runner::{invoke, HelperConfig, HelperSpawner, InvokeMode, InvokeOutcome, InvokeRequest, LineTap};

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r"##cue\[([A-Za-z0-9]+)\.([A-Za-z0-9]+)(?:[ \t]+([^\]]*))?\](.*)")
            .expect("marker regex")
    })
}

/// A command marker lifted out of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMarker {
    pub area: String,
    pub event: String,
    pub properties: HashMap<String, String>,
    pub data: String,
}

impl CommandMarker {
    /// Extracts a marker from a log line, unescaping property values and
    /// data. Returns `None` when the line carries no marker.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = marker_re().captures(line)?;
        let mut properties = HashMap::new();
        if let Some(props) = caps.get(3) {
            for pair in props.as_str().split(';') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                if let Some((k, v)) = pair.split_once('=') {
                    properties.insert(k.trim().to_string(), unescape(v));
                }
            }
        }
        Some(Self {
            area: caps[1].to_string(),
            event: caps[2].to_string(),
            properties,
            data: unescape(&caps[4]),
        })
    }
}

/// Reverses the marker escaping applied by plugins: `;` `]` `\r` `\n` travel
/// percent-encoded inside property values and data.
fn unescape(s: &str) -> String {
    s.replace("%3B", ";")
        .replace("%5D", "]")
        .replace("%0D", "\r")
        .replace("%0A", "\n")
}

/// One in-flight (or finished) background command invocation.
pub struct AsyncCommandHandle {
    display_name: String,
    task: JoinHandle<Result<InvokeOutcome, InvokeError>>,
}

impl AsyncCommandHandle {
    pub fn new(
        display_name: impl Into<String>,
        task: JoinHandle<Result<InvokeOutcome, InvokeError>>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            task,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Waits for the background invocation. Errors raised inside it surface
    /// here, not at dispatch time.
    pub async fn join(self) -> (String, Result<InvokeOutcome, InvokeError>) {
        let result = match self.task.await {
            Ok(res) => res,
            Err(e) => Err(InvokeError::Background(e.to_string())),
        };
        (self.display_name, result)
    }
}

/// Append-only collection of the job's background command work.
#[derive(Default)]
pub struct AsyncCommandLedger {
    handles: Vec<AsyncCommandHandle>,
}

impl AsyncCommandLedger {
    pub fn push(&mut self, handle: AsyncCommandHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Joins every entry, in dispatch order. Consumes the ledger: there is
    /// no way to finish a job without draining it.
    pub async fn join_all(self) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let (display_name, result) = handle.join().await;
            outcomes.push(CommandOutcome {
                display_name,
                result,
            });
        }
        outcomes
    }
}

/// Joined result of one dispatched command.
pub struct CommandOutcome {
    pub display_name: String,
    pub result: Result<InvokeOutcome, InvokeError>,
}

/// Per-job state the dispatcher reads: endpoints, variables, and the ledger.
pub struct JobContext {
    pub endpoints: Vec<Endpoint>,
    variables: HashMap<String, String>,
    ledger: AsyncCommandLedger,
}

impl JobContext {
    pub fn new(endpoints: Vec<Endpoint>, variables: HashMap<String, String>) -> Self {
        Self {
            endpoints,
            variables,
            ledger: AsyncCommandLedger::default(),
        }
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Mutates a job variable. Contexts already dispatched keep the values
    /// they snapshotted.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn pending_commands(&self) -> usize {
        self.ledger.len()
    }

    fn register(&mut self, handle: AsyncCommandHandle) {
        self.ledger.push(handle);
    }

    /// Completes the job: consumes it and joins every ledger entry. This is
    /// the only way out, so "all background command work completes before
    /// job completion" holds by construction.
    pub async fn finish(self) -> JobReport {
        JobReport {
            commands: self.ledger.join_all().await,
        }
    }
}

/// Per-command outcomes of a finished job.
pub struct JobReport {
    pub commands: Vec<CommandOutcome>,
}

impl JobReport {
    pub fn success(&self) -> bool {
        self.commands.iter().all(|c| c.result.is_ok())
    }
}

/// Looks up command plugins and launches their invocations in the
/// background.
pub struct CommandDispatcher {
    registry: Arc<PluginRegistry>,
    helper: Arc<HelperConfig>,
    spawner: Arc<dyn HelperSpawner>,
    cancel: Option<watch::Receiver<bool>>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<PluginRegistry>,
        helper: Arc<HelperConfig>,
        spawner: Arc<dyn HelperSpawner>,
    ) -> Self {
        Self {
            registry,
            helper,
            spawner,
            cancel: None,
        }
    }

    /// Propagate this cancel signal into every dispatched invocation.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Dispatches one command marker: registry lookup, context snapshot,
    /// background launch, ledger registration. Returns as soon as the handle
    /// is registered; the invocation's own errors surface on join.
    pub fn dispatch(
        &self,
        job: &mut JobContext,
        marker: CommandMarker,
        observer: mpsc::UnboundedSender<LineTap>,
    ) -> Result<(), DispatchError> {
        let entry = self
            .registry
            .lookup_command_plugin(&marker.area, &marker.event)
            .ok_or_else(|| DispatchError::UnsupportedCommand {
                area: marker.area.clone(),
                event: marker.event.clone(),
            })?;

        // Variables are copied by value here: later job mutation must not
        // retroactively change an already-dispatched context.
        let ctx = CommandContext {
            data: marker.data,
            properties: marker.properties,
            endpoints: job.endpoints.clone(),
            variables: job.variables.clone(),
        };
        let document = ctx.to_document()?;

        let display_name = entry.display_name.clone();
        let type_reference = entry.type_reference.clone();
        tracing::info!(
            command = %format!("{}.{}", marker.area, marker.event),
            display_name = %display_name,
            "dispatching command plugin"
        );

        let helper = Arc::clone(&self.helper);
        let spawner = Arc::clone(&self.spawner);
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            invoke(
                &helper,
                spawner.as_ref(),
                InvokeRequest {
                    mode: InvokeMode::Command,
                    type_reference,
                    document,
                    environment: HashMap::new(),
                    observer,
                    cancel,
                },
            )
            .await
        });

        job.register(AsyncCommandHandle::new(display_name, task));
        Ok(())
    }
}
