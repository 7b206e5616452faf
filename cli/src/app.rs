//! One-shot job harness: run a task plugin, dispatch the commands it emits,
//! and join the ledger before reporting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use stagehand_core::{
    invoke, CommandDispatcher, CommandMarker, DispatchError, HelperConfig, HelperSpawner,
    InvokeError, InvokeMode, InvokeOutcome, InvokeRequest, JobContext, LineStream, LineTap,
    PluginRegistry, ProcessSpawner, ResolveContext, TaskContext, WorkerConfig, WorkerError,
};

use crate::cli::RunArgs;

pub async fn run_task(args: RunArgs, cfg: &WorkerConfig) -> Result<i32, WorkerError> {
    let helper = Arc::new(helper_config(&args, cfg)?);
    let module_dir = require_path(&cfg.paths.module_dir, "paths.module_dir")?;

    // Registry population is single-threaded and happens entirely before
    // the first invocation.
    let resolve_ctx = ResolveContext::new(module_dir);
    let mut registry = PluginRegistry::new();
    stagehand_plugins::populate_builtin(&mut registry, &resolve_ctx)?;
    let registry = Arc::new(registry);

    let reference = registry
        .lookup_task_plugins(&args.plugin)
        .and_then(|refs| refs.last().cloned())
        .ok_or_else(|| WorkerError::UnsupportedTask(args.plugin.clone()))?;
    tracing::info!(plugin = %args.plugin, reference = %reference, "selected task plugin version");

    let task_ctx = load_context(&args)?;
    let document = task_ctx
        .to_document()
        .map_err(|e| WorkerError::Invoke(InvokeError::Serialize(e)))?;
    let environment: HashMap<String, String> = std::env::vars().collect();

    let mut job = JobContext::new(task_ctx.endpoints.clone(), task_ctx.variables.clone());
    let spawner: Arc<dyn HelperSpawner> = Arc::new(ProcessSpawner);
    let dispatcher =
        CommandDispatcher::new(Arc::clone(&registry), Arc::clone(&helper), Arc::clone(&spawner));

    // Background command output is printed by its own consumer so it can
    // interleave with the task stream in real time.
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<LineTap>();
    let printer = tokio::spawn(async move {
        while let Some(tap) = cmd_rx.recv().await {
            match tap.stream {
                LineStream::Stdout => println!("[command] {}", tap.line),
                LineStream::Stderr => eprintln!("[command] {}", tap.line),
            }
        }
    });

    let (task_tx, mut task_rx) = mpsc::unbounded_channel::<LineTap>();
    let invoke_fut = invoke(
        helper.as_ref(),
        spawner.as_ref(),
        InvokeRequest {
            mode: InvokeMode::Task,
            type_reference: reference,
            document,
            environment,
            observer: task_tx,
            cancel: None,
        },
    );
    tokio::pin!(invoke_fut);

    let mut invoke_res: Option<Result<InvokeOutcome, InvokeError>> = None;
    let mut dispatch_err: Option<DispatchError> = None;

    loop {
        tokio::select! {
            res = &mut invoke_fut, if invoke_res.is_none() => {
                invoke_res = Some(res);
            }
            tap = task_rx.recv() => match tap {
                Some(tap) => {
                    print_tap(&tap);
                    if tap.stream == LineStream::Stdout {
                        if let Some(marker) = CommandMarker::parse(&tap.line) {
                            if let Err(e) = dispatcher.dispatch(&mut job, marker, cmd_tx.clone()) {
                                tracing::error!(error = %e, "command dispatch failed");
                                dispatch_err.get_or_insert(e);
                            }
                        }
                    }
                }
                // The observer closes once the invocation is done and
                // drained.
                None => break,
            }
        }
    }

    // Every ledger entry is joined before the job may report completion.
    let report = job.finish().await;
    drop(cmd_tx);
    let _ = printer.await;

    for command in &report.commands {
        match &command.result {
            Ok(outcome) => tracing::info!(
                command = %command.display_name,
                duration_ms = outcome.duration_ms,
                "command completed"
            ),
            Err(e) => eprintln!("{} failed: {e}", command.display_name),
        }
    }

    match invoke_res {
        Some(Ok(outcome)) => {
            tracing::info!(duration_ms = outcome.duration_ms, "task completed");
        }
        Some(Err(e)) => return Err(e.into()),
        None => return Err(WorkerError::Config("invocation produced no status".to_string())),
    }
    if let Some(e) = dispatch_err {
        return Err(e.into());
    }
    if report.success() {
        Ok(0)
    } else {
        Ok(30)
    }
}

fn print_tap(tap: &LineTap) {
    match tap.stream {
        LineStream::Stdout => println!("{}", tap.line),
        LineStream::Stderr => eprintln!("{}", tap.line),
    }
}

fn helper_config(args: &RunArgs, cfg: &WorkerConfig) -> Result<HelperConfig, WorkerError> {
    let bin_dir = require_path(&cfg.paths.bin_dir, "paths.bin_dir")?;
    let work_dir = match &args.work_dir {
        Some(dir) => dir.clone(),
        None => require_path(&cfg.paths.work_dir, "paths.work_dir")?.into(),
    };
    let mut helper = HelperConfig::new(bin_dir, cfg.runner.helper_name.clone(), work_dir);
    helper.line_channel_capacity = cfg.runner.line_channel_capacity;
    Ok(helper)
}

fn require_path(entry: &Option<String>, name: &str) -> Result<String, WorkerError> {
    entry
        .clone()
        .ok_or_else(|| WorkerError::Config(format!("{name} is not configured")))
}

fn load_context(args: &RunArgs) -> Result<TaskContext, WorkerError> {
    match &args.context {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|e| WorkerError::Config(format!("bad context file: {e}")))
        }
        None => Ok(TaskContext::default()),
    }
}
