use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

use crate::error::InvokeError;

use super::io_pump::{pump_stderr, pump_stdout, LineStream, LineTap};
use super::session::{HelperSpawner, SpawnArgs};

/// Location of the helper executable and the invocation working directory.
#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub bin_dir: PathBuf,
    pub helper_name: String,
    pub work_dir: PathBuf,
    pub line_channel_capacity: usize,
}

impl HelperConfig {
    pub fn new(
        bin_dir: impl Into<PathBuf>,
        helper_name: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            helper_name: helper_name.into(),
            work_dir: work_dir.into(),
            line_channel_capacity: 256,
        }
    }

    /// Full path of the helper executable, with the platform suffix.
    pub fn executable(&self) -> PathBuf {
        self.bin_dir
            .join(format!("{}{}", self.helper_name, std::env::consts::EXE_SUFFIX))
    }
}

/// Invocation mode: selects the helper argument keyword and the outcome
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeMode {
    Task,
    Command,
}

impl InvokeMode {
    pub fn keyword(self) -> &'static str {
        match self {
            InvokeMode::Task => "task",
            InvokeMode::Command => "command",
        }
    }
}

/// One helper invocation.
///
/// `environment` is passed through to the child for task mode only; command
/// mode always spawns with inherited process defaults. `observer` receives
/// output lines as they arrive. `cancel` is cooperative: flipping it to
/// `true` makes the bridge stop waiting without killing the child.
pub struct InvokeRequest {
    pub mode: InvokeMode,
    pub type_reference: String,
    pub document: String,
    pub environment: HashMap<String, String>,
    pub observer: mpsc::UnboundedSender<LineTap>,
    pub cancel: Option<watch::Receiver<bool>>,
}

#[derive(Debug, Clone, Copy)]
pub struct InvokeOutcome {
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Runs the helper once and classifies the result.
///
/// Task mode requires exit code 0 unconditionally; a non-zero exit is an
/// infrastructural [`InvokeError::ProcessFault`] no matter what the helper
/// printed. Command mode buffers the error stream and classifies at the end:
/// non-zero exit is a [`InvokeError::CommandFault`] carrying the buffered
/// text, a zero exit with buffered error lines is a
/// [`InvokeError::LogicalFailure`], and a zero exit with a clean error
/// stream succeeds.
pub async fn invoke(
    cfg: &HelperConfig,
    spawner: &dyn HelperSpawner,
    req: InvokeRequest,
) -> Result<InvokeOutcome, InvokeError> {
    let exe = cfg.executable();
    if !exe.is_file() {
        return Err(InvokeError::HelperMissing(exe));
    }
    if !cfg.work_dir.is_dir() {
        return Err(InvokeError::WorkDirMissing(cfg.work_dir.clone()));
    }

    // Shell quoting around the reference collapses to a single argv token.
    let args = vec![req.mode.keyword().to_string(), req.type_reference.clone()];
    let envs = match req.mode {
        InvokeMode::Task => req.environment,
        InvokeMode::Command => HashMap::new(),
    };

    let invocation_id = uuid::Uuid::new_v4();
    tracing::debug!(
        %invocation_id,
        mode = req.mode.keyword(),
        reference = %req.type_reference,
        program = %exe.display(),
        "spawning helper"
    );

    let spawn_args = SpawnArgs {
        program: exe.clone(),
        args: args.clone(),
        envs,
        cwd: cfg.work_dir.clone(),
    };
    let mut session = spawner.spawn(&spawn_args).await?;

    let mut stdin = session
        .stdin()
        .ok_or_else(|| InvokeError::Spawn("no stdin".into()))?;
    let stdout = session
        .stdout()
        .ok_or_else(|| InvokeError::Spawn("no stdout".into()))?;
    let stderr = session
        .stderr()
        .ok_or_else(|| InvokeError::Spawn("no stderr".into()))?;

    // The helper reads the whole document before executing; write it and
    // close the pipe so it never waits for interactive input.
    stdin
        .write_all(req.document.as_bytes())
        .await
        .map_err(|e| InvokeError::StreamIo {
            stream: "stdin",
            source: e,
        })?;
    stdin.flush().await.map_err(|e| InvokeError::StreamIo {
        stream: "stdin",
        source: e,
    })?;
    drop(stdin);

    let (line_tx, mut line_rx) = mpsc::channel::<LineTap>(cfg.line_channel_capacity);
    let out_task = pump_stdout(stdout, line_tx.clone());
    let err_task = pump_stderr(stderr, line_tx);

    let started = Instant::now();
    let mut err_lines: Vec<String> = Vec::new();
    let mut cancel = req.cancel;

    let exit_code = {
        let wait_fut = session.wait();
        tokio::pin!(wait_fut);
        let mut lines_open = true;

        loop {
            tokio::select! {
                res = &mut wait_fut => break res?,

                tap = line_rx.recv(), if lines_open => match tap {
                    Some(tap) => handle_tap(req.mode, tap, &req.observer, &mut err_lines),
                    None => lines_open = false,
                },

                _ = cancelled(&mut cancel) => {
                    // Cooperative: the helper shuts itself down; we only stop
                    // waiting and hand cancellation up.
                    tracing::warn!(%invocation_id, "invocation cancelled, detaching from helper");
                    return Err(InvokeError::Cancelled);
                }
            }
        }
    };

    // The pumps flush their final lines after the process exits; drain them
    // before classifying.
    while let Some(tap) = line_rx.recv().await {
        handle_tap(req.mode, tap, &req.observer, &mut err_lines);
    }
    let _ = out_task.await;
    let _ = err_task.await;

    let duration_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(%invocation_id, exit_code, duration_ms, "helper exited");

    match req.mode {
        InvokeMode::Task => {
            if exit_code != 0 {
                return Err(InvokeError::ProcessFault {
                    exit_code,
                    program: exe.to_string_lossy().to_string(),
                    args,
                });
            }
        }
        InvokeMode::Command => {
            if exit_code != 0 {
                // Surface the buffered error text to the observer before
                // failing, so the log shows why.
                for line in &err_lines {
                    let _ = req.observer.send(LineTap {
                        line: line.clone(),
                        stream: LineStream::Stderr,
                    });
                }
                return Err(InvokeError::CommandFault {
                    exit_code,
                    detail: err_lines.join("\n"),
                });
            }
            if !err_lines.is_empty() {
                return Err(InvokeError::LogicalFailure {
                    detail: err_lines.join("\n"),
                });
            }
        }
    }

    Ok(InvokeOutcome {
        exit_code,
        duration_ms,
    })
}

fn handle_tap(
    mode: InvokeMode,
    tap: LineTap,
    observer: &mpsc::UnboundedSender<LineTap>,
    err_lines: &mut Vec<String>,
) {
    match (mode, tap.stream) {
        // Command mode holds the error stream back for end-of-invocation
        // classification.
        (InvokeMode::Command, LineStream::Stderr) => err_lines.push(tap.line),
        _ => {
            let _ = observer.send(tap);
        }
    }
}

/// Resolves when the cancel signal flips to `true`; pends forever when no
/// signal was supplied or the sender went away.
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            if *rx.borrow() {
                return;
            }
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            std::future::pending().await
        }
        None => std::future::pending().await,
    }
}
