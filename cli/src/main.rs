use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use stagehand_core::{InvokeError, WorkerError};

mod app;
mod cli;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, WorkerError> {
    let args = cli::Args::parse();
    let cfg =
        stagehand_core::config::load_default().map_err(|e| WorkerError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(WorkerError::Config)?;

    match args.command {
        cli::Commands::Run(run_args) => app::run_task(run_args, &cfg).await,
    }
}

fn exit_code_for_error(e: &WorkerError) -> i32 {
    // 0: success
    // 11: config / registry population error
    // 20: helper start or IO error
    // 30: unsupported plugin or reported command failure
    // 50: internal/uncategorized
    // 130: cancelled
    match e {
        WorkerError::Config(_) => 11,
        WorkerError::Registry(_) => 11,
        WorkerError::UnsupportedTask(_) => 30,
        WorkerError::Invoke(ie) => match ie {
            InvokeError::HelperMissing(_)
            | InvokeError::WorkDirMissing(_)
            | InvokeError::Spawn(_)
            | InvokeError::Serialize(_)
            | InvokeError::StreamIo { .. } => 20,
            InvokeError::ProcessFault { .. } | InvokeError::CommandFault { .. } => 20,
            InvokeError::LogicalFailure { .. } => 30,
            InvokeError::Cancelled => 130,
            InvokeError::Background(_) => 50,
        },
        WorkerError::Dispatch(de) => match de {
            stagehand_core::DispatchError::UnsupportedCommand { .. } => 30,
            stagehand_core::DispatchError::Serialize(_) => 50,
        },
        WorkerError::Io(_) => 20,
        WorkerError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &stagehand_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("stagehand"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("stagehand.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
