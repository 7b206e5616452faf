use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

use crate::error::InvokeError;

/// Fully resolved spawn parameters for one helper invocation.
#[derive(Debug, Clone)]
pub struct SpawnArgs {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: HashMap<String, String>,
    pub cwd: PathBuf,
}

/// A live helper process. Stream accessors may be taken once each; `wait`
/// resolves to the exit code.
#[async_trait]
pub trait HelperSession: Send {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>>;
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    async fn wait(&mut self) -> Result<i32, InvokeError>;
}

/// Spawns helper sessions. The production implementation is
/// [`ProcessSpawner`]; tests inject doubles backed by in-memory pipes.
#[async_trait]
pub trait HelperSpawner: Send + Sync {
    async fn spawn(&self, args: &SpawnArgs) -> Result<Box<dyn HelperSession>, InvokeError>;
}

/// Spawns the helper as a real child process with all three stdio pipes.
pub struct ProcessSpawner;

#[async_trait]
impl HelperSpawner for ProcessSpawner {
    async fn spawn(&self, args: &SpawnArgs) -> Result<Box<dyn HelperSession>, InvokeError> {
        let child = Command::new(&args.program)
            .args(&args.args)
            .envs(&args.envs)
            .current_dir(&args.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| InvokeError::Spawn(e.to_string()))?;

        Ok(Box::new(ProcessSession { child }))
    }
}

struct ProcessSession {
    child: Child,
}

#[async_trait]
impl HelperSession for ProcessSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn wait(&mut self) -> Result<i32, InvokeError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| InvokeError::Spawn(e.to_string()))?;
        Ok(status.code().unwrap_or(-1))
    }
}
