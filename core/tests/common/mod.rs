//! Shared test doubles: a scripted helper session and its spawner.

use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use stagehand_core::{HelperConfig, HelperSession, HelperSpawner, InvokeError, SpawnArgs};

/// Captures everything written to the fake session's stdin.
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

struct ScriptedSession {
    stdin: Option<SharedBuf>,
    stdout: Option<Cursor<Vec<u8>>>,
    stderr: Option<Cursor<Vec<u8>>>,
    exit_code: i32,
    wait_forever: bool,
}

#[async_trait]
impl HelperSession for ScriptedSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn wait(&mut self) -> Result<i32, InvokeError> {
        if self.wait_forever {
            std::future::pending::<()>().await;
        }
        // Give the pumps a moment, like a real child that exits after its
        // streams close.
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.exit_code)
    }
}

/// Spawner returning scripted sessions and recording every spawn.
pub struct FakeSpawner {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: i32,
    wait_forever: bool,
    pub spawn_count: Arc<AtomicUsize>,
    pub spawn_args: Arc<Mutex<Vec<SpawnArgs>>>,
    pub stdin_docs: Arc<Mutex<Vec<Arc<Mutex<Vec<u8>>>>>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
            wait_forever: false,
            spawn_count: Arc::new(AtomicUsize::new(0)),
            spawn_args: Arc::new(Mutex::new(Vec::new())),
            stdin_docs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = bytes.to_vec();
        self
    }

    pub fn with_stderr(mut self, bytes: &[u8]) -> Self {
        self.stderr = bytes.to_vec();
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn waiting_forever(mut self) -> Self {
        self.wait_forever = true;
        self
    }

    pub fn spawned(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    /// Bytes the nth spawned session received on stdin.
    pub fn stdin_doc(&self, n: usize) -> Vec<u8> {
        self.stdin_docs.lock().unwrap()[n].lock().unwrap().clone()
    }
}

#[async_trait]
impl HelperSpawner for FakeSpawner {
    async fn spawn(&self, args: &SpawnArgs) -> Result<Box<dyn HelperSession>, InvokeError> {
        self.spawn_count.fetch_add(1, Ordering::SeqCst);
        self.spawn_args.lock().unwrap().push(args.clone());

        let stdin_buf = Arc::new(Mutex::new(Vec::new()));
        self.stdin_docs.lock().unwrap().push(Arc::clone(&stdin_buf));

        Ok(Box::new(ScriptedSession {
            stdin: Some(SharedBuf(stdin_buf)),
            stdout: Some(Cursor::new(self.stdout.clone())),
            stderr: Some(Cursor::new(self.stderr.clone())),
            exit_code: self.exit_code,
            wait_forever: self.wait_forever,
        }))
    }
}

/// Temp layout with a touched helper executable and a work directory.
pub struct HelperFixture {
    pub cfg: HelperConfig,
    _dir: tempfile::TempDir,
}

pub fn helper_fixture() -> HelperFixture {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    let work = dir.path().join("work");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::create_dir_all(&work).unwrap();
    std::fs::write(
        bin.join(format!("stagehand-host{}", std::env::consts::EXE_SUFFIX)),
        b"",
    )
    .unwrap();

    HelperFixture {
        cfg: HelperConfig::new(bin, "stagehand-host", work),
        _dir: dir,
    }
}
