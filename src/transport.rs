//! Subprocess transport: owns the Agent CLI child process and frames its
//! stdio as newline-delimited JSON.
//!
//! The transport is deliberately dumb: it knows nothing about control
//! requests, hooks, or messages. It exposes byte-oriented writes and a
//! stream of decoded [`Message`](crate::message::Message)s (or raw JSON
//! lines, depending on the caller) plus lifecycle operations
//! (`connect`/`end_input`/`close`). Everything above this layer is built on
//! those four operations, matching the split the control module assumes.
//!
//! All state lives behind `tokio::sync::Mutex` so `connect`/`close`/`lines`
//! take `&self` — the whole transport can be wrapped in one `Arc` as soon as
//! it's constructed, with no separate "owned, then shared" phase.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};

/// How long `close()` waits for the child to exit on its own (after
/// `end_input`) before resorting to `start_kill()`.
const GRACEFUL_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Locates the Agent CLI executable.
///
/// The default implementation checks an explicit path first, then searches
/// `PATH` for a handful of well-known binary names.
pub trait ExecutableResolver: Send + Sync {
    fn resolve(&self, explicit_path: Option<&str>) -> Result<PathBuf>;
}

/// Default resolver: explicit path, then `PATH` search for `claude`/`agent`.
#[derive(Debug, Default)]
pub struct DefaultExecutableResolver;

impl ExecutableResolver for DefaultExecutableResolver {
    fn resolve(&self, explicit_path: Option<&str>) -> Result<PathBuf> {
        if let Some(path) = explicit_path {
            let candidate = PathBuf::from(path);
            if candidate.is_file() {
                return Ok(candidate);
            }
            return Err(Error::executable_not_found(path));
        }

        for name in ["claude", "claude-agent", "agent"] {
            if let Some(found) = find_on_path(name) {
                return Ok(found);
            }
        }

        Err(Error::executable_not_found(
            "no Agent CLI executable found on PATH; set an explicit path",
        ))
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        candidate.is_file().then_some(candidate)
    })
}

/// Spawns the resolved executable with a rendered argv.
///
/// Split out from [`Transport`] so tests can substitute a fake launcher
/// without spawning a real process.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, executable: &PathBuf, args: &[String], cwd: Option<&str>) -> Result<Child>;
}

/// Default launcher: thin wrapper over [`tokio::process::Command`].
#[derive(Debug, Default)]
pub struct DefaultProcessLauncher;

impl ProcessLauncher for DefaultProcessLauncher {
    fn launch(&self, executable: &PathBuf, args: &[String], cwd: Option<&str>) -> Result<Child> {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("CLAUDE_CODE_ENTRYPOINT", "sdk-rust");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
            cmd.env("PWD", dir);
        }
        cmd.spawn().map_err(Error::SpawnFailed)
    }
}

/// Byte-oriented transport to the Agent CLI's stdio.
///
/// Implementors must serialize concurrent writers: writes to the child's
/// stdin must not interleave. [`SubprocessTransport`] does this with an
/// internal `Mutex<ChildStdin>`; a mock used in tests typically just pushes
/// into a `Vec` behind its own mutex.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve, launch, and begin reading from the child process.
    async fn connect(&self) -> Result<()>;

    /// Write one already-framed line (including its trailing `\n`) to stdin.
    async fn write_line(&self, line: &str) -> Result<()>;

    /// Takes the receiver side of the inbound line stream. Returns an error
    /// if called more than once — there is exactly one reader per transport.
    async fn lines(&self) -> Result<mpsc::Receiver<Result<String>>>;

    /// Close stdin without killing the process (lets the CLI finish the
    /// current turn and emit its final `result` message). Idempotent.
    async fn end_input(&self) -> Result<()>;

    /// End input, wait briefly for the child to exit on its own, then
    /// force-kill if it hasn't. Idempotent. Returns whether the child had to
    /// be force-killed.
    async fn close(&self) -> Result<bool>;

    /// Whether the transport is connected and writable.
    fn is_ready(&self) -> bool;
}

/// Default [`Transport`] impl: a real Agent CLI subprocess.
pub struct SubprocessTransport {
    resolver: Arc<dyn ExecutableResolver>,
    launcher: Arc<dyn ProcessLauncher>,
    executable_path: Option<String>,
    args: Vec<String>,
    cwd: Option<String>,
    child: Arc<Mutex<Option<Child>>>,
    stdin: Mutex<Option<ChildStdin>>,
    lines_rx: Mutex<Option<mpsc::Receiver<Result<String>>>>,
    ready: AtomicBool,
}

impl SubprocessTransport {
    pub fn new(args: Vec<String>) -> Self {
        SubprocessTransport {
            resolver: Arc::new(DefaultExecutableResolver),
            launcher: Arc::new(DefaultProcessLauncher),
            executable_path: None,
            args,
            cwd: None,
            child: Arc::new(Mutex::new(None)),
            stdin: Mutex::new(None),
            lines_rx: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn with_executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ExecutableResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }
}

#[async_trait]
impl Transport for SubprocessTransport {
    async fn connect(&self) -> Result<()> {
        let executable = self.resolver.resolve(self.executable_path.as_deref())?;
        let mut child = self
            .launcher
            .launch(&executable, &self.args, self.cwd.as_deref())?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::other("child process has no stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::other("child process has no stdout handle"))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(1024);
        let child_handle = self.child.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if tx.send(Ok(line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // Stdout EOF: the child has exited (or is exiting). A
                        // zero exit is a clean end-of-sequence; a nonzero one
                        // surfaces as PeerExited on the next read.
                        if let Some(child) = child_handle.lock().await.as_mut() {
                            if let Ok(status) = child.wait().await {
                                if !status.success() {
                                    let _ = tx.send(Err(Error::peer_exited(status.code()))).await;
                                }
                            }
                        }
                        break;
                    }
                    Err(_) => {
                        // Treat a broken read the same as EOF: surface the
                        // child's exit status if it has one to give.
                        if let Some(child) = child_handle.lock().await.as_mut() {
                            if let Ok(status) = child.wait().await {
                                if !status.success() {
                                    let _ = tx.send(Err(Error::peer_exited(status.code()))).await;
                                }
                            }
                        }
                        break;
                    }
                }
            }
        });

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    log::debug!("agent stderr: {line}");
                }
            });
        }

        *self.stdin.lock().await = Some(stdin);
        *self.lines_rx.lock().await = Some(rx);
        *self.child.lock().await = Some(child);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(Error::not_writable("transport is not connected or closed"));
        }
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| Error::not_writable("transport not connected"))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::not_writable(e.to_string()))?;
        if !line.ends_with('\n') {
            stdin
                .write_all(b"\n")
                .await
                .map_err(|e| Error::not_writable(e.to_string()))?;
        }
        stdin
            .flush()
            .await
            .map_err(|e| Error::not_writable(e.to_string()))?;
        Ok(())
    }

    async fn lines(&self) -> Result<mpsc::Receiver<Result<String>>> {
        self.lines_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::protocol_violation("Transport::lines() called more than once"))
    }

    async fn end_input(&self) -> Result<()> {
        let mut guard = self.stdin.lock().await;
        if let Some(stdin) = guard.as_mut() {
            stdin
                .shutdown()
                .await
                .map_err(|e| Error::not_writable(e.to_string()))?;
        }
        *guard = None;
        Ok(())
    }

    async fn close(&self) -> Result<bool> {
        self.ready.store(false, Ordering::SeqCst);
        *self.stdin.lock().await = None;

        let mut guard = self.child.lock().await;
        let Some(child) = guard.as_mut() else {
            return Ok(false);
        };

        match tokio::time::timeout(GRACEFUL_CLOSE_GRACE, child.wait()).await {
            Ok(_) => {
                *guard = None;
                Ok(false)
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                *guard = None;
                Ok(true)
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_errors_on_missing_explicit_path() {
        let resolver = DefaultExecutableResolver;
        let err = resolver.resolve(Some("/no/such/binary")).unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
    }

    #[test]
    fn resolver_accepts_existing_explicit_path() {
        let resolver = DefaultExecutableResolver;
        let resolved = resolver.resolve(Some("/bin/sh")).unwrap();
        assert_eq!(resolved, PathBuf::from("/bin/sh"));
    }

    #[tokio::test]
    async fn write_line_before_connect_is_not_writable() {
        let transport = SubprocessTransport::new(vec![]);
        let err = transport.write_line("{}").await.unwrap_err();
        assert!(matches!(err, Error::NotWritable(_)));
    }

    #[tokio::test]
    async fn close_before_connect_is_idempotent() {
        let transport = SubprocessTransport::new(vec![]);
        assert!(!transport.close().await.unwrap());
        assert!(!transport.close().await.unwrap());
    }

    #[tokio::test]
    async fn end_input_before_connect_is_idempotent() {
        let transport = SubprocessTransport::new(vec![]);
        transport.end_input().await.unwrap();
        transport.end_input().await.unwrap();
    }
}
