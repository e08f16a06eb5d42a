//! Preview server supervision - spawning, readiness polling and teardown
//!
//! The preview server is started in its own process group so that stopping
//! it also reaches the processes it spawns (package-manager wrappers fork the
//! real dev server). Readiness is a port probe: once something is bound to
//! the configured port the server is considered up.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// How often a terminating server is checked for exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Configuration for spawning the preview server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Program to execute
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Host the server binds and the probe checks
    pub host: String,

    /// Port the server listens on
    pub port: u16,

    /// Delay between readiness probes
    pub poll_interval_ms: u64,

    /// Number of readiness probes before giving up
    pub max_attempts: u32,

    /// Time between SIGTERM and SIGKILL on shutdown
    pub shutdown_grace_ms: u64,

    /// Working directory for the server (the project root)
    #[serde(skip)]
    pub working_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            args: vec![
                "run".to_string(),
                "storybook".to_string(),
                "--".to_string(),
                "--ci".to_string(),
                "--port".to_string(),
                "6006".to_string(),
            ],
            host: "127.0.0.1".to_string(),
            port: 6006,
            poll_interval_ms: 1000,
            max_attempts: 30,
            shutdown_grace_ms: 500,
            working_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Change the port, keeping a `--port <n>` argument in step with it
    pub fn set_port(&mut self, port: u16) {
        if let Some(idx) = self.args.iter().position(|a| a == "--port") {
            if let Some(value) = self.args.get_mut(idx + 1) {
                *value = port.to_string();
            }
        }
        self.port = port;
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Liveness probe for a local port
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Returns true if something is already bound to `host:port`
    async fn is_bound(&self, host: &str, port: u16) -> bool;
}

/// Probe that tries to bind the port itself; `AddrInUse` means it is taken.
#[derive(Debug, Default, Clone, Copy)]
pub struct BindProbe;

#[async_trait]
impl PortProbe for BindProbe {
    async fn is_bound(&self, host: &str, port: u16) -> bool {
        match std::net::TcpListener::bind((host, port)) {
            Ok(_listener) => false,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => true,
            Err(e) => {
                debug!("Port probe on {}:{} failed: {}", host, port, e);
                false
            }
        }
    }
}

/// Handle to a spawned preview-server process
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    process_id: u32,
}

impl ServerHandle {
    fn spawn(config: &ServerConfig) -> E2eResult<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .env("BROWSER", "none")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", config.program, e))
        })?;
        let process_id = child.id();

        Ok(Self { child, process_id })
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Whether the process has not exited yet
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the process group to exit. Returns false if the signal could not
    /// be delivered, in which case there is nothing to wait for.
    fn request_exit(&self) -> bool {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(self.process_id as i32), Signal::SIGTERM) {
                Ok(()) => true,
                Err(e) => {
                    debug!("SIGTERM to process group {} failed: {}", self.process_id, e);
                    false
                }
            }
        }

        #[cfg(not(unix))]
        false
    }

    /// Kill whatever survived the grace period, including grandchildren, and reap
    fn kill_and_reap(mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Err(e) = killpg(Pid::from_raw(self.process_id as i32), Signal::SIGKILL) {
                debug!("SIGKILL to process group {} failed: {}", self.process_id, e);
            }
        }

        if let Err(e) = self.child.kill() {
            debug!("Kill of preview server {} failed: {}", self.process_id, e);
        }
        if let Err(e) = self.child.wait() {
            warn!("Failed to reap preview server {}: {}", self.process_id, e);
        }
    }

    /// Terminate the process and its group, yielding to the runtime during
    /// the grace period. Failures are logged, never returned.
    async fn terminate(mut self, grace: Duration) {
        if self.request_exit() {
            let deadline = Instant::now() + grace;
            while Instant::now() < deadline && self.is_running() {
                sleep(EXIT_POLL_INTERVAL).await;
            }
        }
        self.kill_and_reap();
    }

    /// Blocking variant for `Drop`. Blocks the calling thread for at most
    /// `grace` plus the time to reap a SIGKILLed process.
    fn terminate_blocking(mut self, grace: Duration) {
        if self.request_exit() {
            let deadline = Instant::now() + grace;
            while Instant::now() < deadline && self.is_running() {
                std::thread::sleep(EXIT_POLL_INTERVAL);
            }
        }
        self.kill_and_reap();
    }
}

/// Supervisor for the single preview server of a validation run.
///
/// `start` and `stop` are idempotent: a second `start` while a server is
/// tracked does nothing, and `stop` without a tracked server does nothing.
pub struct PreviewServer {
    config: ServerConfig,
    probe: Arc<dyn PortProbe>,
    handle: Mutex<Option<ServerHandle>>,
}

impl PreviewServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_probe(config, Arc::new(BindProbe))
    }

    pub fn with_probe(config: ServerConfig, probe: Arc<dyn PortProbe>) -> Self {
        Self {
            config,
            probe,
            handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_mut()
            .map(|handle| handle.is_running())
            .unwrap_or(false)
    }

    pub fn process_id(&self) -> Option<u32> {
        self.handle.lock().as_ref().map(ServerHandle::process_id)
    }

    /// Spawn the server and wait until its port is bound
    pub async fn start(&self) -> E2eResult<()> {
        if self.handle.lock().is_some() {
            debug!("Preview server already running");
            return Ok(());
        }

        let host = self.config.host.as_str();
        let port = self.config.port;

        if self.probe.is_bound(host, port).await {
            warn!("Port {} is already in use before the preview server started", port);
        }

        info!(
            "Spawning preview server: {} {}",
            self.config.program,
            self.config.args.join(" ")
        );
        {
            let mut slot = self.handle.lock();
            if slot.is_some() {
                return Ok(());
            }
            *slot = Some(ServerHandle::spawn(&self.config)?);
        }

        let attempts = self.config.max_attempts;
        for attempt in 1..=attempts {
            if self.probe.is_bound(host, port).await {
                info!(
                    "Preview server is ready at {} (attempt {}/{})",
                    self.base_url(),
                    attempt,
                    attempts
                );
                return Ok(());
            }

            if !self.is_running() {
                return Err(E2eError::ServerStartup(format!(
                    "{} exited before binding port {}",
                    self.config.program, port
                )));
            }

            if attempt == 1 {
                info!("Waiting for preview server on port {}...", port);
            }
            if attempt < attempts {
                sleep(self.config.poll_interval()).await;
            }
        }

        Err(E2eError::StartupTimeout { port, attempts })
    }

    /// Stop the tracked server, if any, without blocking the runtime.
    /// Always clears the handle.
    pub async fn shutdown(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            info!("Stopping preview server (pid: {})", handle.process_id());
            handle.terminate(self.config.shutdown_grace()).await;
        }
    }

    /// Blocking counterpart of [`PreviewServer::shutdown`] for drop paths and
    /// signal handlers. Always clears the handle.
    pub fn stop(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            info!("Stopping preview server (pid: {})", handle.process_id());
            handle.terminate_blocking(self.config.shutdown_grace());
        }
    }

    /// Scoped access to the server: the lease stops it when dropped
    pub fn lease(&self) -> ServerLease<'_> {
        ServerLease { server: self }
    }
}

impl Drop for PreviewServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Guard that stops the preview server when it goes out of scope,
/// including on early return, error or cancellation of the owning future.
pub struct ServerLease<'a> {
    server: &'a PreviewServer,
}

impl ServerLease<'_> {
    pub async fn start(&self) -> E2eResult<()> {
        self.server.start().await
    }

    pub fn base_url(&self) -> String {
        self.server.base_url()
    }

    /// End the lease, stopping the server without blocking the runtime
    pub async fn release(self) {
        self.server.shutdown().await;
    }
}

impl Drop for ServerLease<'_> {
    fn drop(&mut self) {
        self.server.stop();
    }
}
