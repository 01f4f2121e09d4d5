//! Sandbox provisioning and scoped lifecycle.
//!
//! A sandbox is an ephemeral backend server bound to a free loopback
//! port, exclusively owned by one pipeline invocation. The guard returned
//! by [`SandboxProvisioner::acquire`] releases the backend on every exit
//! path: explicitly via [`SandboxGuard::release`], or on drop when an
//! error propagates past the owning scope.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use backdiff_core::domain::{EvalError, Result};

/// A live backend sandbox: network port plus the administrative
/// credential required to drive deployments against it.
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Loopback port the backend listens on.
    pub port: u16,

    /// Administrative credential for deployments.
    pub admin_key: String,

    /// Backend working directory (exclusive to this sandbox).
    pub dir: PathBuf,
}

/// Scoped handle to a provisioned sandbox.
///
/// Holds the backend process (when one exists) and an optional release
/// hook for provisioners with out-of-process lifecycles. Dropping the
/// guard kills the process and fires the hook, so a crashed pipeline
/// cannot leak a backend.
pub struct SandboxGuard {
    sandbox: Sandbox,
    process: Option<Child>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl SandboxGuard {
    /// Guard owning a spawned backend process.
    pub fn with_process(sandbox: Sandbox, process: Child) -> Self {
        Self {
            sandbox,
            process: Some(process),
            on_release: None,
        }
    }

    /// Guard for an externally managed backend (fakes, remote pools).
    pub fn external(sandbox: Sandbox) -> Self {
        Self {
            sandbox,
            process: None,
            on_release: None,
        }
    }

    /// Attach a hook invoked exactly once on release or drop.
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// The live sandbox behind this guard.
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Tear the sandbox down and wait for the backend to exit.
    pub async fn release(mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.kill().await {
                warn!(port = self.sandbox.port, "failed to kill backend: {e}");
            }
            let _ = child.wait().await;
            debug!(port = self.sandbox.port, "sandbox released");
        }
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        // The child was spawned with kill_on_drop, so the process dies
        // here even when release() was never reached.
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

/// External collaborator that yields live backend sandboxes.
#[async_trait]
pub trait SandboxProvisioner: Send + Sync {
    /// Provision a backend rooted at `backend_dir` and wait until it is
    /// ready to accept deployments.
    async fn acquire(&self, backend_dir: &Path) -> Result<SandboxGuard>;
}

/// Provisioner that spawns the Convex local backend binary on a free
/// loopback port and polls its version endpoint until ready.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    binary: PathBuf,
    admin_key: String,
    ready_timeout: Duration,
}

impl LocalBackend {
    /// Create a provisioner for the given backend binary.
    pub fn new(binary: impl Into<PathBuf>, admin_key: impl Into<String>, ready_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            admin_key: admin_key.into(),
            ready_timeout,
        }
    }
}

#[async_trait]
impl SandboxProvisioner for LocalBackend {
    async fn acquire(&self, backend_dir: &Path) -> Result<SandboxGuard> {
        std::fs::create_dir_all(backend_dir)?;
        let port = free_port()?;
        let site_proxy_port = free_port()?;

        let child = Command::new(&self.binary)
            .arg("--port")
            .arg(port.to_string())
            .arg("--site-proxy-port")
            .arg(site_proxy_port.to_string())
            .current_dir(backend_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvalError::SandboxUnavailable {
                dir: backend_dir.to_path_buf(),
                reason: format!("failed to spawn {:?}: {e}", self.binary),
            })?;

        let sandbox = Sandbox {
            port,
            admin_key: self.admin_key.clone(),
            dir: backend_dir.to_path_buf(),
        };
        let guard = SandboxGuard::with_process(sandbox, child);

        wait_until_ready(port, self.ready_timeout)
            .await
            .map_err(|reason| EvalError::SandboxUnavailable {
                dir: backend_dir.to_path_buf(),
                reason,
            })?;

        debug!(port, dir = %backend_dir.display(), "sandbox ready");
        Ok(guard)
    }
}

/// Bind port 0 on loopback and take whatever the OS hands out.
fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Poll the backend's version endpoint until it answers or the deadline
/// passes.
async fn wait_until_ready(port: u16, timeout: Duration) -> std::result::Result<(), String> {
    let url = format!("http://127.0.0.1:{port}/version");
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            _ if tokio::time::Instant::now() >= deadline => {
                return Err(format!(
                    "no healthy response from {url} within {}s",
                    timeout.as_secs()
                ));
            }
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}
