//! Fake sandbox provisioner for tests.
//!
//! Satisfies [`SandboxProvisioner`] without spawning a backend process,
//! while counting acquisitions and releases so lifecycle tests can assert
//! that every sandbox is returned.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use backdiff_core::domain::{EvalError, Result};

use crate::backend::{Sandbox, SandboxGuard, SandboxProvisioner};

/// In-memory provisioner handing out fake sandboxes on sequential ports.
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sandboxes handed out.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Number of sandboxes returned (released or dropped).
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Whether every handed-out sandbox has been returned.
    pub fn all_released(&self) -> bool {
        self.acquired() == self.released()
    }

    /// Shared acquisition counter, usable after the provisioner is moved
    /// into an evaluator.
    pub fn acquired_counter(&self) -> Arc<AtomicUsize> {
        self.acquired.clone()
    }

    /// Shared release counter, usable after the provisioner is moved
    /// into an evaluator.
    pub fn released_counter(&self) -> Arc<AtomicUsize> {
        self.released.clone()
    }
}

#[async_trait]
impl SandboxProvisioner for FakeProvisioner {
    async fn acquire(&self, backend_dir: &Path) -> Result<SandboxGuard> {
        let n = self.acquired.fetch_add(1, Ordering::SeqCst);
        let released = self.released.clone();
        let sandbox = Sandbox {
            port: 3210 + n as u16,
            admin_key: "fake-admin-key".to_string(),
            dir: backend_dir.to_path_buf(),
        };
        Ok(SandboxGuard::external(sandbox).with_release_hook(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Provisioner whose acquisitions always fail, simulating an
/// infrastructure outage.
#[derive(Debug, Default)]
pub struct FailingProvisioner;

#[async_trait]
impl SandboxProvisioner for FailingProvisioner {
    async fn acquire(&self, backend_dir: &Path) -> Result<SandboxGuard> {
        Err(EvalError::SandboxUnavailable {
            dir: backend_dir.to_path_buf(),
            reason: "provisioner offline".to_string(),
        })
    }
}
