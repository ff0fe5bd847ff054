//! Automatic pod shutdown
//!
//! Once all jobs are done the runner can stop the pod it runs on. The stop
//! is delayed and can be cancelled with Ctrl-C during the wait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Default wait before the pod is stopped
pub const DEFAULT_SHUTDOWN_DELAY: Duration = Duration::from_secs(120);

/// Capability of stopping a compute pod
#[async_trait]
pub trait PodController: Send + Sync {
    /// Issues the stop command for `pod_id`
    async fn stop_pod(&self, pod_id: &str) -> Result<()>;
}

/// Stops pods through the `runpodctl` CLI (pre-authenticated inside the pod)
pub struct RunpodCtl;

#[async_trait]
impl PodController for RunpodCtl {
    async fn stop_pod(&self, pod_id: &str) -> Result<()> {
        info!("Stopping runpod {}", pod_id);

        let output = Command::new("runpodctl")
            .args(["stop", "pod", pod_id])
            .output()
            .await
            .context("Failed to execute 'runpodctl stop pod'. Is runpodctl installed?")?;

        // The pod may already be going away; a failed stop is not fatal
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "runpodctl exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
        }

        Ok(())
    }
}

/// What the scheduler ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No pod identifier was available
    Skipped,
    /// The cancellation signal arrived during the wait
    Cancelled,
    /// The stop command was issued
    Issued,
}

/// Delayed, cancellable pod shutdown
pub struct ShutdownScheduler {
    delay: Duration,
    pod_id: Option<String>,
    controller: Arc<dyn PodController>,
}

impl ShutdownScheduler {
    /// Creates a new shutdown scheduler
    ///
    /// # Arguments
    /// * `delay` - How long to wait before stopping the pod
    /// * `pod_id` - Pod to stop; `None` makes the scheduler skip
    /// * `controller` - Issues the actual stop command
    pub fn new(
        delay: Duration,
        pod_id: Option<String>,
        controller: Arc<dyn PodController>,
    ) -> Self {
        Self {
            delay,
            pod_id,
            controller,
        }
    }

    /// Waits for the delay, then stops the pod unless `cancel` completes first
    pub async fn run<F>(&self, cancel: F) -> Result<ShutdownOutcome>
    where
        F: Future<Output = ()>,
    {
        let Some(pod_id) = &self.pod_id else {
            warn!(
                "Automatic shut down was configured, but could not get environment $RUNPOD_POD_ID"
            );
            return Ok(ShutdownOutcome::Skipped);
        };

        println!(
            "{}",
            format!(
                "Automatic shut down is configured. Shutting down in {} seconds! Hit Control-C to cancel.",
                self.delay.as_secs()
            )
            .yellow()
        );

        tokio::select! {
            biased;

            _ = cancel => {
                println!("{}", "Automatic shut down cancelled.".green());
                Ok(ShutdownOutcome::Cancelled)
            }
            _ = tokio::time::sleep(self.delay) => {
                self.controller.stop_pod(pod_id).await?;
                Ok(ShutdownOutcome::Issued)
            }
        }
    }
}

/// Completes on Ctrl-C; never completes if the handler cannot be installed
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
