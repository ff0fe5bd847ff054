//! Job abstraction
//!
//! A job is whatever a config reference resolves to: something that can be
//! run once, cleaned up afterwards, and that exposes its resolved config so
//! the driver can find the checkpoints it produced.

use anyhow::Result;
use async_trait::async_trait;
use trainrun_core::domain::job::JobConfig;

/// A resolved, runnable training job
#[async_trait]
pub trait Job: Send {
    /// The resolved `config` section of the job definition
    fn config(&self) -> &JobConfig;

    /// Runs the job to completion
    ///
    /// # Returns
    /// `Ok(())` when the job succeeded, an error describing the failure otherwise
    async fn run(&mut self) -> Result<()>;

    /// Releases whatever `run` left behind
    ///
    /// Only called after a successful `run`.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Service trait turning config references into jobs
pub trait JobResolver: Send + Sync {
    /// Resolves a config reference into a job
    ///
    /// # Arguments
    /// * `reference` - Config name or path as given on the command line
    /// * `name` - Optional override for `[name]` tags
    fn resolve(&self, reference: &str, name: Option<&str>) -> Result<Box<dyn Job>>;
}
