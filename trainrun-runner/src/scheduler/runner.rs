//! Sequential job runner
//!
//! Resolves, runs and cleans up each config reference in order. A failed
//! job is recorded as an outcome rather than unwinding the loop; whether the
//! loop continues afterwards depends on recovery mode.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use colored::*;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trainrun_core::domain::job::{JobOutcome, JobRecord};
use trainrun_core::domain::tally::{RunTally, jobs_banner};

use crate::scheduler::publisher::ArtifactPublisher;
use crate::service::{Job, JobResolver};
use crate::shutdown::{ShutdownOutcome, ShutdownScheduler};

/// Outcome of one invocation of the runner
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tally: RunTally,
    /// Attempted jobs, in order
    pub records: Vec<JobRecord>,
    /// The run stopped at a failed job without attempting the rest
    pub halted: bool,
}

impl RunReport {
    /// Turns a halted run into an error naming the failed job
    pub fn into_result(self) -> Result<Self> {
        if self.halted {
            if let Some(record) = self.records.last() {
                bail!(
                    "Job {} failed: {}",
                    record.reference,
                    record.outcome.error().unwrap_or("unknown error")
                );
            }
        }
        Ok(self)
    }
}

/// Runs jobs one after another
pub struct JobRunner {
    resolver: Arc<dyn JobResolver>,
    publisher: Option<ArtifactPublisher>,
    recover: bool,
    name: Option<String>,
}

impl JobRunner {
    /// Creates a new job runner
    ///
    /// # Arguments
    /// * `resolver` - Turns config references into jobs
    /// * `publisher` - Uploads checkpoints after each job, when configured
    /// * `recover` - Keep going after a failed job
    /// * `name` - Override for `[name]` tags in every config
    pub fn new(
        resolver: Arc<dyn JobResolver>,
        publisher: Option<ArtifactPublisher>,
        recover: bool,
        name: Option<String>,
    ) -> Self {
        Self {
            resolver,
            publisher,
            recover,
            name,
        }
    }

    /// Runs every reference in order
    ///
    /// Without recovery mode the first failure ends the run; the report is
    /// then marked as halted and the remaining references are not attempted.
    pub async fn run(&self, references: &[String]) -> Result<RunReport> {
        if references.is_empty() {
            bail!("You must provide at least one config file");
        }

        info!("{}", jobs_banner(references.len()));

        let mut report = RunReport::default();

        for reference in references {
            let started_at = Utc::now();
            let outcome = self.execute_job(reference).await;

            let record = JobRecord {
                reference: reference.clone(),
                outcome: outcome.clone(),
                started_at,
                finished_at: Utc::now(),
            };
            info!(
                "Job {} {} after {}s",
                reference,
                if record.outcome.is_success() { "finished" } else { "failed" },
                record.duration().num_seconds()
            );

            report.tally.record(&outcome);
            report.records.push(record);

            if let JobOutcome::Failed { error } = &outcome {
                error!("Error running job: {}", error);
                if !self.recover {
                    report.halted = true;
                    break;
                }
            }
        }

        debug!(
            "Attempted {} of {} job(s)",
            report.tally.attempted(),
            references.len()
        );
        Ok(report)
    }

    /// Runs a single job and folds any error into its outcome
    pub async fn execute_job(&self, reference: &str) -> JobOutcome {
        match self.try_execute_job(reference).await {
            Ok(()) => JobOutcome::Completed,
            Err(e) => JobOutcome::failed(format!("{:#}", e)),
        }
    }

    async fn try_execute_job(&self, reference: &str) -> Result<()> {
        info!("Running job: {}", reference);

        let mut job: Box<dyn Job> = self.resolver.resolve(reference, self.name.as_deref())?;

        job.run().await.context("Job run failed")?;
        job.cleanup().await.context("Job cleanup failed")?;

        info!("Job completed: {}", reference);
        match job.config().checkpoint_dir() {
            Some(dir) => info!("Output directory: {}", dir.display()),
            None => info!("Output directory: not declared by job '{}'", job.config().name),
        }

        if let Some(publisher) = &self.publisher {
            let upload = publisher.publish(job.config()).await?;
            info!(
                "Published {} checkpoint(s) to {}/{}",
                upload.keys.len(),
                upload.bucket,
                upload.prefix
            );
        }

        Ok(())
    }
}

/// Ends a run: prints the summary, fails on a halted run, then shuts down
///
/// The shutdown is only considered after a run that was not halted. A
/// failed shutdown is logged and does not fail the run.
pub async fn finish_run<F>(
    report: RunReport,
    shutdown: Option<&ShutdownScheduler>,
    cancel: F,
) -> Result<Option<ShutdownOutcome>>
where
    F: Future<Output = ()>,
{
    print_summary(&report.tally);
    report.into_result()?;

    let Some(scheduler) = shutdown else {
        return Ok(None);
    };

    match scheduler.run(cancel).await {
        Ok(outcome) => {
            info!("Automatic shut down: {:?}", outcome);
            Ok(Some(outcome))
        }
        Err(e) => {
            warn!("Automatic shut down failed: {:#}", e);
            Ok(None)
        }
    }
}

/// Prints the end-of-run summary block
pub fn print_summary(tally: &RunTally) {
    let rule = "=".repeat(40);

    println!();
    println!("{}", rule);
    println!("{}", "Result:".bold());
    for (line, color) in summary_entries(tally) {
        println!(" - {}", line.color(color));
    }
    println!("{}", rule);
}

/// Summary lines with their colors
fn summary_entries(tally: &RunTally) -> Vec<(String, Color)> {
    let mut lines = tally.summary_lines().into_iter();
    let mut entries = Vec::new();

    if let Some(completed) = lines.next() {
        let color = if tally.completed > 0 {
            Color::Green
        } else {
            Color::Yellow
        };
        entries.push((completed, color));
    }
    entries.extend(lines.map(|line| (line, Color::Red)));

    entries
}
