//! Trainer-backed jobs
//!
//! The runner does not train anything itself. A resolved job definition is
//! written to a staging file and handed to the configured trainer program;
//! the job succeeds when the trainer exits with status 0.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use trainrun_core::ConfigLoader;
use trainrun_core::domain::job::{JobConfig, JobDefinition};
use uuid::Uuid;

use crate::config::TrainerEnv;
use crate::service::job::{Job, JobResolver};

/// How to invoke the trainer program
#[derive(Debug, Clone)]
pub struct TrainerCommand {
    /// Program to execute (looked up in PATH when not a path)
    pub program: String,
    /// Arguments placed before the staged config path
    pub args: Vec<String>,
    /// Environment handed to the trainer
    pub env: TrainerEnv,
}

/// Resolves config references into [`TrainerJob`]s
pub struct TrainerResolver {
    loader: ConfigLoader,
    command: TrainerCommand,
    staging_dir: PathBuf,
}

impl TrainerResolver {
    /// Creates a new trainer resolver
    ///
    /// # Arguments
    /// * `loader` - Config loader searching the config folder
    /// * `command` - Trainer invocation shared by all jobs
    /// * `staging_dir` - Where resolved definitions are written for the trainer
    pub fn new(loader: ConfigLoader, command: TrainerCommand, staging_dir: PathBuf) -> Self {
        Self {
            loader,
            command,
            staging_dir,
        }
    }
}

impl JobResolver for TrainerResolver {
    fn resolve(&self, reference: &str, name: Option<&str>) -> Result<Box<dyn Job>> {
        let definition = self
            .loader
            .load(reference, name)
            .with_context(|| format!("Failed to resolve config '{}'", reference))?;

        debug!(
            "Resolved '{}' to {} job '{}' with {} process(es)",
            reference,
            definition.job,
            definition.config.name,
            definition.config.process.len()
        );

        Ok(Box::new(TrainerJob::new(
            definition,
            self.command.clone(),
            &self.staging_dir,
        )))
    }
}

/// A job executed by the external trainer program
pub struct TrainerJob {
    definition: JobDefinition,
    command: TrainerCommand,
    staged_config: PathBuf,
}

impl TrainerJob {
    pub fn new(definition: JobDefinition, command: TrainerCommand, staging_dir: &Path) -> Self {
        let staged_config = staging_dir.join(format!("trainrun-{}.json", Uuid::new_v4()));
        Self {
            definition,
            command,
            staged_config,
        }
    }

    /// Path of the resolved definition handed to the trainer
    pub fn staged_config(&self) -> &Path {
        &self.staged_config
    }

    /// Writes the resolved definition and creates the training folders
    async fn prepare(&self) -> Result<()> {
        let document = serde_json::to_string_pretty(&self.definition)
            .context("Failed to serialize job definition")?;
        tokio::fs::write(&self.staged_config, document)
            .await
            .with_context(|| {
                format!(
                    "Failed to write staged config {}",
                    self.staged_config.display()
                )
            })?;

        for process in &self.definition.config.process {
            if let Some(folder) = &process.training_folder {
                tokio::fs::create_dir_all(folder).await.with_context(|| {
                    format!("Failed to create training folder {}", folder.display())
                })?;
            }
        }

        Ok(())
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg(&self.staged_config)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in self.command.env.vars() {
            cmd.env(key, value);
        }
        if !self.command.env.debug {
            cmd.env_remove(TrainerEnv::DEBUG_VAR);
        }

        cmd
    }
}

#[async_trait]
impl Job for TrainerJob {
    fn config(&self) -> &JobConfig {
        &self.definition.config
    }

    async fn run(&mut self) -> Result<()> {
        self.prepare().await?;

        let name = self.definition.config.name.clone();
        info!(
            "Starting trainer '{}' for job '{}'",
            self.command.program, name
        );
        debug!("Staged config: {}", self.staged_config().display());

        let mut child = self
            .build_command()
            .spawn()
            .with_context(|| format!("Failed to start trainer '{}'", self.command.program))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stdout_lines, stderr_lines) = tokio::join!(
            child.wait(),
            forward_lines(stdout, &name, "stdout"),
            forward_lines(stderr, &name, "stderr"),
        );
        let status = status.context("Failed to wait for trainer")?;
        debug!(
            "Trainer for job '{}' wrote {} stdout and {} stderr line(s)",
            name, stdout_lines, stderr_lines
        );

        if !status.success() {
            bail!("Trainer for job '{}' exited with {}", name, describe(status));
        }

        info!("Trainer finished for job '{}'", name);
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        match tokio::fs::remove_file(&self.staged_config).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "Failed to remove staged config {}",
                    self.staged_config.display()
                )
            }),
        }
    }
}

/// Forwards each line of a trainer output stream to the log
///
/// Reads until EOF so the trainer never writes into a closed pipe. Bytes
/// that are not valid UTF-8 are logged lossily. Returns the number of
/// lines forwarded.
async fn forward_lines<R>(reader: Option<R>, job: &str, stream: &'static str) -> usize
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return 0;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut forwarded = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                info!(target: "trainrun::trainer", job, stream, "{}", decode_line(&buf));
                forwarded += 1;
            }
            Err(e) => {
                warn!("Stopped reading trainer {} for job '{}': {}", stream, job, e);
                break;
            }
        }
    }

    forwarded
}

/// Decodes one raw output line, dropping the line terminator
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
