//! Trainrun
//!
//! Runs training jobs one after another on a GPU pod.
//!
//! Architecture:
//! - Configuration: CLI arguments plus settings read once from the environment
//! - Services: Job resolution and the trainer-process job
//! - Scheduler: Sequential job loop, checkpoint publishing and the run summary
//! - Shutdown: Optional delayed stop of the pod once the loop is done
//!
//! Each config reference is resolved into a job definition, handed to the
//! trainer program, and, when a bucket is configured, its checkpoints are
//! uploaded and the scratch folder is emptied before the next job starts.

mod cli;
mod config;
mod scheduler;
mod service;
mod shutdown;
mod workspace;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trainrun_core::ConfigLoader;
use trainrun_store::{ArtifactUploader, S3Store};

use crate::cli::Cli;
use crate::config::Settings;
use crate::scheduler::{ArtifactPublisher, JobRunner, finish_run};
use crate::service::{TrainerCommand, TrainerResolver};
use crate::shutdown::{RunpodCtl, ShutdownScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    // Initialize logging
    let default_filter = if settings.trainer_env.debug {
        "trainrun=debug,trainrun_core=debug,trainrun_store=debug"
    } else {
        "trainrun=info,trainrun_core=info,trainrun_store=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    settings.validate()?;

    let resolver = TrainerResolver::new(
        ConfigLoader::new(cli.config_dir.clone()),
        TrainerCommand {
            program: cli.trainer.clone(),
            args: cli.trainer_args.clone(),
            env: settings.trainer_env.clone(),
        },
        std::env::temp_dir(),
    );

    let publisher = build_publisher(&cli, &settings).await;
    if publisher.is_none() {
        info!("SAVE_CHECKPOINT_BUCKET_NAME not set, checkpoints stay on local disk");
    }

    let runner = JobRunner::new(
        Arc::new(resolver),
        publisher,
        cli.recover,
        cli.name.clone(),
    );

    let report = runner.run(&cli.config_files).await?;

    let scheduler = cli.shutdown.then(|| {
        ShutdownScheduler::new(
            cli.shutdown_delay(),
            settings.pod_id.clone(),
            Arc::new(RunpodCtl),
        )
    });
    finish_run(report, scheduler.as_ref(), shutdown::ctrl_c()).await?;

    Ok(())
}

/// Builds the checkpoint publisher when a bucket is configured
async fn build_publisher(cli: &Cli, settings: &Settings) -> Option<ArtifactPublisher> {
    let bucket = settings.checkpoint_bucket.as_ref()?;
    let prefix = settings.key_prefix()?;

    info!("Initializing S3 client connect to {}", bucket);
    let store = S3Store::connect(&settings.s3).await;
    let uploader = ArtifactUploader::new(Arc::new(store), prefix);

    Some(ArtifactPublisher::new(
        uploader,
        bucket.clone(),
        cli.checkpoint_suffix.clone(),
        cli.target_folder.clone(),
    ))
}
