//! Scheduler layer for the runner
//!
//! This layer walks the config references given on the command line and
//! runs one job after another, counting outcomes and publishing
//! checkpoints after each successful job.

pub mod publisher;
pub mod runner;

pub use publisher::ArtifactPublisher;
pub use runner::{JobRunner, finish_run};
