//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use trainrun_store::DEFAULT_CHECKPOINT_SUFFIX;

use crate::shutdown::DEFAULT_SHUTDOWN_DELAY;

#[derive(Parser, Debug)]
#[command(name = "trainrun")]
#[command(about = "Run training jobs one after another", long_about = None)]
pub struct Cli {
    /// Name of config file (eg: person_v1 for config/person_v1.json/yaml), or full path if it is not in config folder.
    /// You can pass multiple config files and run them all sequentially
    #[arg(required = true, value_name = "CONFIG_FILES")]
    pub config_files: Vec<String>,

    /// Continue running additional jobs even if a job fails
    #[arg(short, long)]
    pub recover: bool,

    /// Name to replace [name] tag in config file, useful for shared config file
    #[arg(short, long)]
    pub name: Option<String>,

    /// Automatically shut down the pod once all jobs are done
    #[arg(long)]
    pub shutdown: bool,

    /// Seconds to wait before the automatic shut down
    #[arg(long, visible_alias = "st", default_value_t = DEFAULT_SHUTDOWN_DELAY.as_secs())]
    pub shutdown_time: u64,

    /// Scratch folder emptied after checkpoints are uploaded
    #[arg(long, default_value = "/workspace")]
    pub target_folder: PathBuf,

    /// Folder searched first when resolving config names
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Trainer program invoked with the resolved config path
    #[arg(long, env = "TRAINRUN_TRAINER", default_value = "trainer")]
    pub trainer: String,

    /// Argument passed to the trainer before the config path (repeatable)
    #[arg(long = "trainer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub trainer_args: Vec<String>,

    /// Suffix of the checkpoint files to upload
    #[arg(long, default_value = DEFAULT_CHECKPOINT_SUFFIX)]
    pub checkpoint_suffix: String,
}

impl Cli {
    pub fn shutdown_delay(&self) -> Duration {
        Duration::from_secs(self.shutdown_time)
    }
}
