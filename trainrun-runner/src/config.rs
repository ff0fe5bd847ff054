//! Runner settings
//!
//! Everything the runner reads from the process environment is collected
//! here once at startup and passed down explicitly, so no other module
//! consults environment variables on its own.

use trainrun_store::{KeyPrefix, S3Settings};

/// Environment handed to the trainer program
#[derive(Debug, Clone)]
pub struct TrainerEnv {
    /// Enables anomaly detection in the trainer (`DEBUG_TOOLKIT=1`) and debug logging here
    pub debug: bool,

    /// Value of `DISABLE_TELEMETRY` for the trainer
    pub disable_telemetry: String,

    /// Value of `HF_HUB_ENABLE_HF_TRANSFER` for the trainer
    pub hf_transfer: String,
}

impl TrainerEnv {
    pub const DEBUG_VAR: &'static str = "DEBUG_TOOLKIT";
    pub const TELEMETRY_VAR: &'static str = "DISABLE_TELEMETRY";
    pub const HF_TRANSFER_VAR: &'static str = "HF_HUB_ENABLE_HF_TRANSFER";

    /// Variables to set on the trainer process
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (Self::TELEMETRY_VAR, self.disable_telemetry.clone()),
            (Self::HF_TRANSFER_VAR, self.hf_transfer.clone()),
        ];
        if self.debug {
            vars.push((Self::DEBUG_VAR, "1".to_string()));
        }
        vars
    }
}

impl Default for TrainerEnv {
    fn default() -> Self {
        Self {
            debug: false,
            disable_telemetry: "YES".to_string(),
            hf_transfer: "1".to_string(),
        }
    }
}

/// Settings read from the environment
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Bucket for checkpoint uploads; `None` disables upload and scratch clearing
    pub checkpoint_bucket: Option<String>,

    /// Credentials and region for the bucket
    pub s3: S3Settings,

    /// First component of the checkpoint key prefix
    pub user_id: Option<String>,

    /// Second component of the checkpoint key prefix
    pub job_id: Option<String>,

    /// Pod stopped by the automatic shutdown
    pub pod_id: Option<String>,

    pub trainer_env: TrainerEnv,
}

impl Settings {
    /// Creates settings from environment variables
    ///
    /// Expected environment variables:
    /// - SAVE_CHECKPOINT_BUCKET_NAME (optional, enables upload)
    /// - AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY (optional)
    /// - SAVE_CHECKPOINT_AWS_REGION (optional)
    /// - USER_ID, JOB_ID (required when uploading)
    /// - RUNPOD_POD_ID (optional)
    /// - DEBUG_TOOLKIT (optional, "1" enables debug mode)
    /// - DISABLE_TELEMETRY (optional, default: YES)
    /// - HF_HUB_ENABLE_HF_TRANSFER (optional, default: 1)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates settings from an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = TrainerEnv::default();

        Self {
            checkpoint_bucket: var("SAVE_CHECKPOINT_BUCKET_NAME"),
            s3: S3Settings {
                access_key_id: var("AWS_ACCESS_KEY_ID"),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                region: var("SAVE_CHECKPOINT_AWS_REGION"),
            },
            user_id: var("USER_ID"),
            job_id: var("JOB_ID"),
            pod_id: var("RUNPOD_POD_ID"),
            trainer_env: TrainerEnv {
                debug: var(TrainerEnv::DEBUG_VAR).as_deref() == Some("1"),
                disable_telemetry: var(TrainerEnv::TELEMETRY_VAR)
                    .unwrap_or(defaults.disable_telemetry),
                hf_transfer: var(TrainerEnv::HF_TRANSFER_VAR).unwrap_or(defaults.hf_transfer),
            },
        }
    }

    /// Key prefix for checkpoint uploads, when both identifiers are known
    pub fn key_prefix(&self) -> Option<KeyPrefix> {
        match (&self.user_id, &self.job_id) {
            (Some(user_id), Some(job_id)) => Some(KeyPrefix::new(user_id, job_id)),
            _ => None,
        }
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(bucket) = &self.checkpoint_bucket {
            if self.user_id.is_none() {
                anyhow::bail!("USER_ID must be set when uploading checkpoints to {}", bucket);
            }

            if self.job_id.is_none() {
                anyhow::bail!("JOB_ID must be set when uploading checkpoints to {}", bucket);
            }
        }

        Ok(())
    }
}
