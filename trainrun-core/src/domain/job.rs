//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Kind of job named by the top-level `job` key of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Extract,
    Train,
    Mod,
    Generate,
    Extension,
}

impl FromStr for JobKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract" => Ok(JobKind::Extract),
            "train" => Ok(JobKind::Train),
            "mod" => Ok(JobKind::Mod),
            "generate" => Ok(JobKind::Generate),
            "extension" => Ok(JobKind::Extension),
            other => Err(ConfigError::UnknownJobKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Extract => write!(f, "extract"),
            JobKind::Train => write!(f, "train"),
            JobKind::Mod => write!(f, "mod"),
            JobKind::Generate => write!(f, "generate"),
            JobKind::Extension => write!(f, "extension"),
        }
    }
}

/// Fully resolved job definition
///
/// This is the document handed to the trainer. Keys the runner does not
/// interpret are kept in `extra` so nothing is lost on the way through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub job: JobKind,
    pub config: JobConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `config` section of a job definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default)]
    pub process: Vec<ProcessConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobConfig {
    /// Folder holding the checkpoints of this job
    ///
    /// `<process[0].training_folder>/<name>`, or `None` when the first
    /// process does not declare a training folder.
    pub fn checkpoint_dir(&self) -> Option<PathBuf> {
        self.process
            .first()
            .and_then(|p| p.training_folder.as_ref())
            .map(|folder| folder.join(&self.name))
    }
}

/// One entry of the `config.process` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_folder: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of executing one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed { error: String },
}

impl JobOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        JobOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }

    /// Error message of a failed outcome
    pub fn error(&self) -> Option<&str> {
        match self {
            JobOutcome::Completed => None,
            JobOutcome::Failed { error } => Some(error),
        }
    }
}

/// Record of one attempted job within a run
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Config reference as given on the command line
    pub reference: String,
    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_parse() {
        assert_eq!("train".parse::<JobKind>().unwrap(), JobKind::Train);
        assert_eq!("extension".parse::<JobKind>().unwrap(), JobKind::Extension);

        let err = "finetune".parse::<JobKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown job type finetune");
    }

    #[test]
    fn test_job_kind_display_matches_parse() {
        for kind in [
            JobKind::Extract,
            JobKind::Train,
            JobKind::Mod,
            JobKind::Generate,
            JobKind::Extension,
        ] {
            assert_eq!(kind.to_string().parse::<JobKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_definition_keeps_unknown_keys() {
        let value = serde_json::json!({
            "job": "extension",
            "config": {
                "name": "my_lora",
                "process": [{
                    "type": "sd_trainer",
                    "training_folder": "output",
                    "network": { "type": "lora", "linear": 16 }
                }],
                "seed": 42
            },
            "meta": { "version": "1.0" }
        });

        let def: JobDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(def.job, JobKind::Extension);
        assert_eq!(def.config.extra.get("seed"), Some(&serde_json::json!(42)));
        assert_eq!(def.config.process[0].kind, "sd_trainer");
        assert!(def.config.process[0].extra.contains_key("network"));

        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["config"]["process"][0]["network"]["linear"], 16);
        assert_eq!(back["meta"]["version"], "1.0");
    }

    #[test]
    fn test_checkpoint_dir() {
        let config: JobConfig = serde_json::from_value(serde_json::json!({
            "name": "my_lora",
            "process": [{ "type": "sd_trainer", "training_folder": "/out" }]
        }))
        .unwrap();
        assert_eq!(config.checkpoint_dir(), Some(PathBuf::from("/out/my_lora")));

        let no_folder: JobConfig = serde_json::from_value(serde_json::json!({
            "name": "my_lora",
            "process": [{ "type": "sd_trainer" }]
        }))
        .unwrap();
        assert_eq!(no_folder.checkpoint_dir(), None);
    }

    #[test]
    fn test_outcome() {
        assert!(JobOutcome::Completed.is_success());
        let failed = JobOutcome::failed("boom");
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some("boom"));
    }
}
