//! Job definition loader
//!
//! This module turns a config reference given on the command line into a
//! typed [`JobDefinition`]:
//! - locating the file in the config folder or as a plain path
//! - parsing JSON or YAML
//! - checking the required keys
//! - replacing `[name]` tags
//!
//! Nothing here executes a job; the runner decides how a definition is run.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::domain::job::{JobDefinition, JobKind};
use crate::error::ConfigError;

/// Extensions tried, in order, when a reference names a file without one
pub const CONFIG_EXTENSIONS: [&str; 3] = [".json", ".yaml", ".yml"];

/// Tag replaced with the job name in every string value of a definition
pub const NAME_TAG: &str = "[name]";

/// Loads job definitions from a config folder
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a loader searching `config_dir` first
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Finds the file a reference points to
    ///
    /// Lookup order:
    /// 1. `<config_dir>/<reference>`
    /// 2. `<config_dir>/<reference><ext>` for each of [`CONFIG_EXTENSIONS`]
    /// 3. `<reference>` as a path on its own
    pub fn locate(&self, reference: &str) -> Result<PathBuf, ConfigError> {
        let candidate = self.config_dir.join(reference);
        if candidate.is_file() {
            return Ok(candidate);
        }

        for ext in CONFIG_EXTENSIONS {
            let mut with_ext = candidate.clone().into_os_string();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Ok(with_ext);
            }
        }

        let direct = PathBuf::from(reference);
        if direct.is_file() {
            return Ok(direct);
        }

        Err(ConfigError::NotFound(reference.to_string()))
    }

    /// Resolves a reference into a job definition
    ///
    /// # Arguments
    /// * `reference` - Config name (e.g. `person_v1`) or path
    /// * `name` - Optional override replacing `[name]` tags
    ///
    /// # Example
    /// ```no_run
    /// use trainrun_core::ConfigLoader;
    ///
    /// let loader = ConfigLoader::new("config");
    /// let definition = loader.load("person_v1", Some("alice"))?;
    /// println!("{} has {} process(es)", definition.config.name, definition.config.process.len());
    /// # Ok::<(), trainrun_core::ConfigError>(())
    /// ```
    pub fn load(&self, reference: &str, name: Option<&str>) -> Result<JobDefinition, ConfigError> {
        let path = self.locate(reference)?;
        let document = read_document(&path)?;
        let document = preprocess(document, name)?;
        interpret(document)
    }
}

/// Reads and parses a config file according to its extension
pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let display = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;

    match extension.as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        }),
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        }),
        _ => Err(ConfigError::UnsupportedFormat(display)),
    }
}

/// Checks the required keys and replaces `[name]` tags
///
/// The replacement is the override when given, otherwise `config.name`.
/// An override also becomes `config.name` when the document has none.
pub fn preprocess(mut document: Value, name: Option<&str>) -> Result<Value, ConfigError> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| ConfigError::Invalid("top level must be a mapping".to_string()))?;

    if !root.contains_key("job") {
        return Err(ConfigError::MissingKey("job"));
    }

    let config = root
        .get_mut("config")
        .ok_or(ConfigError::MissingKey("config"))?;
    let config_name = config.get("name").and_then(Value::as_str).map(String::from);

    let replacement = match (name, config_name) {
        (Some(name), _) => {
            if let Some(config) = config.as_object_mut() {
                config
                    .entry("name")
                    .or_insert_with(|| Value::String(name.to_string()));
            }
            name.to_string()
        }
        (None, Some(config_name)) => config_name,
        (None, None) => return Err(ConfigError::MissingKey("config.name")),
    };

    substitute_tag(&mut document, NAME_TAG, &replacement);
    Ok(document)
}

/// Replaces `tag` in every string value of `value`, recursively
///
/// Mapping keys are left untouched.
pub fn substitute_tag(value: &mut Value, tag: &str, replacement: &str) {
    match value {
        Value::String(s) => {
            if s.contains(tag) {
                *s = s.replace(tag, replacement);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_tag(item, tag, replacement);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                substitute_tag(item, tag, replacement);
            }
        }
        _ => {}
    }
}

/// Turns a preprocessed document into a typed definition
fn interpret(document: Value) -> Result<JobDefinition, ConfigError> {
    let root: &Map<String, Value> = document
        .as_object()
        .ok_or_else(|| ConfigError::Invalid("top level must be a mapping".to_string()))?;

    // Checked separately so an unknown kind reads better than a serde variant error
    match root.get("job") {
        Some(Value::String(kind)) => {
            kind.parse::<JobKind>()?;
        }
        Some(_) => return Err(ConfigError::Invalid("'job' must be a string".to_string())),
        None => return Err(ConfigError::MissingKey("job")),
    }

    // preprocess fills config.name from the override, so only a bare document lacks it
    if let Some(Value::Object(config)) = root.get("config") {
        if !config.contains_key("name") {
            return Err(ConfigError::MissingKey("config.name"));
        }
    }

    serde_json::from_value(document).map_err(|e| ConfigError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write(dir: &Path, file: &str, content: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, content).unwrap();
        path
    }

    const JSON_CONFIG: &str = r#"{
        "job": "extension",
        "config": {
            "name": "[name]",
            "process": [{ "type": "sd_trainer", "training_folder": "output/[name]" }]
        },
        "meta": { "name": "[name]" }
    }"#;

    const YAML_CONFIG: &str = r#"
job: train
config:
  name: my_first_lora
  process:
    - type: sd_trainer
      training_folder: output
      sample:
        prompts:
          - "a photo of [name]"
"#;

    #[test]
    fn test_locate_in_config_dir_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let expected = write(dir.path(), "person_v1.yaml", YAML_CONFIG);

        let loader = ConfigLoader::new(dir.path());
        assert_eq!(loader.locate("person_v1").unwrap(), expected);
    }

    #[test]
    fn test_locate_prefers_json_over_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = write(dir.path(), "person.json", JSON_CONFIG);
        write(dir.path(), "person.yaml", YAML_CONFIG);

        let loader = ConfigLoader::new(dir.path());
        assert_eq!(loader.locate("person").unwrap(), json);
    }

    #[test]
    fn test_locate_exact_name_first() {
        let dir = tempfile::tempdir().unwrap();
        let exact = write(dir.path(), "person.yml", YAML_CONFIG);
        write(dir.path(), "person.yml.json", JSON_CONFIG);

        let loader = ConfigLoader::new(dir.path());
        assert_eq!(loader.locate("person.yml").unwrap(), exact);
    }

    #[test]
    fn test_locate_full_path_outside_config_dir() {
        let config_dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let path = write(other.path(), "elsewhere.json", JSON_CONFIG);

        let loader = ConfigLoader::new(config_dir.path());
        let reference = path.to_string_lossy().to_string();
        assert_eq!(loader.locate(&reference).unwrap(), path);
    }

    #[test]
    fn test_locate_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());

        let err = loader.locate("does_not_exist").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert_eq!(err.to_string(), "Could not find config file does_not_exist");
    }

    #[test]
    fn test_load_json_with_name_override() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shared.json", JSON_CONFIG);

        let loader = ConfigLoader::new(dir.path());
        let def = loader.load("shared", Some("alice")).unwrap();

        assert_eq!(def.job, JobKind::Extension);
        assert_eq!(def.config.name, "alice");
        assert_eq!(
            def.config.process[0].training_folder,
            Some(PathBuf::from("output/alice"))
        );
        assert_eq!(def.meta, Some(json!({ "name": "alice" })));
    }

    #[test]
    fn test_load_yaml_uses_config_name_for_tags() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lora.yml", YAML_CONFIG);

        let loader = ConfigLoader::new(dir.path());
        let def = loader.load("lora", None).unwrap();

        assert_eq!(def.job, JobKind::Train);
        assert_eq!(def.config.name, "my_first_lora");
        let prompts = &def.config.process[0].extra["sample"]["prompts"];
        assert_eq!(prompts[0], "a photo of my_first_lora");
    }

    #[test]
    fn test_load_rejects_unknown_job_kind() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bad.json",
            r#"{ "job": "finetune", "config": { "name": "x", "process": [] } }"#,
        );

        let loader = ConfigLoader::new(dir.path());
        let err = loader.load("bad", None).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownJobKind(ref k) if k == "finetune"));
    }

    #[test]
    fn test_load_rejects_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "job.toml", "job = 'train'");

        let loader = ConfigLoader::new(dir.path());
        let err = loader.load("job.toml", None).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", "{ not json");

        let loader = ConfigLoader::new(dir.path());
        let err = loader.load("broken", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_preprocess_requires_keys() {
        let err = preprocess(json!({ "config": { "name": "x" } }), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("job")));

        let err = preprocess(json!({ "job": "train" }), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("config")));

        let err = preprocess(json!({ "job": "train", "config": {} }), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("config.name")));
    }

    #[test]
    fn test_preprocess_name_override_without_config_name() {
        let doc = json!({ "job": "train", "config": { "process": [], "out": "[name].bin" } });
        let doc = preprocess(doc, Some("bob")).unwrap();
        assert_eq!(doc["config"]["out"], "bob.bin");
        assert_eq!(doc["config"]["name"], "bob");

        let definition = interpret(doc).unwrap();
        assert_eq!(definition.config.name, "bob");
    }

    #[test]
    fn test_preprocess_override_keeps_existing_config_name() {
        let doc = json!({ "job": "train", "config": { "name": "[name]_v2" } });
        let doc = preprocess(doc, Some("bob")).unwrap();
        assert_eq!(doc["config"]["name"], "bob_v2");
    }

    #[test]
    fn test_interpret_requires_config_name() {
        let err = interpret(json!({ "job": "train", "config": { "process": [] } })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("config.name")));
    }

    #[test]
    fn test_load_name_override_without_config_name() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "shared.json",
            r#"{ "job": "extension", "config": { "process": [{ "type": "sd_trainer", "training_folder": "out/[name]" }] } }"#,
        );

        let definition = ConfigLoader::new(dir.path()).load("shared", Some("carol")).unwrap();
        assert_eq!(definition.config.name, "carol");
        assert_eq!(
            definition.config.checkpoint_dir(),
            Some(PathBuf::from("out/carol/carol"))
        );
    }

    #[test]
    fn test_substitute_tag_leaves_keys_and_non_strings() {
        let mut value = json!({
            "[name]": "[name]-[name]",
            "steps": 1000,
            "list": ["[name]", true, null]
        });
        substitute_tag(&mut value, NAME_TAG, "z");

        assert_eq!(value["[name]"], "z-z");
        assert_eq!(value["steps"], 1000);
        assert_eq!(value["list"], json!(["z", true, null]));
    }
}
