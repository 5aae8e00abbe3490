//! Project configuration parsing (mo.config.json)
//!
//! The file lives in the project root. It is created from a default template
//! on first start, and afterwards only rewritten through [`ConfigStore::update`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "mo.config.json";

const DEFAULT_PORT: u16 = 3000;

const DEFAULT_IGNORE_LIST: &[&str] = &[
    "#summary",
    ".npmrc",
    ".git",
    "node_modules",
    "public",
    "scripts",
    ".eslintrc.cjs",
    "components.json",
    "src/components/ui",
    ".gitignore",
    "package-lock.json",
    "README.md",
    "tsconfig.json",
    "vite.config.ts",
    "yarn.lock",
    "tsconfig.app.json",
    "tsconfig.node.json",
    "postcss.config.js",
    ".DS_Store",
    ".vscode",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Failed to write config: {0}")]
    WriteError(String),
    #[error("includeList is required and must be a non-empty array")]
    EmptyIncludeList,
}

/// Contents of mo.config.json
///
/// Keys keep the established on-disk names (`includeList`, `git`, `cmd`, ...);
/// the longer names are accepted when reading. Unknown keys round-trip
/// through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoConfig {
    #[serde(rename = "includeList", alias = "includePatterns", default)]
    pub include_patterns: Vec<String>,
    #[serde(rename = "ignoreList", alias = "ignorePatterns", default)]
    pub ignore_patterns: Vec<String>,
    #[serde(rename = "git", alias = "gitEnabled", default)]
    pub git_enabled: bool,
    #[serde(rename = "cmd", alias = "commandExecEnabled", default)]
    pub command_exec_enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default)]
    pub start_url: String,
    #[serde(default)]
    pub setting: Vec<String>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub is_initialized: bool,
    /// 命令执行超时（秒），缺省表示不限时
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for MoConfig {
    fn default() -> Self {
        let mut extra = Map::new();
        extra.insert("templates".to_string(), Value::Object(Map::new()));
        extra.insert("organizationId".to_string(), Value::from(1));

        Self {
            include_patterns: vec!["src/**/*.js".to_string(), "src/**/*.ts".to_string()],
            ignore_patterns: DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect(),
            git_enabled: false,
            command_exec_enabled: false,
            port: DEFAULT_PORT,
            agent_type: "企业内部系统".to_string(),
            start_url: "http://localhost:5173/".to_string(),
            setting: vec![
                "# 角色设定".to_string(),
                "你是 Web 开发专家，精通 CSS、JavaScript、React、Tailwind。".to_string(),
                "# 开发规范".to_string(),
            ],
            app_id: String::new(),
            is_initialized: true,
            command_timeout_secs: None,
            extra,
        }
    }
}

impl MoConfig {
    /// Reject configurations the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include_patterns.is_empty() {
            return Err(ConfigError::EmptyIncludeList);
        }
        Ok(())
    }
}

/// Loaded configuration plus the file it persists to
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: MoConfig,
}

impl ConfigStore {
    pub fn new(path: PathBuf, config: MoConfig) -> Self {
        Self { path, config }
    }

    /// Load mo.config.json from `project_dir`, writing the default template
    /// first if the file does not exist yet
    pub fn load_or_create(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = MoConfig::default();
            write_config(&path, &config)?;
            info!("Created {} with default template", CONFIG_FILE_NAME);
            return Ok(Self { path, config });
        }

        let content =
            fs::read_to_string(&path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let config: MoConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(Self { path, config })
    }

    pub fn config(&self) -> &MoConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` and persist the result.
    ///
    /// The in-memory value only changes once the write succeeded.
    pub fn update<F>(&mut self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut MoConfig),
    {
        let mut next = self.config.clone();
        f(&mut next);
        write_config(&self.path, &next)?;
        self.config = next;
        Ok(())
    }
}

fn write_config(path: &Path, config: &MoConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::WriteError(e.to_string()))?;
    fs::write(path, content).map_err(|e| ConfigError::WriteError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_default_config() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::load_or_create(temp.path()).unwrap();

        assert!(temp.path().join(CONFIG_FILE_NAME).is_file());
        assert_eq!(store.config().port, 3000);
        assert!(store.config().is_initialized);
        assert!(!store.config().git_enabled);
        assert!(!store.config().command_exec_enabled);
        assert_eq!(
            store.config().include_patterns,
            vec!["src/**/*.js".to_string(), "src/**/*.ts".to_string()]
        );
        assert!(store.config().validate().is_ok());
    }

    #[test]
    fn test_parse_existing_config() {
        let temp = TempDir::new().unwrap();
        let json = r##"{
  "includeList": ["app/**/*.rs"],
  "ignoreList": ["app/generated"],
  "git": true,
  "cmd": false,
  "port": 4100,
  "agentType": "internal",
  "startUrl": "http://localhost:8080/",
  "setting": ["# rules"],
  "appId": "abc",
  "isInitialized": false,
  "organizationId": 7
}"##;
        fs::write(temp.path().join(CONFIG_FILE_NAME), json).unwrap();

        let store = ConfigStore::load_or_create(temp.path()).unwrap();
        let config = store.config();
        assert_eq!(config.include_patterns, vec!["app/**/*.rs".to_string()]);
        assert_eq!(config.ignore_patterns, vec!["app/generated".to_string()]);
        assert!(config.git_enabled);
        assert!(!config.command_exec_enabled);
        assert_eq!(config.port, 4100);
        assert_eq!(config.app_id, "abc");
        assert_eq!(config.extra.get("organizationId"), Some(&Value::from(7)));
    }

    #[test]
    fn test_accepts_long_field_names() {
        let json = r#"{"includePatterns": ["*.md"], "gitEnabled": true, "commandExecEnabled": true}"#;
        let config: MoConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.include_patterns, vec!["*.md".to_string()]);
        assert!(config.git_enabled);
        assert!(config.command_exec_enabled);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_empty_include_list_is_rejected() {
        let config: MoConfig = serde_json::from_str(r#"{"includeList": []}"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyIncludeList)));
    }

    #[test]
    fn test_update_persists_and_keeps_extra_keys() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"{"includeList": ["src/**"], "templates": {"a": 1}}"#,
        )
        .unwrap();

        let mut store = ConfigStore::load_or_create(temp.path()).unwrap();
        store
            .update(|c| {
                c.app_id = "app-42".to_string();
                c.is_initialized = true;
            })
            .unwrap();

        let reloaded = ConfigStore::load_or_create(temp.path()).unwrap();
        assert_eq!(reloaded.config().app_id, "app-42");
        assert!(reloaded.config().is_initialized);
        assert_eq!(
            reloaded.config().extra.get("templates"),
            Some(&serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn test_failed_update_leaves_config_untouched() {
        let temp = TempDir::new().unwrap();
        let missing_dir = temp.path().join("missing").join(CONFIG_FILE_NAME);
        let mut store = ConfigStore::new(missing_dir, MoConfig::default());

        let result = store.update(|c| c.app_id = "never".to_string());
        assert!(matches!(result, Err(ConfigError::WriteError(_))));
        assert_eq!(store.config().app_id, "");
    }
}
