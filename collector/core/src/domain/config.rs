// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Collector Configuration Types
//
// Defines the configuration manifest for a trace collection run, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Remote agent endpoints for HTTP pull collection
// - Per-endpoint collection timeout
// - Live monitor scheduling
// - Classifier extensions (custom rules, failure keywords)
// - HTTP surface and table export settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::classification::{
    ClassificationRule, FailureCategory, FailureClassifier, DEFAULT_FAILURE_KEYWORDS,
};

pub const API_VERSION: &str = "mas-trace/v1";
pub const KIND: &str = "TraceCollectorConfig";
pub const CONFIG_ENV_VAR: &str = "MAS_TRACE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "mas-trace.yaml";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// API version (must be "mas-trace/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "TraceCollectorConfig")
    pub kind: String,

    #[serde(default)]
    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: CollectorSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorSpec {
    /// Agent id → URL returning that agent's trace records
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    #[serde(default)]
    pub collector: RemoteCollectorSettings,

    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub classifier: ClassifierSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCollectorSettings {
    /// Upper bound for one endpoint request, connect through body
    #[serde(with = "humantime_serde", default = "default_collect_timeout")]
    pub timeout: Duration,
}

impl Default for RemoteCollectorSettings {
    fn default() -> Self {
        Self {
            timeout: default_collect_timeout(),
        }
    }
}

fn default_collect_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(with = "humantime_serde", default = "default_monitor_interval")]
    pub interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_monitor_interval(),
        }
    }
}

fn default_monitor_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Consulted before the built-in taxonomy, in order
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,

    #[serde(default = "default_failure_keywords")]
    pub failure_keywords: Vec<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            custom_rules: Vec::new(),
            failure_keywords: default_failure_keywords(),
        }
    }
}

fn default_failure_keywords() -> Vec<String> {
    DEFAULT_FAILURE_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Custom rule as written in YAML; `category` is a taxonomy label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            table_path: default_table_path(),
        }
    }
}

fn default_table_path() -> PathBuf {
    PathBuf::from("mas_logs.csv")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata::default(),
            spec: CollectorSpec::default(),
        }
    }
}

impl CollectorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Explicit path, then `MAS_TRACE_CONFIG`, then `./mas-trace.yaml`, then
    /// defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Self::load(Path::new(&path));
            }
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::Invalid(format!(
                "apiVersion must be '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }
        if self.kind != KIND {
            return Err(ConfigError::Invalid(format!(
                "kind must be '{}', got '{}'",
                KIND, self.kind
            )));
        }

        for (agent_id, url) in &self.spec.endpoints {
            if agent_id.trim().is_empty() {
                return Err(ConfigError::Invalid("endpoint agent id must not be empty".into()));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "endpoint for '{}' must be an http(s) URL, got '{}'",
                    agent_id, url
                )));
            }
        }

        if self.spec.collector.timeout.is_zero() {
            return Err(ConfigError::Invalid("collector.timeout must be non-zero".into()));
        }
        if self.spec.monitor.interval.is_zero() {
            return Err(ConfigError::Invalid("monitor.interval must be non-zero".into()));
        }

        for rule in &self.spec.classifier.custom_rules {
            if FailureCategory::from_label(&rule.category).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "unknown failure category '{}'",
                    rule.category
                )));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "custom rule for '{}' has no keywords",
                    rule.category
                )));
            }
        }

        Ok(())
    }

    /// Classifier with this config's custom rules and failure keywords.
    pub fn classifier(&self) -> Result<FailureClassifier, ConfigError> {
        let rules = self
            .spec
            .classifier
            .custom_rules
            .iter()
            .map(|rule| {
                FailureCategory::from_label(&rule.category)
                    .map(|category| ClassificationRule::new(category, &rule.keywords))
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!("unknown failure category '{}'", rule.category))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FailureClassifier::with_custom_rules(rules)
            .with_failure_keywords(&self.spec.classifier.failure_keywords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_uses_defaults() {
        let config = CollectorConfig::from_yaml_str(
            "apiVersion: mas-trace/v1\nkind: TraceCollectorConfig\nspec: {}\n",
        )
        .unwrap();

        assert!(config.spec.endpoints.is_empty());
        assert_eq!(config.spec.collector.timeout, Duration::from_secs(5));
        assert_eq!(config.spec.monitor.interval, Duration::from_secs(5));
        assert_eq!(config.spec.server.port, 8088);
        assert_eq!(config.spec.classifier.failure_keywords.len(), 6);
    }

    #[test]
    fn test_full_manifest() {
        let yaml = r#"
apiVersion: mas-trace/v1
kind: TraceCollectorConfig
metadata:
  name: metagpt-run
spec:
  endpoints:
    product_manager: "http://127.0.0.1:5001/agents/product_manager/logs"
    architect: "http://127.0.0.1:5002/agents/architect/logs"
  collector:
    timeout: 750ms
  monitor:
    enabled: false
    interval: 2s
  classifier:
    custom_rules:
      - category: Timeout
        keywords: ["deadline exceeded"]
"#;
        let config = CollectorConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.metadata.name, "metagpt-run");
        assert_eq!(config.spec.endpoints.len(), 2);
        assert_eq!(config.spec.collector.timeout, Duration::from_millis(750));
        assert!(!config.spec.monitor.enabled);

        let classifier = config.classifier().unwrap();
        assert_eq!(
            classifier.classify("system deadline exceeded"),
            FailureCategory::Timeout
        );
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let err = CollectorConfig::from_yaml_str("apiVersion: mas-trace/v1\nkind: NodeConfig\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let yaml = "apiVersion: mas-trace/v1\nkind: TraceCollectorConfig\nspec:\n  endpoints:\n    pm: ftp://host/logs\n";
        assert!(CollectorConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_category() {
        let yaml = r#"
apiVersion: mas-trace/v1
kind: TraceCollectorConfig
spec:
  classifier:
    custom_rules:
      - category: Gremlins
        keywords: ["gremlin"]
"#;
        assert!(CollectorConfig::from_yaml_str(yaml).is_err());
    }
}
