//! Runtime configuration for `rackinv`.
//!
//! Settings are read from an optional YAML file and then overridden by
//! `RACKINV__`-prefixed environment variables, e.g.
//! `RACKINV__VCENTER__HOST=vc01.lab.local`. Every field has a default, so a
//! missing file yields a usable configuration.
//!
//! # Sample Config
//! ```yaml
//! vcenter:
//!   host: vc01.lab.local
//!   username: administrator@vsphere.local
//!   ignore_ssl: true
//!   api_release: "8.0.1.0"
//!   timeout_secs: 120
//! files:
//!   registry: datacenter.json
//!   snapshot_dir: "."
//!   merged_output: final_data.json
//!   empty_attributes_report: vms_with_empty_custom_attributes.json
//! inventory:
//!   fetch_custom_attributes: true
//! logging:
//!   max_level: INFO
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_CONFIG_PATH: &str = "config_data/config.yaml";
pub const ENV_PREFIX: &str = "RACKINV";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("loading configuration from `{path}`: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub vcenter: VCenterConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VCenterConfig {
    /// Prompted for when absent
    #[serde(default)]
    pub host: Option<String>,

    /// Prompted for when absent
    #[serde(default)]
    pub username: Option<String>,

    /// Skip hostname and certificate verification
    #[serde(default = "default_ignore_ssl")]
    pub ignore_ssl: bool,

    /// Release segment of the VI/JSON endpoint paths
    #[serde(default = "default_api_release")]
    pub api_release: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VCenterConfig {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            ignore_ssl: default_ignore_ssl(),
            api_release: default_api_release(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ignore_ssl() -> bool {
    true
}

fn default_api_release() -> String {
    "8.0.1.0".to_owned()
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Manually maintained rack registry
    #[serde(default = "default_registry")]
    pub registry: PathBuf,

    /// Directory receiving `datacenter_<timestamp>.json` snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    #[serde(default = "default_merged_output")]
    pub merged_output: PathBuf,

    #[serde(default = "default_empty_attributes_report")]
    pub empty_attributes_report: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            snapshot_dir: default_snapshot_dir(),
            merged_output: default_merged_output(),
            empty_attributes_report: default_empty_attributes_report(),
        }
    }
}

fn default_registry() -> PathBuf {
    PathBuf::from("datacenter.json")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_merged_output() -> PathBuf {
    PathBuf::from("final_data.json")
}

fn default_empty_attributes_report() -> PathBuf {
    PathBuf::from("vms_with_empty_custom_attributes.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Resolve custom attribute keys to their field names
    #[serde(default = "default_fetch_custom_attributes")]
    pub fetch_custom_attributes: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            fetch_custom_attributes: default_fetch_custom_attributes(),
        }
    }
}

fn default_fetch_custom_attributes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggingLevel {
    ERROR,
    WARN,
    #[default]
    INFO,
    DEBUG,
    TRACE,
    OFF,
}

impl<'de> Deserialize<'de> for LoggingLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = String::deserialize(deserializer)?;

        Ok(match v.to_uppercase().as_str() {
            "ERROR" => Self::ERROR,
            "WARN" => Self::WARN,
            "INFO" => Self::INFO,
            "DEBUG" => Self::DEBUG,
            "TRACE" => Self::TRACE,
            "OFF" => Self::OFF,
            other => Err(serde::de::Error::custom(format!(
                "Bad logging level specifier {other}"
            )))?,
        })
    }
}

impl From<LoggingLevel> for LevelFilter {
    fn from(value: LoggingLevel) -> Self {
        match value {
            LoggingLevel::ERROR => LevelFilter::ERROR,
            LoggingLevel::WARN => LevelFilter::WARN,
            LoggingLevel::INFO => LevelFilter::INFO,
            LoggingLevel::DEBUG => LevelFilter::DEBUG,
            LoggingLevel::TRACE => LevelFilter::TRACE,
            LoggingLevel::OFF => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub max_level: LoggingLevel,
}

/// Builds [`Settings`] from the YAML file at `path` (if it exists) layered
/// under `RACKINV__` environment overrides.
pub fn load(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let wrap = |source| SettingsError::Load {
        path: path.to_path_buf(),
        source,
    };

    config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(wrap)?
        .try_deserialize()
        .map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(dir.path().join("absent.yaml")).unwrap();

        assert_eq!(settings.vcenter.host, None);
        assert!(settings.vcenter.ignore_ssl);
        assert_eq!(settings.vcenter.api_release, "8.0.1.0");
        assert_eq!(settings.files.registry, PathBuf::from("datacenter.json"));
        assert_eq!(
            settings.files.empty_attributes_report,
            PathBuf::from("vms_with_empty_custom_attributes.json")
        );
        assert!(settings.inventory.fetch_custom_attributes);
        assert_eq!(settings.logging.max_level, LoggingLevel::INFO);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "vcenter:\n  host: vc01.lab.local\n  ignore_ssl: false\nfiles:\n  merged_output: out/final.json\nlogging:\n  max_level: DEBUG\n"
        )
        .unwrap();

        let settings = load(file.path()).unwrap();

        assert_eq!(settings.vcenter.host.as_deref(), Some("vc01.lab.local"));
        assert!(!settings.vcenter.ignore_ssl);
        assert_eq!(settings.vcenter.timeout_secs, 120);
        assert_eq!(settings.files.merged_output, PathBuf::from("out/final.json"));
        assert_eq!(settings.files.registry, PathBuf::from("datacenter.json"));
        assert_eq!(settings.logging.max_level, LoggingLevel::DEBUG);
    }

    #[test]
    fn test_shipped_config_prompts_for_login() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config_data/config.yaml");
        assert!(path.exists());

        let settings = load(&path).unwrap();

        assert_eq!(settings.vcenter.host, None);
        assert_eq!(settings.vcenter.username, None);
        assert!(settings.vcenter.ignore_ssl);
        assert_eq!(settings.files.registry, PathBuf::from("datacenter.json"));
    }

    #[test]
    fn test_bad_logging_level_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "logging:\n  max_level: LOUD\n").unwrap();

        assert!(load(file.path()).is_err());
    }

    #[test]
    fn test_level_filter_conversion() {
        assert_eq!(LevelFilter::from(LoggingLevel::WARN), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(LoggingLevel::OFF), LevelFilter::OFF);
    }
}
