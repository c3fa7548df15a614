use iconpack_codegen::CollisionPolicy;
use iconpack_package::{PackageSettings, VersionStrategy};
use iconpack_remote::{FeedConfig, IconServiceConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "iconpack.toml";

pub const ENV_ICON_SERVICE_URL: &str = "ICONPACK_ICON_SERVICE_URL";
pub const ENV_FEED_URL: &str = "ICONPACK_FEED_URL";
pub const ENV_WORK_DIR: &str = "ICONPACK_WORK_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Contents of `iconpack.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Parent directory of per-run output roots and archives.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    pub icon_service: IconServiceConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub package: PackageSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_base_version")]
    pub base_version: String,
    #[serde(default)]
    pub version_strategy: VersionStrategy,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub collisions: CollisionPolicy,
    #[serde(default = "default_peer_dependencies")]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            name: None,
            base_version: default_base_version(),
            version_strategy: VersionStrategy::default(),
            author: None,
            description: None,
            collisions: CollisionPolicy::default(),
            peer_dependencies: default_peer_dependencies(),
        }
    }
}

impl PackageSection {
    pub fn settings(&self) -> PackageSettings {
        PackageSettings {
            name: self.name.clone(),
            base_version: self.base_version.clone(),
            version_strategy: self.version_strategy,
            author: self.author.clone(),
            description: self.description.clone(),
            peer_dependencies: self.peer_dependencies.clone(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("iconpack")
}

fn default_base_version() -> String {
    PackageSettings::default().base_version
}

fn default_peer_dependencies() -> BTreeMap<String, String> {
    PackageSettings::default().peer_dependencies
}

impl PipelineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(input)?;
        config.icon_service.url = config.icon_service.url.trim_end_matches('/').to_owned();
        config.feed.url = config.feed.url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    /// Read the file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override selected fields from `lookup` (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_ICON_SERVICE_URL) {
            self.icon_service.url = url.trim_end_matches('/').to_owned();
        }
        if let Some(url) = get(ENV_FEED_URL) {
            self.feed.url = url.trim_end_matches('/').to_owned();
        }
        if let Some(dir) = get(ENV_WORK_DIR) {
            self.work_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("icon_service.url", &self.icon_service.url),
            ("feed.url", &self.feed.url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        for (field, value) in [
            ("feed.organization", &self.feed.organization),
            ("feed.project", &self.feed.project),
            ("feed.feed", &self.feed.feed),
            ("feed.token_env", &self.feed.token_env),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.icon_service.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "icon_service.concurrency must be at least 1".to_owned(),
            ));
        }
        if let Some(name) = &self.package.name {
            iconpack_package::validate_package_name(name)
                .map_err(|e| ConfigError::Invalid(format!("package.name: {e}")))?;
        }
        iconpack_package::validate_version(&self.package.base_version)
            .map_err(|e| ConfigError::Invalid(format!("package.base_version: {e}")))?;
        Ok(())
    }
}
