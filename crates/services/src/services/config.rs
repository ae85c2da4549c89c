//! Migration configuration loaded from a TOML file

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use backend::{
    PasswordHashConfig, ProjectConfig, firebase::auth::MAX_LIST_PAGE_SIZE,
    models::MAX_BATCH_OPERATIONS,
};
use serde::Deserialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use utils::path::resolve_relative;

/// Collections of the prayer app, in the order they are migrated
pub const DEFAULT_COLLECTIONS: &[&str] = &[
    "users",
    "avatars",
    "user_backgrounds",
    "prayers",
    "prayer_responses",
    "prayer_likes",
    "prayer_response_likes",
    "baptism",
    "baptism_responses",
    "journey",
    "journey_responses",
    "miracle",
    "miracle_responses",
];

pub const DEFAULT_STORAGE_PREFIXES: &[&str] =
    &["avatars/", "prayer-images/", "response-images/", "test/"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("credential file for {project} not found: {path}")]
    MissingCredentials { project: String, path: PathBuf },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which side of the migration a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProjectRole {
    #[default]
    Source,
    Target,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessSettings {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl ReadinessSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            max_attempts: 10,
        }
    }
}

/// Top-level keys must come before the first table: TOML puts anything
/// written after `[target]` inside it, and such keys are rejected rather
/// than dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub source: ProjectConfig,
    pub target: ProjectConfig,
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
    #[serde(default = "default_storage_prefixes")]
    pub storage_prefixes: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_auth_page_size")]
    pub auth_page_size: usize,
    #[serde(default)]
    pub readiness: ReadinessSettings,
    #[serde(default)]
    pub password_hash: Option<PasswordHashConfig>,
}

fn default_collections() -> Vec<String> {
    DEFAULT_COLLECTIONS.iter().map(|c| c.to_string()).collect()
}

fn default_storage_prefixes() -> Vec<String> {
    DEFAULT_STORAGE_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_batch_size() -> usize {
    MAX_BATCH_OPERATIONS
}

fn default_auth_page_size() -> usize {
    MAX_LIST_PAGE_SIZE
}

impl MigrationConfig {
    /// A configuration with every optional setting at its default
    pub fn new(source: ProjectConfig, target: ProjectConfig) -> Self {
        Self {
            source,
            target,
            collections: default_collections(),
            storage_prefixes: default_storage_prefixes(),
            batch_size: default_batch_size(),
            auth_page_size: default_auth_page_size(),
            readiness: ReadinessSettings::default(),
            password_hash: None,
        }
    }

    /// Read and validate a config file. Credential paths are resolved against
    /// the file's directory and must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::from_toml_str(&raw, base_dir)?;
        config.check_credentials()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        for project in [&mut config.source, &mut config.target] {
            if let Some(credentials) = project.credentials.take() {
                project.credentials = Some(resolve_relative(base_dir, &credentials));
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.project_id == self.target.project_id
            && self.source.endpoints == self.target.endpoints
        {
            return Err(ConfigError::Invalid(format!(
                "source and target are the same project ({})",
                self.source.project_id
            )));
        }
        if self.readiness.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "readiness.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn check_credentials(&self) -> Result<(), ConfigError> {
        for project in [&self.source, &self.target] {
            if let Some(path) = project.credentials.as_ref().filter(|p| !p.is_file()) {
                return Err(ConfigError::MissingCredentials {
                    project: project.project_id.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn project(&self, role: ProjectRole) -> &ProjectConfig {
        match role {
            ProjectRole::Source => &self.source,
            ProjectRole::Target => &self.target,
        }
    }

    /// Writes per commit, never above the backend ceiling
    pub fn batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_OPERATIONS)
    }

    pub fn auth_page_size(&self) -> usize {
        self.auth_page_size.clamp(1, MAX_LIST_PAGE_SIZE)
    }

    /// Collection the readiness poller reads from
    pub fn probe_collection(&self) -> &str {
        self.collections
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_COLLECTIONS[0])
    }
}
