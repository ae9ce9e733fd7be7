use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_GH_COMMAND, DEFAULT_MAKE_TARGETS, DEFAULT_RELEASE_ORG,
    DEFAULT_RELEASE_REPO, DEFAULT_RELEASE_URL, ENV_API_URL, ENV_CONFIG, ENV_GENERATOR, ENV_GH,
    ENV_ISSUE_BODY, ENV_ISSUE_TITLE, ENV_PR_BODY, ENV_PR_TITLE, ENV_RELEASE_URL, GENERATOR_NAME,
};
use crate::core::UpdateError;

/// Where release artifacts and the release index live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseSettings {
    /// Host serving `<org>/<repo>/releases/download/...`.
    pub base_url: String,
    /// API host answering `repos/<org>/<repo>/releases/latest`.
    pub api_url: String,
    pub org: String,
    pub repo: String,
    /// Artifact name prefix; the platform suffix is appended.
    pub artifact: String,
    /// Verify downloads against the release's checksum manifest when present.
    pub verify_checksums: bool,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELEASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            org: DEFAULT_RELEASE_ORG.to_string(),
            repo: DEFAULT_RELEASE_REPO.to_string(),
            artifact: GENERATOR_NAME.to_string(),
            verify_checksums: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Explicit path to the locally installed generator. Looked up on PATH when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub run_make_targets: bool,
    pub make_targets: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            path: None,
            run_make_targets: true,
            make_targets: DEFAULT_MAKE_TARGETS.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub command: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_GH_COMMAND.to_string(),
        }
    }
}

/// Overrides for pull-request and issue text. `None` keeps the built-in template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_body: Option<String>,
}

/// Settings for one update run.
///
/// Resolution order: built-in defaults, then the TOML settings file, then
/// environment variables.
///
/// ```toml
/// [release]
/// base_url = "https://github.com"
/// verify_checksums = true
///
/// [generator]
/// make_targets = ["manifests", "generate"]
///
/// [templates]
/// pr_title = "chore: scaffold {{ from_version }} -> {{ to_version }}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    pub release: ReleaseSettings,
    pub generator: GeneratorSettings,
    pub github: GithubSettings,
    pub templates: TemplateSettings,
}

impl UpdateSettings {
    /// Loads settings for a run.
    ///
    /// `explicit` (the `--config` flag) must exist. Otherwise `KB_UPDATE_CONFIG`
    /// is consulted, then `~/.kb-update/config.toml`; a missing default file
    /// just yields defaults. Environment overrides are applied last.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(UpdateError::ConfigError {
                        message: format!("settings file not found: {}", path.display()),
                    }
                    .into());
                }
                Self::load_from(&path).await?
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path).await?,
                _ => Self::default(),
            },
        };

        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(UpdateError::ConfigError {
                message: format!("failed to parse {}: {e}", path.display()),
            })
        })
    }

    /// `~/.kb-update/config.toml`, or `None` when the home directory is unknown.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".kb-update").join("config.toml"))
    }

    /// Applies overrides from a variable lookup (normally the process environment).
    ///
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_RELEASE_URL) {
            self.release.base_url = url;
        }
        if let Some(url) = get(ENV_API_URL) {
            self.release.api_url = url;
        }
        if let Some(path) = get(ENV_GENERATOR) {
            self.generator.path = Some(PathBuf::from(path));
        }
        if let Some(command) = get(ENV_GH) {
            self.github.command = command;
        }
        if let Some(text) = get(ENV_PR_TITLE) {
            self.templates.pr_title = Some(text);
        }
        if let Some(text) = get(ENV_PR_BODY) {
            self.templates.pr_body = Some(text);
        }
        if let Some(text) = get(ENV_ISSUE_TITLE) {
            self.templates.issue_title = Some(text);
        }
        if let Some(text) = get(ENV_ISSUE_BODY) {
            self.templates.issue_body = Some(text);
        }
    }
}
