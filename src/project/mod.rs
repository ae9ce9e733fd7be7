//! Minimal read access to the project's configuration descriptor (`PROJECT`).
//!
//! Only the fields the update engine needs are modelled; everything else in
//! the descriptor (resources, plugins) is ignored and left to the generator.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::PROJECT_FILE;
use crate::core::UpdateError;

/// The subset of `PROJECT` the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Generator version the project was last scaffolded with.
    #[serde(default)]
    pub cli_version: Option<String>,
    /// Descriptor schema version.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub layout: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
}

impl ProjectFile {
    /// Path of the descriptor under `root`.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(PROJECT_FILE)
    }

    /// Reads and parses `<root>/PROJECT`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ProjectFileNotFound`] when the file is absent and
    /// [`UpdateError::ProjectFileParse`] when it is not valid YAML.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Err(UpdateError::ProjectFileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(&path).await?;
        Self::parse(&content, &path)
    }

    /// Parses descriptor content; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            anyhow::Error::from(UpdateError::ProjectFileParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// The recorded `cliVersion`, failing when it is missing or blank.
    pub fn require_cli_version(&self, path: &Path) -> Result<&str> {
        match self.cli_version.as_deref().map(str::trim) {
            Some(version) if !version.is_empty() => Ok(version),
            _ => Err(UpdateError::MissingCliVersion {
                path: path.display().to_string(),
            }
            .into()),
        }
    }
}
