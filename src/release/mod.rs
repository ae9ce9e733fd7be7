//! Release fetching: URL construction, availability probes, latest-release
//! lookup and downloading a platform-specific generator binary.
//!
//! Every call is a single attempt. Nothing here retries; a failed download
//! leaves the repository untouched and the caller decides whether to re-run.
//!
//! # URL shape
//!
//! ```text
//! <base_url>/<org>/<repo>/releases/download/<vX.Y.Z>/<artifact>_<os>_<arch>
//! ```

mod download;
mod verification;

pub use download::DownloadedBinary;
pub use verification::ChecksumVerifier;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ReleaseSettings;
use crate::constants::{CHECKSUMS_FILE, USER_AGENT};
use crate::core::UpdateError;
use crate::utils::Platform;
use crate::version::ReleaseVersion;

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// HTTP client for the generator's release host.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: reqwest::Client,
    settings: ReleaseSettings,
    platform: Platform,
}

impl ReleaseClient {
    /// Creates a client for the current platform.
    pub fn new(settings: ReleaseSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            settings,
            platform: Platform::current(),
        })
    }

    /// Overrides the detected platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// `<artifact>_<os>_<arch>`
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}_{}", self.settings.artifact, self.platform)
    }

    fn release_asset_url(&self, version: &ReleaseVersion, asset: &str) -> String {
        format!(
            "{}/{}/{}/releases/download/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.org,
            self.settings.repo,
            version,
            asset
        )
    }

    /// Download URL of the generator binary for `version` on this platform.
    #[must_use]
    pub fn artifact_url(&self, version: &ReleaseVersion) -> String {
        self.release_asset_url(version, &self.artifact_name())
    }

    #[must_use]
    pub fn checksums_url(&self, version: &ReleaseVersion) -> String {
        self.release_asset_url(version, CHECKSUMS_FILE)
    }

    #[must_use]
    pub fn latest_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.org,
            self.settings.repo
        )
    }

    /// Confirms that a binary exists for `version` without downloading it.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ReleaseNotFound`] on 404, [`UpdateError::HttpStatus`] on
    /// any other non-success status and [`UpdateError::NetworkError`] when the
    /// host cannot be reached.
    pub async fn check_available(&self, version: &ReleaseVersion) -> Result<()> {
        let url = self.artifact_url(version);
        debug!(target: "release", "Probing {}", url);

        let response = self.client.head(&url).send().await.map_err(|e| {
            UpdateError::NetworkError {
                operation: format!("probe release {version}"),
                reason: e.to_string(),
            }
        })?;

        check_status(response.status(), version, &url)?;
        debug!(target: "release", "Release {} is available", version);
        Ok(())
    }

    /// Queries the release index for the newest published version.
    pub async fn latest_version(&self) -> Result<ReleaseVersion> {
        let url = self.latest_url();
        debug!(target: "release", "Looking up latest release at {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::NetworkError {
                operation: "query latest release".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url,
                status: status.as_u16(),
            }
            .into());
        }

        let release: LatestRelease =
            response.json().await.map_err(|e| UpdateError::NetworkError {
                operation: "parse latest release".to_string(),
                reason: e.to_string(),
            })?;

        let version = ReleaseVersion::parse(&release.tag_name)?;
        info!(target: "release", "Latest release is {}", version);
        Ok(version)
    }

    /// Downloads the binary for `version` into a fresh temporary directory.
    ///
    /// The directory is kept on success and must be removed by the caller
    /// (see [`DownloadedBinary::cleanup`]). When checksum verification is
    /// enabled and the release publishes a checksum for this artifact, a
    /// mismatch fails the download.
    pub async fn download(
        &self,
        version: &ReleaseVersion,
        show_progress: bool,
    ) -> Result<DownloadedBinary> {
        let url = self.artifact_url(version);
        let binary = download::download_binary(
            &self.client,
            &url,
            version,
            &self.settings.artifact,
            show_progress,
        )
        .await?;

        if self.settings.verify_checksums {
            let verified = ChecksumVerifier::verify_from_release(
                &self.client,
                &binary.binary,
                &self.checksums_url(version),
                &self.artifact_name(),
            )
            .await;

            if let Err(e) = verified {
                binary.cleanup().await;
                return Err(e);
            }
        }

        Ok(binary)
    }
}

/// Maps a release response status to the typed error taxonomy.
fn check_status(status: StatusCode, version: &ReleaseVersion, url: &str) -> Result<(), UpdateError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(UpdateError::ReleaseNotFound {
            version: version.to_string(),
            url: url.to_string(),
        })
    } else {
        Err(UpdateError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
