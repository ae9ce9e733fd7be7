use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::UpdateError;

/// SHA-256 verification against a release's `checksums.txt`.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Lowercase hex SHA-256 of a file.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        let contents = fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        Ok(hex::encode(Sha256::digest(&contents)))
    }

    /// Finds the checksum for `artifact` in `<hex>  <name>` formatted content.
    #[must_use]
    pub fn find_checksum(content: &str, artifact: &str) -> Option<String> {
        content.lines().find_map(|line| {
            let mut parts = line.split_whitespace();
            let checksum = parts.next()?;
            let name = parts.next()?.trim_start_matches('*');
            (name == artifact && parts.next().is_none()).then(|| checksum.to_lowercase())
        })
    }

    /// Downloads the checksum manifest and verifies `file_path` against it.
    ///
    /// Returns `Ok(false)` (with a warning) when the manifest or the entry for
    /// `artifact` is unavailable.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ChecksumMismatch`] when a published checksum does not match.
    pub async fn verify_from_release(
        client: &reqwest::Client,
        file_path: &Path,
        checksums_url: &str,
        artifact: &str,
    ) -> Result<bool> {
        debug!(target: "release", "Fetching checksums from {}", checksums_url);

        let response = match client.get(checksums_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(
                    target: "release",
                    "No checksum manifest available (HTTP {}), skipping verification",
                    response.status()
                );
                return Ok(false);
            }
            Err(e) => {
                warn!(target: "release", "Failed to fetch checksum manifest: {}, skipping verification", e);
                return Ok(false);
            }
        };

        let content = response.text().await.context("Failed to read checksum manifest")?;
        let Some(expected) = Self::find_checksum(&content, artifact) else {
            warn!(target: "release", "No checksum listed for {}, skipping verification", artifact);
            return Ok(false);
        };

        let actual = Self::compute_sha256(file_path).await?;
        if actual != expected {
            return Err(UpdateError::ChecksumMismatch {
                artifact: artifact.to_string(),
                expected,
                actual,
            }
            .into());
        }

        info!(target: "release", "Checksum verified for {}", artifact);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_compute_sha256() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Hello, World!").unwrap();

        let checksum = ChecksumVerifier::compute_sha256(temp_file.path()).await.unwrap();
        assert_eq!(checksum, "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f");
    }

    #[test]
    fn test_find_checksum_exact_name() {
        let manifest = "\
aaaa  kubebuilder_linux_amd64
BBBB  kubebuilder_linux_arm64
cccc *kubebuilder_darwin_arm64
dddd  kubebuilder_linux_amd64.sig
";
        assert_eq!(
            ChecksumVerifier::find_checksum(manifest, "kubebuilder_linux_amd64").as_deref(),
            Some("aaaa")
        );
        assert_eq!(
            ChecksumVerifier::find_checksum(manifest, "kubebuilder_linux_arm64").as_deref(),
            Some("bbbb")
        );
        assert_eq!(
            ChecksumVerifier::find_checksum(manifest, "kubebuilder_darwin_arm64").as_deref(),
            Some("cccc")
        );
        assert!(ChecksumVerifier::find_checksum(manifest, "kubebuilder_windows_amd64").is_none());
    }
}
