use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::utils::make_executable;
use crate::version::ReleaseVersion;

/// A downloaded generator binary and the run-scoped directory holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBinary {
    /// Temporary directory created for this run only.
    pub dir: PathBuf,
    /// Executable inside `dir`.
    pub binary: PathBuf,
    pub version: ReleaseVersion,
}

impl DownloadedBinary {
    /// Removes the temporary directory. Failures are logged, never returned.
    pub async fn cleanup(&self) {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(target: "release", "Removed {}", self.dir.display()),
            Err(e) => warn!(
                target: "release",
                "Failed to remove temporary directory {}: {}",
                self.dir.display(),
                e
            ),
        }
    }
}

/// Streams `url` into a fresh temp directory and marks the result executable.
///
/// The directory is discarded if anything fails before the binary is
/// complete; on success it is detached from `tempfile` so it outlives the run.
pub(super) async fn download_binary(
    client: &reqwest::Client,
    url: &str,
    version: &ReleaseVersion,
    file_name: &str,
    show_progress: bool,
) -> Result<DownloadedBinary> {
    let temp_dir = tempfile::Builder::new()
        .prefix(&format!("kubebuilder{version}-"))
        .tempdir()
        .context("Failed to create temporary directory for download")?;
    let binary = temp_dir.path().join(file_name);

    info!(target: "release", "Downloading {} from {}", version, url);

    let mut response = client.get(url).send().await.map_err(|e| UpdateError::NetworkError {
        operation: format!("download {version}"),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(UpdateError::ReleaseNotFound {
            version: version.to_string(),
            url: url.to_string(),
        }
        .into());
    }
    if !status.is_success() {
        return Err(UpdateError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    let expected = response.content_length();
    let progress = progress_bar(expected, show_progress);

    let mut file = File::create(&binary)
        .await
        .with_context(|| format!("Failed to create {}", binary.display()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| UpdateError::NetworkError {
        operation: format!("download {version}"),
        reason: e.to_string(),
    })? {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", binary.display()))?;
        written += chunk.len() as u64;
        if let Some(pb) = &progress {
            pb.set_position(written);
        }
    }
    file.flush().await.with_context(|| format!("Failed to flush {}", binary.display()))?;
    drop(file);

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if let Some(expected) = expected {
        if written != expected {
            return Err(UpdateError::NetworkError {
                operation: format!("download {version}"),
                reason: format!("incomplete download: wrote {written} of {expected} bytes"),
            }
            .into());
        }
    }

    make_executable(&binary).await?;

    let dir = temp_dir.keep();
    let binary = dir.join(file_name);
    info!(
        target: "release",
        "Downloaded {} ({} bytes) to {}",
        version,
        written,
        dir.display()
    );

    Ok(DownloadedBinary {
        dir,
        binary,
        version: version.clone(),
    })
}

fn progress_bar(total: Option<u64>, enabled: bool) -> Option<ProgressBar> {
    let total = total.filter(|_| enabled)?;
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    Some(pb)
}
