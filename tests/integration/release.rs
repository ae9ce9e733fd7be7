use kb_update::config::ReleaseSettings;
use kb_update::core::UpdateError;
use kb_update::release::{ChecksumVerifier, ReleaseClient};
use kb_update::utils::Platform;
use kb_update::version::ReleaseVersion;
use sha2::{Digest, Sha256};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTIFACT_PATH: &str = "/kubernetes-sigs/kubebuilder/releases/download/v4.6.0/kubebuilder_linux_amd64";
const CHECKSUMS_PATH: &str = "/kubernetes-sigs/kubebuilder/releases/download/v4.6.0/checksums.txt";
const BINARY: &[u8] = b"#!/bin/sh\necho kubebuilder v4.6.0\n";

fn client(server: &MockServer, verify_checksums: bool) -> ReleaseClient {
    let settings = ReleaseSettings {
        base_url: server.uri(),
        api_url: server.uri(),
        verify_checksums,
        ..ReleaseSettings::default()
    };
    ReleaseClient::new(settings).unwrap().with_platform(Platform::new("linux", "amd64"))
}

fn v460() -> ReleaseVersion {
    ReleaseVersion::parse("v4.6.0").unwrap()
}

async fn serve_binary(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_without_checksum_manifest() {
    let server = MockServer::start().await;
    serve_binary(&server).await;
    Mock::given(method("GET"))
        .and(path(CHECKSUMS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let downloaded = client(&server, true).download(&v460(), false).await.unwrap();

    assert_eq!(downloaded.version, v460());
    assert!(downloaded.binary.starts_with(&downloaded.dir));
    assert_eq!(std::fs::read(&downloaded.binary).unwrap(), BINARY);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&downloaded.binary).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    downloaded.cleanup().await;
    assert!(!downloaded.dir.exists());
}

#[tokio::test]
async fn test_download_verifies_published_checksum() {
    let server = MockServer::start().await;
    serve_binary(&server).await;
    let manifest = format!(
        "{}  kubebuilder_linux_amd64\n0000  kubebuilder_darwin_arm64\n",
        hex::encode(Sha256::digest(BINARY))
    );
    Mock::given(method("GET"))
        .and(path(CHECKSUMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(manifest))
        .expect(1)
        .mount(&server)
        .await;

    let downloaded = client(&server, true).download(&v460(), false).await.unwrap();
    assert!(downloaded.binary.exists());
    downloaded.cleanup().await;
}

#[tokio::test]
async fn test_download_rejects_checksum_mismatch() {
    let server = MockServer::start().await;
    serve_binary(&server).await;
    Mock::given(method("GET"))
        .and(path(CHECKSUMS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(format!("{}  kubebuilder_linux_amd64\n", "ab".repeat(32))),
        )
        .mount(&server)
        .await;

    let err = client(&server, true).download(&v460(), false).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn test_download_skips_checksums_when_disabled() {
    let server = MockServer::start().await;
    serve_binary(&server).await;
    Mock::given(method("GET"))
        .and(path(CHECKSUMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("bogus  kubebuilder_linux_amd64\n"))
        .expect(0)
        .mount(&server)
        .await;

    let downloaded = client(&server, false).download(&v460(), false).await.unwrap();
    downloaded.cleanup().await;
}

#[tokio::test]
async fn test_download_missing_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server, true).download(&v460(), false).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::ReleaseNotFound { .. })
    ));
}

#[tokio::test]
async fn test_check_available() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(ARTIFACT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let client = client(&server, true);

    client.check_available(&v460()).await.unwrap();

    let err = client.check_available(&ReleaseVersion::parse("v9.9.9").unwrap()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::ReleaseNotFound { .. })
    ));
}

#[tokio::test]
async fn test_check_available_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server, true).check_available(&v460()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::HttpStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_latest_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/kubernetes-sigs/kubebuilder/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"tag_name":"v4.7.1","name":"v4.7.1"}"#))
        .mount(&server)
        .await;

    let latest = client(&server, true).latest_version().await.unwrap();
    assert_eq!(latest, ReleaseVersion::parse("v4.7.1").unwrap());
}

#[tokio::test]
async fn test_latest_version_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/kubernetes-sigs/kubebuilder/releases/latest"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server, true).latest_version().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::HttpStatus { status: 403, .. })
    ));
}

#[test]
fn test_find_checksum_ignores_other_platforms() {
    let manifest = "1111  kubebuilder_darwin_amd64\n2222  kubebuilder_linux_amd64\n";
    assert_eq!(
        ChecksumVerifier::find_checksum(manifest, "kubebuilder_linux_amd64").as_deref(),
        Some("2222")
    );
    assert!(ChecksumVerifier::find_checksum(manifest, "kubebuilder_linux_arm64").is_none());
}
