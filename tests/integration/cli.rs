use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with a private home and no inherited settings.
fn kb_update(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kb-update").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("KB_UPDATE_CONFIG")
        .env_remove("KB_UPDATE_RELEASE_URL")
        .env_remove("KB_UPDATE_API_URL")
        .env_remove("KB_UPDATE_GENERATOR")
        .env_remove("KB_UPDATE_GH");
    cmd
}

#[test]
fn test_help_lists_update() {
    let home = TempDir::new().unwrap();
    kb_update(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"));

    kb_update(&home)
        .args(["update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--preserve-path"))
        .stdout(predicate::str::contains("--squash"));
}

#[test]
fn test_squash_only_flags_require_squash() {
    let home = TempDir::new().unwrap();
    kb_update(&home)
        .args(["update", "--open-pr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--squash"));
}

#[test]
fn test_invalid_version_is_rejected() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    kb_update(&home)
        .args(["update", "--to-version", "4.6"])
        .arg("-C")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version '4.6'"));
}

#[test]
fn test_outside_git_repository() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    kb_update(&home)
        .args(["update", "--from-version", "v4.5.2", "--to-version", "v4.6.0"])
        .arg("-C")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_missing_config_file() {
    let home = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    kb_update(&home)
        .arg("update")
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings file not found"));
}

#[cfg(unix)]
mod end_to_end {
    use super::*;
    use kb_update::test_utils::{TestGit, fake_generator_script, init_scaffolded_repo};
    use kb_update::utils::Platform;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve_generator(server: &MockServer, version: &str) {
        let artifact = format!(
            "/kubernetes-sigs/kubebuilder/releases/download/{version}/kubebuilder_{}",
            Platform::current()
        );
        let script = format!("#!/bin/sh\n{}", fake_generator_script(version));
        Mock::given(path(artifact))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(script.into_bytes()))
            .mount(server)
            .await;
    }

    fn write_config(dir: &TempDir, server: &MockServer) -> std::path::PathBuf {
        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[release]\nbase_url = \"{uri}\"\napi_url = \"{uri}\"\n\n[generator]\nrun_make_targets = false\n",
                uri = server.uri()
            ),
        )
        .unwrap();
        config
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_and_squash_from_command_line() {
        let server = MockServer::start().await;
        serve_generator(&server, "v4.5.2").await;
        serve_generator(&server, "v4.6.0").await;

        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let git: TestGit = init_scaffolded_repo(repo.path(), "v4.5.2").unwrap();
        let config = write_config(&home, &server);

        kb_update(&home)
            .arg("update")
            .arg("-C")
            .arg(repo.path())
            .arg("--config")
            .arg(&config)
            .args(["--to-version", "v4.6.0", "--squash", "--no-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Merge completed without conflicts"))
            .stdout(predicate::str::contains("kubebuilder-alpha-update-to-v4.6.0"));

        let out = "kubebuilder-alpha-update-to-v4.6.0";
        assert_eq!(git.current_branch().unwrap(), out);
        assert_eq!(git.count_commits("main", out).unwrap(), 1);
        assert!(git.show_file(out, "Dockerfile").unwrap().contains("golang:1.24"));
        assert!(git.show_file(out, "PROJECT").unwrap().contains("cliVersion: 4.6.0"));
        assert!(git.branches().unwrap().iter().any(|b| b.starts_with("tmp-kb-update-merge-v4.5.2-to-v4.6.0-")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_conflict_reported_from_command_line() {
        let server = MockServer::start().await;
        serve_generator(&server, "v4.5.2").await;
        serve_generator(&server, "v4.6.0").await;

        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let git = init_scaffolded_repo(repo.path(), "v4.5.2").unwrap();
        let dockerfile = git.read_file("Dockerfile").unwrap();
        git.write_file("Dockerfile", &dockerfile.replace("golang:1.23", "golang:1.23-alpine"))
            .unwrap();
        git.commit_all("Use alpine builder").unwrap();
        let config = write_config(&home, &server);

        kb_update(&home)
            .arg("update")
            .arg("-C")
            .arg(repo.path())
            .arg("--config")
            .arg(&config)
            .args(["--from-version", "v4.5.2", "--to-version", "v4.6.0", "--no-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Merge has conflicts in 1 file(s)"))
            .stdout(predicate::str::contains("Dockerfile"))
            .stdout(predicate::str::contains("--force"));

        assert!(git.current_branch().unwrap().starts_with("tmp-kb-update-merge-"));
    }
}
