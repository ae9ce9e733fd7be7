//! Shared fixture for the git-backed tests.

#![allow(dead_code)]

use anyhow::Result;
use kb_update::generator::GeneratorBinary;
use kb_update::git::GitCli;
use kb_update::test_utils::{TestGit, init_scaffolded_repo, write_fake_generator};
use kb_update::update::{
    BranchPlan, ReleaseIndex, UpdateOptions, UpdateReport, UpdateRequest, Updater, prepare,
};
use kb_update::version::ReleaseVersion;
use tempfile::TempDir;

/// Release index answering from memory.
pub struct OfflineReleases {
    pub latest: &'static str,
}

impl ReleaseIndex for OfflineReleases {
    async fn latest_version(&self) -> Result<ReleaseVersion> {
        Ok(ReleaseVersion::parse(self.latest)?)
    }

    async fn check_available(&self, _version: &ReleaseVersion) -> Result<()> {
        Ok(())
    }
}

/// A repository scaffolded at some version, plus a directory of fake generators.
pub struct Fixture {
    pub repo: TempDir,
    pub bin: TempDir,
    pub git: TestGit,
}

impl Fixture {
    pub fn new(version: &str) -> Self {
        kb_update::test_utils::init_test_logging(None);
        let repo = TempDir::new().unwrap();
        let git = init_scaffolded_repo(repo.path(), version).unwrap();
        Self {
            repo,
            bin: TempDir::new().unwrap(),
            git,
        }
    }

    pub fn vcs(&self) -> GitCli {
        GitCli::new(self.repo.path())
    }

    pub fn generator(&self, version: &str) -> GeneratorBinary {
        let path = write_fake_generator(self.bin.path(), version).unwrap();
        GeneratorBinary::new(path, format!("kubebuilder {version}"))
    }

    /// Validates `options` against the repository (latest release: v4.6.0).
    pub async fn request(&self, options: UpdateOptions) -> Result<UpdateRequest> {
        prepare(options, &self.vcs(), &OfflineReleases { latest: "v4.6.0" }).await
    }

    pub fn plan(request: &UpdateRequest, stamp: &str) -> BranchPlan {
        BranchPlan::new(
            &request.source_version,
            &request.target_version,
            request.output_branch_override.as_deref(),
            stamp,
        )
    }

    /// Runs a full update with fake generators for both versions.
    pub async fn update(&self, options: UpdateOptions, stamp: &str) -> Result<UpdateReport> {
        let request = self.request(options).await?;
        let source = self.generator(&request.source_version.to_string());
        let target = self.generator(&request.target_version.to_string());
        let plan = Self::plan(&request, stamp);

        Updater::new(self.vcs(), request, plan).run(&source, &target).await
    }

    /// The user edits the type and controller files, leaving marker comments.
    pub fn add_user_markers(&self) {
        let types = self.git.read_file("api/v1alpha1/memcached_types.go").unwrap();
        let types = types.replace(
            "\tFoo string `json:\"foo,omitempty\"`\n",
            "\tFoo string `json:\"foo,omitempty\"`\n\n\
             \t// +kubebuilder:validation:Minimum=1\n\
             \tSize int32 `json:\"size,omitempty\"` // user-marker: size-field\n",
        );
        self.git.write_file("api/v1alpha1/memcached_types.go", &types).unwrap();

        let controller = self.git.read_file("internal/controller/memcached_controller.go").unwrap();
        let controller = controller.replace(
            "\t// TODO(user): your logic here\n",
            "\t// TODO(user): your logic here\n\
             \tlog.Info(\"reconciling memcached\") // user-marker: log-line\n",
        );
        self.git.write_file("internal/controller/memcached_controller.go", &controller).unwrap();

        self.git.commit_all("Add size field and reconcile logging").unwrap();
    }

    /// The user edits the exact line the next release changes.
    pub fn edit_dockerfile_base_image(&self) {
        let dockerfile = self.git.read_file("Dockerfile").unwrap();
        let dockerfile =
            dockerfile.replace("FROM golang:1.23 AS builder", "FROM golang:1.23-alpine AS builder");
        self.git.write_file("Dockerfile", &dockerfile).unwrap();
        self.git.commit_all("Use alpine builder").unwrap();
    }
}

pub fn options(from: &str, to: &str) -> UpdateOptions {
    UpdateOptions {
        from_version: Some(from.to_string()),
        to_version: Some(to.to_string()),
        ..UpdateOptions::default()
    }
}
